//! Shortlist digest: one outbound email summarizing every shortlisted,
//! not-yet-sent candidate for a job, with their original attachments
//! re-encoded as message parts. Sent to the requesting user's own mailbox.

use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde::Serialize;
use uuid::Uuid;

use crate::applications;
use crate::errors::AppError;
use crate::jobs;
use crate::models::application::{ApplicationRow, AttachmentRow};
use crate::models::job::JobRow;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DigestOutcome {
    pub sent: usize,
    pub recipient: String,
}

/// Sends the digest for one job. Fails with a validation error when no
/// shortlisted application is waiting; after a confirmed send, every
/// included application is stamped so the next run excludes it.
pub async fn send_shortlist_digest(
    state: &AppState,
    user_id: Uuid,
    job_id: Uuid,
) -> Result<DigestOutcome, AppError> {
    let job = jobs::find_by_id(&state.db, user_id, job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    let shortlisted = applications::unsent_shortlisted(&state.db, user_id, job_id).await?;
    if shortlisted.is_empty() {
        return Err(AppError::Validation(
            "No unsent shortlisted applications".to_string(),
        ));
    }

    let mut candidates = Vec::with_capacity(shortlisted.len());
    for application in shortlisted {
        let attachments = applications::attachments_with_data(&state.db, application.id).await?;
        candidates.push((application, attachments));
    }

    let gmail = state.gmail.client_for_user(&state.db, user_id).await?;
    let recipient = gmail.email_address().to_string();

    let mime = build_digest_mime(&recipient, &job, &candidates);
    gmail.send_raw(mime.as_bytes()).await.map_err(AppError::from)?;

    let ids: Vec<Uuid> = candidates.iter().map(|(app, _)| app.id).collect();
    applications::mark_sent(&state.db, &ids).await?;

    tracing::info!(
        job = %job.title,
        recipient = %recipient,
        candidates = ids.len(),
        "shortlist digest sent"
    );
    Ok(DigestOutcome {
        sent: ids.len(),
        recipient,
    })
}

/// Assembles the multipart/mixed RFC 2822 message: an HTML summary followed
/// by every candidate's attachments.
fn build_digest_mime(
    to: &str,
    job: &JobRow,
    candidates: &[(ApplicationRow, Vec<AttachmentRow>)],
) -> String {
    let boundary = format!("digest_{}", Uuid::new_v4().simple());
    let mut mime = String::new();

    mime.push_str(&format!("To: {to}\r\n"));
    mime.push_str(&format!(
        "Subject: Shortlisted candidates for {}\r\n",
        job.title
    ));
    mime.push_str("MIME-Version: 1.0\r\n");
    mime.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n"
    ));

    mime.push_str(&format!("--{boundary}\r\n"));
    mime.push_str("Content-Type: text/html; charset=utf-8\r\n\r\n");
    mime.push_str(&render_summary_html(job, candidates));
    mime.push_str("\r\n");

    for attachment in candidates.iter().flat_map(|(_, attachments)| attachments) {
        mime.push_str(&format!("--{boundary}\r\n"));
        mime.push_str(&format!(
            "Content-Type: {}; name=\"{}\"\r\n",
            attachment.content_type, attachment.filename
        ));
        mime.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{}\"\r\n",
            attachment.filename
        ));
        mime.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
        mime.push_str(&wrap_base64(&BASE64_STANDARD.encode(&attachment.data)));
        mime.push_str("\r\n");
    }

    mime.push_str(&format!("--{boundary}--\r\n"));
    mime
}

fn render_summary_html(job: &JobRow, candidates: &[(ApplicationRow, Vec<AttachmentRow>)]) -> String {
    let mut html = String::new();
    html.push_str(&format!(
        "<h2>Shortlisted candidates for {}</h2>\n",
        escape_html(&job.title)
    ));
    html.push_str("<table border=\"1\" cellpadding=\"6\" cellspacing=\"0\">\n");
    html.push_str(
        "<tr><th>Name</th><th>Email</th><th>Score</th><th>Summary</th>\
         <th>Received</th><th>Attachments</th></tr>\n",
    );

    for (application, attachments) in candidates {
        let filenames: Vec<&str> = attachments
            .iter()
            .map(|a| a.filename.as_str())
            .collect();
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{:.1}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&application.applicant_name),
            escape_html(&application.applicant_email),
            application.ai_score,
            escape_html(&application.ai_summary),
            application.created_at.format("%Y-%m-%d"),
            escape_html(&filenames.join(", ")),
        ));
    }

    html.push_str("</table>\n");
    html
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// RFC 2045 caps encoded lines at 76 characters.
fn wrap_base64(encoded: &str) -> String {
    let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / 76 * 2 + 2);
    let bytes = encoded.as_bytes();
    for chunk in bytes.chunks(76) {
        wrapped.push_str(std::str::from_utf8(chunk).expect("base64 is ASCII"));
        wrapped.push_str("\r\n");
    }
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_job() -> JobRow {
        JobRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Data Analyst".to_string(),
            description: "Analyze data".to_string(),
            status: "open".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_candidate(job: &JobRow) -> (ApplicationRow, Vec<AttachmentRow>) {
        let application = ApplicationRow {
            id: Uuid::new_v4(),
            job_id: job.id,
            user_id: job.user_id,
            applicant_name: "Jane Doe".to_string(),
            applicant_email: "jane@example.com".to_string(),
            resume_text: "resume text".to_string(),
            email_body: "body".to_string(),
            ai_score: 8.0,
            ai_summary: "Strong candidate".to_string(),
            is_shortlisted: true,
            sent_at: None,
            gmail_message_id: "msg-1".to_string(),
            gmail_thread_id: "thread-1".to_string(),
            created_at: Utc::now(),
        };
        let attachment = AttachmentRow {
            id: Uuid::new_v4(),
            application_id: application.id,
            filename: "resume.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            data: vec![0x25, 0x50, 0x44, 0x46],
            created_at: Utc::now(),
        };
        (application, vec![attachment])
    }

    #[test]
    fn test_digest_mime_structure() {
        let job = sample_job();
        let candidates = vec![sample_candidate(&job)];
        let mime = build_digest_mime("me@example.com", &job, &candidates);

        assert!(mime.starts_with("To: me@example.com\r\n"));
        assert!(mime.contains("Subject: Shortlisted candidates for Data Analyst\r\n"));
        assert!(mime.contains("Content-Type: multipart/mixed; boundary="));
        assert!(mime.contains("Content-Type: text/html; charset=utf-8"));
        assert!(mime.contains("Content-Disposition: attachment; filename=\"resume.pdf\""));

        // Every part opens with the boundary and the message closes it.
        let boundary = mime
            .split("boundary=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap();
        assert_eq!(mime.matches(&format!("--{boundary}\r\n")).count(), 2);
        assert!(mime.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn test_summary_html_lists_candidate_fields() {
        let job = sample_job();
        let candidates = vec![sample_candidate(&job)];
        let html = render_summary_html(&job, &candidates);
        assert!(html.contains("Jane Doe"));
        assert!(html.contains("jane@example.com"));
        assert!(html.contains("8.0"));
        assert!(html.contains("Strong candidate"));
        assert!(html.contains("resume.pdf"));
    }

    #[test]
    fn test_summary_html_escapes_markup() {
        let job = sample_job();
        let (mut application, attachments) = sample_candidate(&job);
        application.applicant_name = "<script>alert(1)</script>".to_string();
        let html = render_summary_html(&job, &[(application, attachments)]);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_wrap_base64_caps_line_length() {
        let encoded = "A".repeat(200);
        let wrapped = wrap_base64(&encoded);
        assert!(wrapped.lines().all(|line| line.len() <= 76));
        assert_eq!(wrapped.matches("\r\n").count(), 3);
    }
}
