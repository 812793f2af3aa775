//! The ingestion state machine: match unread mail to a job, extract the
//! first parseable resume, score it, persist the application, mark the
//! message read.
//!
//! Two rules here are deliberate business behavior, not shortcuts:
//! - "first success wins": MIME part order decides which resume is scored
//!   when a message carries several.
//! - a message that fails processing is left unread, so the next ingestion
//!   run retries it.

use anyhow::{anyhow, bail};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::applications::{self, NewApplication, NewAttachment};
use crate::errors::AppError;
use crate::extract;
use crate::gmail::types::Message;
use crate::gmail::{decode_base64url, GmailClient};
use crate::jobs;
use crate::models::application::ApplicationRow;
use crate::models::job::JobRow;
use crate::state::AppState;

const UNREAD_WITH_ATTACHMENT_QUERY: &str = "is:unread has:attachment";
const EMPTY_BODY_PLACEHOLDER: &str = "No email body content available";

#[derive(Debug, serde::Serialize)]
pub struct IngestOutcome {
    pub applications: Vec<ApplicationRow>,
    pub processed: usize,
    pub skipped: usize,
    pub total: usize,
}

/// Runs one ingestion pass for the job with the given title.
///
/// Job or credential resolution failures abort the run; a failure on any
/// single message is logged and skipped, never aborting the batch.
pub async fn run_ingestion(
    state: &AppState,
    user_id: Uuid,
    job_title: &str,
) -> Result<IngestOutcome, AppError> {
    let job = jobs::find_by_title(&state.db, user_id, job_title)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No job found with title: {job_title}")))?;

    // One resolved account for the entire run.
    let gmail = state.gmail.client_for_user(&state.db, user_id).await?;
    info!(
        job = %job.title,
        mailbox = %gmail.email_address(),
        "starting ingestion run"
    );

    let candidates = gmail
        .list_messages(UNREAD_WITH_ATTACHMENT_QUERY)
        .await
        .map_err(AppError::from)?;
    let total = candidates.len();

    // The sole idempotence mechanism: message ids already recorded for this
    // job are skipped, so re-running ingestion is a no-op for seen mail.
    let seen = applications::message_ids_for_job(&state.db, job.id).await?;

    let mut outcome = IngestOutcome {
        applications: Vec::new(),
        processed: 0,
        skipped: 0,
        total,
    };

    for candidate in candidates {
        if seen.contains(&candidate.id) {
            debug!(message_id = %candidate.id, "already processed, skipping");
            outcome.skipped += 1;
            continue;
        }

        match process_message(state, &gmail, &job, user_id, &candidate.id).await {
            Ok(application) => {
                // Clear UNREAD only after the application is persisted. If
                // this fails the message is re-fetched next run and dropped
                // by the dedup check.
                if let Err(e) = gmail.mark_read(&candidate.id).await {
                    warn!(message_id = %candidate.id, "failed to clear unread label: {e}");
                }
                outcome.applications.push(application);
                outcome.processed += 1;
            }
            Err(e) => {
                // Message stays unread and will be retried next run.
                warn!(message_id = %candidate.id, "skipping message: {e}");
                outcome.skipped += 1;
            }
        }
    }

    info!(
        processed = outcome.processed,
        skipped = outcome.skipped,
        total = outcome.total,
        "ingestion run finished"
    );
    Ok(outcome)
}

async fn process_message(
    state: &AppState,
    gmail: &GmailClient,
    job: &JobRow,
    user_id: Uuid,
    message_id: &str,
) -> anyhow::Result<ApplicationRow> {
    let message = gmail.get_message(message_id).await?;
    let payload = message
        .payload
        .as_ref()
        .ok_or_else(|| anyhow!("message has no payload"))?;

    let subject = payload
        .header_value("Subject")
        .ok_or_else(|| anyhow!("missing Subject header"))?;
    let from = payload
        .header_value("From")
        .ok_or_else(|| anyhow!("missing From header"))?;

    if !subject_matches(&subject, &job.title) {
        bail!("job title not found in subject: {subject}");
    }

    let (attachments, resume_text) = collect_resume_attachments(gmail, &message).await;
    let Some(resume_text) = resume_text else {
        bail!("no attachment yielded resume text");
    };

    let email_body = extract_body_text(&message);
    let (applicant_name, applicant_email) = parse_sender(&from);

    let score = state.scorer.score(&resume_text, &job.description).await;

    let application = applications::insert_with_attachments(
        &state.db,
        NewApplication {
            job_id: job.id,
            user_id,
            applicant_name: &applicant_name,
            applicant_email: &applicant_email,
            resume_text: &resume_text,
            email_body: &email_body,
            ai_score: score.score,
            ai_summary: &score.summary,
            gmail_message_id: &message.id,
            gmail_thread_id: &message.thread_id,
            attachments,
        },
    )
    .await?;

    info!(
        applicant = %application.applicant_email,
        score = application.ai_score,
        "application created"
    );
    Ok(application)
}

/// Fetches resume-named attachments in MIME order, attempting extraction on
/// each, and stops at the first one that yields non-empty text. A fetch or
/// parse failure on one attachment moves on to the next.
async fn collect_resume_attachments(
    gmail: &GmailClient,
    message: &Message,
) -> (Vec<NewAttachment>, Option<String>) {
    let mut fetched = Vec::new();
    let mut resume_text = None;

    let Some(payload) = message.payload.as_ref() else {
        return (fetched, resume_text);
    };

    for part in payload.named_parts() {
        if !extract::has_resume_extension(&part.filename) {
            continue;
        }
        let Some(attachment_id) = part.body.attachment_id.as_deref() else {
            continue;
        };

        let data = match gmail.get_attachment(&message.id, attachment_id).await {
            Ok(data) => data,
            Err(e) => {
                warn!(filename = %part.filename, "attachment fetch failed: {e}");
                continue;
            }
        };

        fetched.push(NewAttachment {
            filename: part.filename.clone(),
            content_type: part.mime_type.clone(),
            data: data.to_vec(),
        });

        match extract::extract_text(&data, &part.mime_type) {
            Ok(text) if !text.is_empty() => {
                resume_text = Some(text);
                break; // first success wins
            }
            Ok(_) => debug!(filename = %part.filename, "attachment contained no text"),
            Err(e) => debug!(filename = %part.filename, "attachment not parseable: {e}"),
        }
    }

    (fetched, resume_text)
}

/// Case-insensitive substring check of the job title against the Subject.
fn subject_matches(subject: &str, job_title: &str) -> bool {
    subject.to_lowercase().contains(&job_title.to_lowercase())
}

/// Splits a From header into display name and address: the text before the
/// first `<` and the text inside `<...>`. A bare address is used for both.
fn parse_sender(from: &str) -> (String, String) {
    match (from.find('<'), from.rfind('>')) {
        (Some(open), Some(close)) if open < close => {
            let name = from[..open].trim().trim_matches('"').trim().to_string();
            let email = from[open + 1..close].trim().to_string();
            if name.is_empty() {
                (email.clone(), email)
            } else {
                (name, email)
            }
        }
        _ => {
            let email = from.trim().to_string();
            (email.clone(), email)
        }
    }
}

/// Best-effort body text: a text/plain part, else text/html, else the
/// message snippet, else a placeholder.
fn extract_body_text(message: &Message) -> String {
    let decoded = message.payload.as_ref().and_then(|payload| {
        ["text/plain", "text/html"].iter().find_map(|mime| {
            payload
                .find_part_with_mime(mime)
                .and_then(|part| part.body.data.as_deref())
                .and_then(|data| decode_base64url(data).ok())
                .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
                .filter(|text| !text.is_empty())
        })
    });

    decoded
        .or_else(|| {
            let snippet = message.snippet.trim();
            (!snippet.is_empty()).then(|| snippet.to_string())
        })
        .unwrap_or_else(|| EMPTY_BODY_PLACEHOLDER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::types::{Header, MessagePart, PartBody};
    use base64::prelude::{Engine as _, BASE64_URL_SAFE};

    fn message_with_parts(snippet: &str, parts: Vec<MessagePart>) -> Message {
        Message {
            id: "msg-1".to_string(),
            thread_id: "thread-1".to_string(),
            snippet: snippet.to_string(),
            payload: Some(MessagePart {
                mime_type: "multipart/mixed".to_string(),
                headers: vec![Header {
                    name: "Subject".to_string(),
                    value: "Application".to_string(),
                }],
                parts,
                ..Default::default()
            }),
        }
    }

    fn text_part(mime: &str, content: &str) -> MessagePart {
        MessagePart {
            mime_type: mime.to_string(),
            body: PartBody {
                attachment_id: None,
                data: Some(BASE64_URL_SAFE.encode(content)),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_subject_matching_is_case_insensitive() {
        assert!(subject_matches("Application for BACKEND ENGINEER", "Backend Engineer"));
        assert!(subject_matches("re: backend engineer role", "Backend Engineer"));
        assert!(subject_matches("Backend engineer", "backend ENGINEER"));
        assert!(!subject_matches("Frontend Engineer application", "Backend Engineer"));
    }

    #[test]
    fn test_parse_sender_with_display_name() {
        let (name, email) = parse_sender("\"Jane Doe\" <jane@example.com>");
        assert_eq!(name, "Jane Doe");
        assert_eq!(email, "jane@example.com");
    }

    #[test]
    fn test_parse_sender_unquoted_name() {
        let (name, email) = parse_sender("John Smith <john@example.com>");
        assert_eq!(name, "John Smith");
        assert_eq!(email, "john@example.com");
    }

    #[test]
    fn test_parse_sender_bare_address() {
        let (name, email) = parse_sender("jane@example.com");
        assert_eq!(name, "jane@example.com");
        assert_eq!(email, "jane@example.com");
    }

    #[test]
    fn test_parse_sender_empty_display_name_falls_back_to_address() {
        let (name, email) = parse_sender("<jane@example.com>");
        assert_eq!(name, "jane@example.com");
        assert_eq!(email, "jane@example.com");
    }

    #[test]
    fn test_body_prefers_plain_text_over_html() {
        let message = message_with_parts(
            "snippet text",
            vec![
                text_part("text/html", "<p>hello html</p>"),
                text_part("text/plain", "hello plain"),
            ],
        );
        assert_eq!(extract_body_text(&message), "hello plain");
    }

    #[test]
    fn test_body_falls_back_to_html() {
        let message =
            message_with_parts("snippet text", vec![text_part("text/html", "<p>hello</p>")]);
        assert_eq!(extract_body_text(&message), "<p>hello</p>");
    }

    #[test]
    fn test_body_falls_back_to_snippet() {
        let message = message_with_parts("snippet text", vec![]);
        assert_eq!(extract_body_text(&message), "snippet text");
    }

    #[test]
    fn test_body_placeholder_when_nothing_available() {
        let message = message_with_parts("", vec![]);
        assert_eq!(extract_body_text(&message), EMPTY_BODY_PLACEHOLDER);
    }

    #[test]
    fn test_body_found_in_nested_multipart() {
        let message = message_with_parts(
            "",
            vec![MessagePart {
                mime_type: "multipart/alternative".to_string(),
                parts: vec![text_part("text/plain", "nested body")],
                ..Default::default()
            }],
        );
        assert_eq!(extract_body_text(&message), "nested body");
    }
}
