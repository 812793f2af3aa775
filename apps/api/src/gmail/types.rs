//! Serde types for the Gmail REST API payloads this service touches.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageRef {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub snippet: String,
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: PartBody,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    pub attachment_id: Option<String>,
    pub data: Option<String>,
}

/// Body of `GET .../attachments/{id}` — base64url-encoded payload.
#[derive(Debug, Deserialize)]
pub struct AttachmentBody {
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub email_address: String,
}

impl MessagePart {
    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.trim().to_string())
    }

    /// Depth-first search for the first part with the given MIME type.
    pub fn find_part_with_mime(&self, target: &str) -> Option<&MessagePart> {
        if self.mime_type.eq_ignore_ascii_case(target) {
            return Some(self);
        }
        self.parts
            .iter()
            .find_map(|child| child.find_part_with_mime(target))
    }

    /// Depth-first walk collecting every part carrying a filename.
    pub fn named_parts(&self) -> Vec<&MessagePart> {
        let mut found = Vec::new();
        self.collect_named_parts(&mut found);
        found
    }

    fn collect_named_parts<'a>(&'a self, found: &mut Vec<&'a MessagePart>) {
        if !self.filename.is_empty() {
            found.push(self);
        }
        for child in &self.parts {
            child.collect_named_parts(found);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(mime: &str, filename: &str, children: Vec<MessagePart>) -> MessagePart {
        MessagePart {
            filename: filename.to_string(),
            mime_type: mime.to_string(),
            parts: children,
            ..Default::default()
        }
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let payload = MessagePart {
            headers: vec![Header {
                name: "Subject".to_string(),
                value: "  Application for Data Analyst role ".to_string(),
            }],
            ..Default::default()
        };
        assert_eq!(
            payload.header_value("subject").as_deref(),
            Some("Application for Data Analyst role")
        );
        assert_eq!(payload.header_value("From"), None);
    }

    #[test]
    fn test_find_part_with_mime_recurses() {
        let tree = part(
            "multipart/mixed",
            "",
            vec![
                part(
                    "multipart/alternative",
                    "",
                    vec![part("text/plain", "", vec![]), part("text/html", "", vec![])],
                ),
                part("application/pdf", "resume.pdf", vec![]),
            ],
        );
        assert!(tree.find_part_with_mime("text/html").is_some());
        assert!(tree.find_part_with_mime("image/png").is_none());
    }

    #[test]
    fn test_named_parts_collects_nested_attachments() {
        let tree = part(
            "multipart/mixed",
            "",
            vec![
                part("text/plain", "", vec![]),
                part(
                    "multipart/mixed",
                    "",
                    vec![part("application/pdf", "inner.pdf", vec![])],
                ),
                part("application/msword", "outer.doc", vec![]),
            ],
        );
        let names: Vec<&str> = tree.named_parts().iter().map(|p| p.filename.as_str()).collect();
        assert_eq!(names, vec!["inner.pdf", "outer.doc"]);
    }
}
