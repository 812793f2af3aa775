//! Scoring client — the single point of entry for all AI scoring calls.
//!
//! Scoring is deliberately infallible at the interface: any network,
//! parsing, or schema failure degrades to a default score so a scoring
//! outage never blocks application creation. The fallback values are part
//! of the observable contract because the UI displays them.

pub mod prompts;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use prompts::{SCORE_PROMPT, SCORE_SYSTEM};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
/// The model used for all scoring calls.
pub const MODEL: &str = "gpt-4o-mini";
const MAX_TOKENS: u32 = 150;
const TEMPERATURE: f64 = 0.7;
const MAX_RETRIES: u32 = 3;

/// Summary stored when the model reply is missing or unusable.
pub const FALLBACK_SUMMARY: &str = "Unable to generate summary";
/// Score stored when the scoring call fails outright.
pub const FALLBACK_SCORE: f64 = 0.0;
/// Score stored when the reply parses but omits the score field.
const MISSING_SCORE_DEFAULT: f64 = 5.0;

#[derive(Debug, Error)]
enum ScoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model returned empty content")]
    EmptyContent,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumeScore {
    pub score: f64,
    pub summary: String,
}

impl ResumeScore {
    fn fallback() -> Self {
        Self {
            score: FALLBACK_SCORE,
            summary: FALLBACK_SUMMARY.to_string(),
        }
    }
}

/// Scores a resume against a job description. Never fails; see module docs.
#[async_trait]
pub trait ResumeScorer: Send + Sync {
    async fn score(&self, resume_text: &str, job_description: &str) -> ResumeScore;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScorePayload {
    score: Option<f64>,
    summary: Option<String>,
}

/// OpenAI-backed scorer. Retries on 429 and 5xx with exponential backoff.
pub struct OpenAiScorer {
    client: Client,
    api_key: String,
}

impl OpenAiScorer {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    async fn try_score(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<ResumeScore, ScoreError> {
        let resume_text = resume_text.trim();
        let prompt = SCORE_PROMPT
            .replace("{job_description}", job_description)
            .replace(
                "{resume_text}",
                if resume_text.is_empty() {
                    "No resume content provided"
                } else {
                    resume_text
                },
            );

        let request_body = ChatRequest {
            model: MODEL,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SCORE_SYSTEM,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let mut last_error: Option<ScoreError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Scoring call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(OPENAI_API_URL)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(ScoreError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Scoring API returned {}: {}", status, body);
                last_error = Some(ScoreError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ScoreError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let chat: ChatResponse = response.json().await?;
            let content = chat
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or(ScoreError::EmptyContent)?;

            debug!("Scoring call succeeded");
            return parse_score_reply(&content);
        }

        Err(last_error.unwrap_or(ScoreError::EmptyContent))
    }
}

#[async_trait]
impl ResumeScorer for OpenAiScorer {
    async fn score(&self, resume_text: &str, job_description: &str) -> ResumeScore {
        match self.try_score(resume_text, job_description).await {
            Ok(score) => score,
            Err(e) => {
                warn!("Resume scoring failed, storing fallback: {e}");
                ResumeScore::fallback()
            }
        }
    }
}

fn parse_score_reply(text: &str) -> Result<ResumeScore, ScoreError> {
    let payload: ScorePayload = serde_json::from_str(strip_json_fences(text))?;
    Ok(ResumeScore {
        score: payload.score.unwrap_or(MISSING_SCORE_DEFAULT).clamp(0.0, 10.0),
        summary: payload
            .summary
            .unwrap_or_else(|| FALLBACK_SUMMARY.to_string()),
    })
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"score\": 7}\n```";
        assert_eq!(strip_json_fences(input), "{\"score\": 7}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"score\": 7}\n```";
        assert_eq!(strip_json_fences(input), "{\"score\": 7}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"score\": 7}";
        assert_eq!(strip_json_fences(input), "{\"score\": 7}");
    }

    #[test]
    fn test_parse_score_reply_well_formed() {
        let parsed =
            parse_score_reply(r#"{"score": 8, "summary": "Strong match for the role."}"#).unwrap();
        assert_eq!(parsed.score, 8.0);
        assert_eq!(parsed.summary, "Strong match for the role.");
    }

    #[test]
    fn test_parse_score_reply_fenced() {
        let parsed =
            parse_score_reply("```json\n{\"score\": 3, \"summary\": \"Weak fit\"}\n```").unwrap();
        assert_eq!(parsed.score, 3.0);
    }

    #[test]
    fn test_parse_score_reply_missing_score_defaults_to_five() {
        let parsed = parse_score_reply(r#"{"summary": "No score given"}"#).unwrap();
        assert_eq!(parsed.score, 5.0);
    }

    #[test]
    fn test_parse_score_reply_missing_summary_uses_fallback() {
        let parsed = parse_score_reply(r#"{"score": 6}"#).unwrap();
        assert_eq!(parsed.summary, FALLBACK_SUMMARY);
    }

    #[test]
    fn test_parse_score_reply_clamps_out_of_range() {
        let parsed = parse_score_reply(r#"{"score": 42, "summary": "x"}"#).unwrap();
        assert_eq!(parsed.score, 10.0);
        let parsed = parse_score_reply(r#"{"score": -3, "summary": "x"}"#).unwrap();
        assert_eq!(parsed.score, 0.0);
    }

    #[test]
    fn test_parse_score_reply_malformed_is_error() {
        assert!(parse_score_reply("the candidate looks great!").is_err());
    }

    #[test]
    fn test_fallback_values() {
        let fallback = ResumeScore::fallback();
        assert_eq!(fallback.score, 0.0);
        assert_eq!(fallback.summary, "Unable to generate summary");
    }
}
