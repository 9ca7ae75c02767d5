//! Answer synthesis: turning a raw API body into a short plain-text answer

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tracing::{debug, warn};

use crate::oracle::{OracleError, TextGenerator};

/// Returned when the oracle has no credential
pub const NOT_CONFIGURED_ANSWER: &str =
    "The reasoning service is not configured, so no summary could be produced.";

/// Returned when the oracle call fails or answers with nothing
pub const UNAVAILABLE_ANSWER: &str = "The request succeeded, but no summary could be produced.";

/// Longest API body forwarded to the oracle
const MAX_BODY_CHARS: usize = 16_000;

/// Produces the user-facing summary of a successful call. Never fails.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    /// Summarize `api_body` as an answer to `prompt`
    async fn summarize(
        &self,
        prompt: &str,
        operation_description: &str,
        api_body: &str,
        initiating_user_id: &str,
    ) -> String;
}

/// [`AnswerSynthesizer`] backed by a text-generation oracle
pub struct OracleAnswerSynthesizer {
    oracle: Arc<dyn TextGenerator>,
}

impl OracleAnswerSynthesizer {
    /// Create a synthesizer over `oracle`
    pub fn new(oracle: Arc<dyn TextGenerator>) -> Self {
        Self { oracle }
    }
}

#[async_trait]
impl AnswerSynthesizer for OracleAnswerSynthesizer {
    async fn summarize(
        &self,
        prompt: &str,
        operation_description: &str,
        api_body: &str,
        initiating_user_id: &str,
    ) -> String {
        if !self.oracle.is_configured() {
            warn!("Answer synthesis skipped because the oracle API key is not set");
            return NOT_CONFIGURED_ANSWER.to_string();
        }

        let today = Utc::now().date_naive();
        let request = build_answer_prompt(
            prompt,
            operation_description,
            api_body,
            initiating_user_id,
            today,
        );
        debug!(operation = %operation_description, "Requesting answer synthesis");

        match self.oracle.generate(&request).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) | Err(OracleError::EmptyResponse) => {
                warn!("Answer synthesis returned no text");
                UNAVAILABLE_ANSWER.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Answer synthesis failed");
                UNAVAILABLE_ANSWER.to_string()
            }
        }
    }
}

pub(crate) fn build_answer_prompt(
    prompt: &str,
    operation_description: &str,
    api_body: &str,
    initiating_user_id: &str,
    today: NaiveDate,
) -> String {
    let body: String = api_body.chars().take(MAX_BODY_CHARS).collect();
    let mut out = String::new();
    let _ = writeln!(out, "User request: {prompt}");
    let _ = writeln!(out, "Requesting user id: {initiating_user_id}");
    let _ = writeln!(out, "Action performed: {operation_description}");
    let _ = writeln!(out, "API response: {body}");
    let _ = writeln!(out, "Today's date: {}", today.format("%Y-%m-%d"));
    let _ = writeln!(out, "Instructions:");
    let _ = writeln!(out, "- Summarize the API response briefly as an answer to the request.");
    let _ = writeln!(out, "- Do not propose any further actions.");
    let _ = writeln!(
        out,
        "- Write dates in plain words (for example \"3 days ago\" or \"on 4 May 2025\"), never as ISO-8601 timestamps."
    );
    let _ = write!(out, "- Answer in plain text without Markdown or other formatting.");
    out
}
