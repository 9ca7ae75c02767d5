//! Intent resolution: asking the oracle which operation a prompt wants.
//!
//! The oracle sees the catalog (names, methods, paths, parameters) and must
//! answer with `{"operationName", "reason", "arguments"}`. Its choice is
//! advisory; the allow-list check happens in the orchestrator.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use gateway_core::Operation;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::Decision;
use crate::oracle::TextGenerator;

/// Operation name the oracle must use when nothing fits
pub const NO_MATCH_SENTINEL: &str = "NONE";

/// Turns a prompt into a [`Decision`]. Never fails: problems are reported as
/// a decision without an operation and a human-readable reason.
#[async_trait]
pub trait IntentResolver: Send + Sync {
    /// Choose one of `operations` for `prompt`
    async fn resolve_intent(
        &self,
        prompt: &str,
        operations: &[Operation],
        initiating_user_id: &str,
    ) -> Decision;
}

/// [`IntentResolver`] backed by a text-generation oracle
pub struct OracleIntentResolver {
    oracle: Arc<dyn TextGenerator>,
}

impl OracleIntentResolver {
    /// Create a resolver over `oracle`
    pub fn new(oracle: Arc<dyn TextGenerator>) -> Self {
        Self { oracle }
    }
}

#[async_trait]
impl IntentResolver for OracleIntentResolver {
    async fn resolve_intent(
        &self,
        prompt: &str,
        operations: &[Operation],
        initiating_user_id: &str,
    ) -> Decision {
        if operations.is_empty() {
            warn!("Operation selection skipped because the catalog is empty");
            return Decision::none("No operations are registered, so none could be selected.");
        }
        if !self.oracle.is_configured() {
            warn!("Operation selection skipped because the oracle API key is not set");
            return Decision::none(
                "The reasoning service is not configured, so no operation could be selected.",
            );
        }

        debug!(
            prompt_preview = %prompt.chars().take(120).collect::<String>(),
            operations = operations.len(),
            "Selecting operation"
        );

        let selection_prompt = build_selection_prompt(prompt, operations, initiating_user_id);
        let answer = match self.oracle.generate(&selection_prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Operation selection failed");
                return Decision::none(format!("Operation selection failed: {e}"));
            }
        };

        let decision = match parse_decision(&answer, operations) {
            Ok(decision) => decision,
            Err(message) => {
                warn!(error = %message, "Operation selection answer could not be parsed");
                debug!(answer = %answer, "Unparseable oracle answer");
                return Decision::none(format!(
                    "The reasoning service answer was not valid JSON: {message}"
                ));
            }
        };

        info!(
            operation = ?decision.operation_name,
            reason = %decision.reason,
            arguments = ?decision.arguments.keys().collect::<Vec<_>>(),
            "Operation selected by oracle"
        );
        decision
    }
}

/// Render the catalog and rules into the selection prompt
pub(crate) fn build_selection_prompt(
    prompt: &str,
    operations: &[Operation],
    initiating_user_id: &str,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Task: read the user's request and choose exactly one operation from the list below."
    );
    let _ = writeln!(out, "Operations:");
    for op in operations {
        let params = if op.parameters.is_empty() {
            "none".to_string()
        } else {
            op.parameters
                .iter()
                .map(|p| {
                    format!(
                        "{}({}, required={}, {})",
                        p.name, p.location, p.required, p.description
                    )
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        let _ = writeln!(
            out,
            "- {}: {} [{} {}] Params: {}",
            op.name, op.description, op.method, op.path_template, params
        );
    }
    let _ = writeln!(out, "Rules:");
    let _ = writeln!(
        out,
        "1) Only choose an operationName that appears in the list, spelled exactly as listed."
    );
    let _ = writeln!(
        out,
        "2) If no operation fits the request, use \"{NO_MATCH_SENTINEL}\" as operationName."
    );
    let _ = writeln!(
        out,
        "3) Answer with JSON only: {{\"operationName\": \"...\", \"reason\": \"...\", \"arguments\": {{\"param\": \"value\"}}}}"
    );
    let _ = writeln!(
        out,
        "4) Put every parameter value you can extract into `arguments` as a string keyed by parameter name."
    );
    let _ = writeln!(out, "5) Keep the reason short and clear.");
    let _ = writeln!(out, "Requesting user id (context only): {initiating_user_id}");
    let _ = write!(out, "User prompt: {prompt}");
    out
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectionPayload {
    #[serde(default, alias = "routeName")]
    operation_name: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    arguments: Option<serde_json::Map<String, Value>>,
}

/// Parse the oracle answer into a decision.
///
/// Accepts an optional Markdown code fence around the JSON and, failing a
/// direct parse, the outermost `{...}` span of the text.
pub(crate) fn parse_decision(answer: &str, operations: &[Operation]) -> Result<Decision, String> {
    let text = strip_code_fence(answer);
    let payload: SelectionPayload = match serde_json::from_str(text) {
        Ok(payload) => payload,
        Err(first_error) => outermost_object(answer.trim())
            .and_then(|span| serde_json::from_str(span).ok())
            .ok_or_else(|| first_error.to_string())?,
    };

    let reason = payload
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "The reasoning service gave no reason.".to_string());

    let arguments = payload
        .arguments
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| stringify_argument(value).map(|v| (key, v)))
        .collect::<BTreeMap<_, _>>();

    let name = payload
        .operation_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty() && !n.eq_ignore_ascii_case(NO_MATCH_SENTINEL));

    let operation_name = name.map(|name| {
        match operations.iter().find(|op| op.name.eq_ignore_ascii_case(&name)) {
            Some(op) => op.name.clone(),
            None => {
                warn!(
                    operation = %name,
                    "Oracle proposed an operation outside the supplied catalog"
                );
                name
            }
        }
    });

    Ok(Decision {
        operation_name,
        reason,
        arguments,
    })
}

fn strip_code_fence(answer: &str) -> &str {
    let trimmed = answer.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_end();
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Info string (e.g. "json"), with or without a newline after it
    rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        .trim()
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn stringify_argument(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
