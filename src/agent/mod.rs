//! Natural-language agent pipeline
//!
//! ```text
//! prompt ─▶ IntentResolver ─▶ allow-list ─▶ resolve ─▶ ApiCaller ─┬─▶ translate  ─▶ envelope
//!                                                                 └─▶ summarize  ─▶ envelope
//! ```
//!
//! Every stage reports into a single [`AgentResponse`] envelope; nothing
//! crosses the [`AgentOrchestrator`] boundary as an error.

pub mod executor;
pub mod intent;
mod orchestrator;
pub mod synthesis;
pub mod translate;

#[cfg(test)]
pub(crate) mod testing;

pub use executor::{ApiCaller, ApiSuccess, CallError, ExternalCallFailure, HttpApiCaller};
pub use intent::{IntentResolver, NO_MATCH_SENTINEL, OracleIntentResolver};
pub use orchestrator::AgentOrchestrator;
pub use synthesis::{AnswerSynthesizer, OracleAnswerSynthesizer};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The oracle's parsed choice
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decision {
    /// Chosen operation, `None` when nothing was chosen
    pub operation_name: Option<String>,
    /// Free-text justification or failure description
    pub reason: String,
    /// Extracted arguments keyed by parameter name
    pub arguments: BTreeMap<String, String>,
}

impl Decision {
    /// A decision that selects nothing
    pub fn none(reason: impl Into<String>) -> Self {
        Self {
            operation_name: None,
            reason: reason.into(),
            arguments: BTreeMap::new(),
        }
    }
}

/// `POST /agent/run` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    /// Free-text instruction
    pub prompt: String,
}

/// Where and why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Inbound request was malformed (e.g. blank prompt)
    InvalidRequest,
    /// The oracle did not choose an operation
    NoDecision,
    /// The chosen operation is not on the allow-list
    PolicyViolation,
    /// Arguments could not be bound into the operation
    ResolutionError,
    /// The operation needs a credential the caller did not send
    AuthorizationMissing,
    /// The application API could not be reached
    TransportFailure,
    /// The application API answered with an error status
    UpstreamStatusFailure,
}

/// Uniform result envelope. Every field is always serialized; stages that
/// were not reached leave theirs `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    /// Whether the application call succeeded
    pub success: bool,
    /// Operation name (canonical when it was found in the catalog)
    pub operation_name: Option<String>,
    /// Final URL of the application call
    pub requested_url: Option<String>,
    /// Raw application response body (success only)
    pub raw_response_body: Option<String>,
    /// Human-readable summary or templated failure text
    pub summary_text: Option<String>,
    /// Oracle's justification
    pub decision_reason: Option<String>,
    /// Arguments extracted by the oracle
    pub resolved_arguments: Option<BTreeMap<String, String>>,
    /// Principal that issued the prompt
    pub initiating_user_id: String,
    /// User-facing failure message
    pub error: Option<String>,
    /// Failure category
    pub failure_kind: Option<FailureKind>,
    /// HTTP status of an upstream failure
    pub upstream_status: Option<u16>,
}

impl AgentResponse {
    /// An empty failure envelope for `initiating_user_id`
    pub fn failure(
        initiating_user_id: impl Into<String>,
        kind: FailureKind,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            operation_name: None,
            requested_url: None,
            raw_response_body: None,
            summary_text: None,
            decision_reason: None,
            resolved_arguments: None,
            initiating_user_id: initiating_user_id.into(),
            error: Some(error.into()),
            failure_kind: Some(kind),
            upstream_status: None,
        }
    }

    /// Attach the decision that led here
    #[must_use]
    pub fn with_decision(mut self, decision: &Decision) -> Self {
        self.decision_reason = Some(decision.reason.clone());
        self.resolved_arguments = Some(decision.arguments.clone());
        self
    }

    /// Attach the operation name
    #[must_use]
    pub fn with_operation(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}
