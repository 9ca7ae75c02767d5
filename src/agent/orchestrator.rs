//! Orchestrator: drives one agent invocation from prompt to envelope

use std::sync::Arc;

use gateway_core::{RouteCatalog, resolve};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::translate::translate;
use super::{
    AgentResponse, AnswerSynthesizer, ApiCaller, CallError, FailureKind, IntentResolver,
};

/// Error text for an operation outside the catalog
pub const POLICY_REJECTION: &str =
    "Policy rejected: the selected operation is not on the allow-list.";

/// Longest upstream error body written to the log
const MAX_LOGGED_BODY_CHARS: usize = 500;

#[derive(Debug, Clone, Copy)]
enum Stage {
    SelectingOperation,
    ValidatingAllowList,
    ResolvingRequest,
    ExecutingCall,
    TranslatingError,
    SynthesizingAnswer,
    Done,
}

/// Runs prompts through intent resolution, policy, resolution, execution
/// and translation or synthesis
#[derive(Clone)]
pub struct AgentOrchestrator {
    catalog: Arc<RouteCatalog>,
    intent: Arc<dyn IntentResolver>,
    caller: Arc<dyn ApiCaller>,
    synthesizer: Arc<dyn AnswerSynthesizer>,
}

impl AgentOrchestrator {
    /// Assemble an orchestrator from its collaborators
    pub fn new(
        catalog: Arc<RouteCatalog>,
        intent: Arc<dyn IntentResolver>,
        caller: Arc<dyn ApiCaller>,
        synthesizer: Arc<dyn AnswerSynthesizer>,
    ) -> Self {
        Self {
            catalog,
            intent,
            caller,
            synthesizer,
        }
    }

    /// The allow-list this orchestrator enforces
    #[must_use]
    pub fn catalog(&self) -> &RouteCatalog {
        &self.catalog
    }

    /// Run one invocation. Every outcome is reported in the envelope.
    pub async fn run(
        &self,
        prompt: &str,
        credential: Option<&str>,
        initiating_user_id: &str,
    ) -> AgentResponse {
        let invocation = Uuid::new_v4();
        let transition = |stage: Stage| debug!(%invocation, ?stage, "Agent stage");

        if prompt.trim().is_empty() {
            return AgentResponse::failure(
                initiating_user_id,
                FailureKind::InvalidRequest,
                "Prompt must not be blank.",
            );
        }

        info!(%invocation, user = %initiating_user_id, "Agent invoked");

        transition(Stage::SelectingOperation);
        let decision = self
            .intent
            .resolve_intent(prompt, self.catalog.operations(), initiating_user_id)
            .await;

        let Some(selected) = decision.operation_name.clone() else {
            warn!(%invocation, reason = %decision.reason, "No operation selected");
            transition(Stage::Done);
            return AgentResponse::failure(
                initiating_user_id,
                FailureKind::NoDecision,
                decision.reason.clone(),
            )
            .with_decision(&decision);
        };

        transition(Stage::ValidatingAllowList);
        let Some(operation) = self.catalog.find_by_name(&selected) else {
            warn!(
                %invocation,
                operation = %selected,
                "Selected operation is not on the allow-list"
            );
            transition(Stage::Done);
            return AgentResponse::failure(
                initiating_user_id,
                FailureKind::PolicyViolation,
                POLICY_REJECTION,
            )
            .with_decision(&decision)
            .with_operation(selected);
        };

        transition(Stage::ResolvingRequest);
        let resolved = match resolve(operation, &decision.arguments) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(
                    %invocation,
                    operation = %operation.name,
                    error = %e,
                    "Request resolution failed"
                );
                transition(Stage::Done);
                return AgentResponse::failure(
                    initiating_user_id,
                    FailureKind::ResolutionError,
                    e.to_string(),
                )
                .with_decision(&decision)
                .with_operation(&operation.name);
            }
        };

        transition(Stage::ExecutingCall);
        info!(
            %invocation,
            operation = %operation.name,
            path = %resolved.path,
            "Executing operation"
        );
        let success = match self.caller.call(operation, &resolved, credential).await {
            Ok(success) => success,
            Err(CallError::AuthorizationMissing { .. }) => {
                warn!(%invocation, operation = %operation.name, "Operation requires a credential");
                transition(Stage::Done);
                return AgentResponse::failure(
                    initiating_user_id,
                    FailureKind::AuthorizationMissing,
                    format!("`{}` requires you to be signed in.", operation.name),
                )
                .with_decision(&decision)
                .with_operation(&operation.name);
            }
            Err(CallError::Transport { url, message, .. }) => {
                warn!(
                    %invocation,
                    operation = %operation.name,
                    url = %url,
                    error = %message,
                    "Application API unreachable"
                );
                transition(Stage::Done);
                let mut response = AgentResponse::failure(
                    initiating_user_id,
                    FailureKind::TransportFailure,
                    format!("`{}` could not be reached. Please try again later.", operation.name),
                )
                .with_decision(&decision)
                .with_operation(&operation.name);
                response.requested_url = Some(url);
                return response;
            }
            Err(CallError::Status(failure)) => {
                transition(Stage::TranslatingError);
                warn!(
                    %invocation,
                    operation = %operation.name,
                    url = %failure.url,
                    status = ?failure.status_code,
                    body = %failure
                        .response_body
                        .as_deref()
                        .unwrap_or_default()
                        .chars()
                        .take(MAX_LOGGED_BODY_CHARS)
                        .collect::<String>(),
                    "Application API returned an error status"
                );
                let translation = translate(operation, &failure, &decision.arguments);
                transition(Stage::Done);
                let mut response = AgentResponse::failure(
                    initiating_user_id,
                    FailureKind::UpstreamStatusFailure,
                    translation.message.clone(),
                )
                .with_decision(&decision)
                .with_operation(&operation.name);
                response.requested_url = Some(failure.url);
                response.upstream_status = failure.status_code;
                response.summary_text = translation.templated.then_some(translation.message);
                return response;
            }
        };

        transition(Stage::SynthesizingAnswer);
        let summary = self
            .synthesizer
            .summarize(
                prompt,
                &operation.description,
                &success.body,
                initiating_user_id,
            )
            .await;

        transition(Stage::Done);
        info!(%invocation, operation = %operation.name, "Agent invocation succeeded");
        AgentResponse {
            success: true,
            operation_name: Some(operation.name.clone()),
            requested_url: Some(success.url),
            raw_response_body: Some(success.body),
            summary_text: Some(summary),
            decision_reason: Some(decision.reason),
            resolved_arguments: Some(decision.arguments),
            initiating_user_id: initiating_user_id.to_string(),
            error: None,
            failure_kind: None,
            upstream_status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use gateway_core::{HttpMethod, Operation, Parameter, ResolvedRequest};
    use pretty_assertions::assert_eq;

    use crate::agent::{ApiSuccess, Decision, ExternalCallFailure};

    struct FixedIntent(Decision);

    #[async_trait]
    impl IntentResolver for FixedIntent {
        async fn resolve_intent(&self, _: &str, _: &[Operation], _: &str) -> Decision {
            self.0.clone()
        }
    }

    struct RecordingCaller {
        outcome: Result<ApiSuccess, CallError>,
        calls: AtomicUsize,
        requests: Mutex<Vec<ResolvedRequest>>,
    }

    impl RecordingCaller {
        fn new(outcome: Result<ApiSuccess, CallError>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ApiCaller for RecordingCaller {
        async fn call(
            &self,
            _: &Operation,
            resolved: &ResolvedRequest,
            _: Option<&str>,
        ) -> Result<ApiSuccess, CallError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(resolved.clone());
            self.outcome.clone()
        }
    }

    struct EchoSynthesizer;

    #[async_trait]
    impl AnswerSynthesizer for EchoSynthesizer {
        async fn summarize(&self, _: &str, description: &str, body: &str, _: &str) -> String {
            format!("{description}: {body}")
        }
    }

    fn catalog() -> Arc<RouteCatalog> {
        Arc::new(
            RouteCatalog::new(vec![
                Operation::new(
                    "Get User By Username",
                    "Fetch a profile",
                    HttpMethod::Get,
                    "api/v1/users/username/{username}",
                )
                .with_parameter(Parameter::path("username", "Username")),
                Operation::new(
                    "Send Friend Request",
                    "Send a friend request",
                    HttpMethod::Post,
                    "api/v1/friends/requests",
                )
                .with_parameter(Parameter::body("receiverId", "Receiver"))
                .with_parameter(Parameter::body("message", "Message").optional())
                .with_error_template(409, "There is already a pending request with this user."),
            ])
            .unwrap(),
        )
    }

    fn decision(name: Option<&str>, args: &[(&str, &str)]) -> Decision {
        Decision {
            operation_name: name.map(str::to_string),
            reason: "because".to_string(),
            arguments: args
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    fn orchestrator(decision: Decision, caller: Arc<RecordingCaller>) -> AgentOrchestrator {
        AgentOrchestrator::new(
            catalog(),
            Arc::new(FixedIntent(decision)),
            caller,
            Arc::new(EchoSynthesizer),
        )
    }

    fn ok_body(body: &str) -> Result<ApiSuccess, CallError> {
        Ok(ApiSuccess {
            operation_name: "x".to_string(),
            url: "http://api.test/x".to_string(),
            body: body.to_string(),
        })
    }

    #[tokio::test]
    async fn blank_prompt_is_invalid() {
        let caller = RecordingCaller::new(ok_body("{}"));
        let response = orchestrator(decision(None, &[]), caller.clone())
            .run("   ", None, "u-1")
            .await;

        assert_eq!(response.failure_kind, Some(FailureKind::InvalidRequest));
        assert_eq!(caller.calls(), 0);
    }

    #[tokio::test]
    async fn no_decision_reports_reason() {
        let caller = RecordingCaller::new(ok_body("{}"));
        let response = orchestrator(decision(None, &[]), caller.clone())
            .run("what's the weather", None, "u-1")
            .await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("because"));
        assert_eq!(response.failure_kind, Some(FailureKind::NoDecision));
        assert_eq!(response.requested_url, None);
        assert_eq!(caller.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_operation_is_rejected_without_call() {
        let caller = RecordingCaller::new(ok_body("{}"));
        let response = orchestrator(decision(Some("Delete Account"), &[]), caller.clone())
            .run("delete my account", Some("Bearer t"), "u-1")
            .await;

        assert_eq!(response.error.as_deref(), Some(POLICY_REJECTION));
        assert_eq!(response.failure_kind, Some(FailureKind::PolicyViolation));
        assert_eq!(response.operation_name.as_deref(), Some("Delete Account"));
        assert_eq!(caller.calls(), 0);
    }

    #[tokio::test]
    async fn missing_required_argument_fails_before_call() {
        let caller = RecordingCaller::new(ok_body("{}"));
        let response = orchestrator(decision(Some("Get User By Username"), &[]), caller.clone())
            .run("show a profile", Some("Bearer t"), "u-1")
            .await;

        assert_eq!(
            response.error.as_deref(),
            Some("`Get User By Username` requires parameter `username`.")
        );
        assert_eq!(response.failure_kind, Some(FailureKind::ResolutionError));
        assert_eq!(caller.calls(), 0);
    }

    #[tokio::test]
    async fn optional_body_parameter_is_omitted() {
        let caller = RecordingCaller::new(ok_body(r#"{"status":"PENDING"}"#));
        let response = orchestrator(
            decision(Some("Send Friend Request"), &[("receiverId", "42")]),
            caller.clone(),
        )
        .run("send a request to 42", Some("Bearer t"), "u-1")
        .await;

        assert!(response.success);
        let requests = caller.requests.lock().unwrap();
        assert_eq!(requests[0].body.as_deref(), Some(r#"{"receiverId":"42"}"#));
        assert_eq!(
            response.summary_text.as_deref(),
            Some(r#"Send a friend request: {"status":"PENDING"}"#)
        );
    }

    #[tokio::test]
    async fn upstream_404_uses_username_fallback_and_hides_body() {
        let caller = RecordingCaller::new(Err(CallError::Status(ExternalCallFailure {
            operation_name: "Get User By Username".to_string(),
            url: "http://api.test/api/v1/users/username/jdoe".to_string(),
            status_code: Some(404),
            response_body: Some(r#"{"trace":"secret internals"}"#.to_string()),
        })));
        let response = orchestrator(
            decision(Some("Get User By Username"), &[("username", "jdoe")]),
            caller,
        )
        .run("show me jdoe", Some("Bearer t"), "u-1")
        .await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("No user named 'jdoe' was found."));
        assert_eq!(response.summary_text, None);
        assert_eq!(response.upstream_status, Some(404));
        assert_eq!(
            response.requested_url.as_deref(),
            Some("http://api.test/api/v1/users/username/jdoe")
        );
        assert_eq!(response.raw_response_body, None);
    }

    #[tokio::test]
    async fn upstream_templated_error_fills_summary() {
        let caller = RecordingCaller::new(Err(CallError::Status(ExternalCallFailure {
            operation_name: "Send Friend Request".to_string(),
            url: "http://api.test/api/v1/friends/requests".to_string(),
            status_code: Some(409),
            response_body: None,
        })));
        let response = orchestrator(
            decision(Some("send friend request"), &[("receiverId", "42")]),
            caller,
        )
        .run("add 42", Some("Bearer t"), "u-1")
        .await;

        let expected = "There is already a pending request with this user.";
        assert_eq!(response.error.as_deref(), Some(expected));
        assert_eq!(response.summary_text.as_deref(), Some(expected));
        assert_eq!(response.operation_name.as_deref(), Some("Send Friend Request"));
    }

    #[tokio::test]
    async fn transport_failure_is_generic() {
        let caller = RecordingCaller::new(Err(CallError::Transport {
            operation: "Get User By Username".to_string(),
            url: "http://api.test/api/v1/users/username/jdoe".to_string(),
            message: "connection refused (os error 111)".to_string(),
        }));
        let response = orchestrator(
            decision(Some("Get User By Username"), &[("username", "jdoe")]),
            caller,
        )
        .run("show me jdoe", Some("Bearer t"), "u-1")
        .await;

        assert_eq!(response.failure_kind, Some(FailureKind::TransportFailure));
        let error = response.error.unwrap();
        assert!(error.contains("could not be reached"));
        assert!(!error.contains("os error"));
    }

    #[tokio::test]
    async fn authorization_missing_is_reported() {
        let caller = RecordingCaller::new(Err(CallError::AuthorizationMissing {
            operation: "Get User By Username".to_string(),
        }));
        let response = orchestrator(
            decision(Some("Get User By Username"), &[("username", "jdoe")]),
            caller,
        )
        .run("show me jdoe", None, "anonymous")
        .await;

        assert_eq!(response.failure_kind, Some(FailureKind::AuthorizationMissing));
        assert_eq!(response.initiating_user_id, "anonymous");
    }

    #[tokio::test]
    async fn success_envelope_is_complete() {
        let caller = RecordingCaller::new(ok_body(r#"{"username":"jdoe"}"#));
        let response = orchestrator(
            decision(Some("Get User By Username"), &[("username", "jdoe")]),
            caller,
        )
        .run("show me jdoe", Some("Bearer t"), "u-1")
        .await;

        let mut arguments = BTreeMap::new();
        arguments.insert("username".to_string(), "jdoe".to_string());
        assert_eq!(
            response,
            AgentResponse {
                success: true,
                operation_name: Some("Get User By Username".to_string()),
                requested_url: Some("http://api.test/x".to_string()),
                raw_response_body: Some(r#"{"username":"jdoe"}"#.to_string()),
                summary_text: Some(r#"Fetch a profile: {"username":"jdoe"}"#.to_string()),
                decision_reason: Some("because".to_string()),
                resolved_arguments: Some(arguments),
                initiating_user_id: "u-1".to_string(),
                error: None,
                failure_kind: None,
                upstream_status: None,
            }
        );
    }
}
