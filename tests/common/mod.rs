//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agent_gateway::agent::{
    AgentOrchestrator, ApiCaller, HttpApiCaller, OracleAnswerSynthesizer, OracleIntentResolver,
};
use agent_gateway::config::{AgentConfig, AuthConfig, RedactionConfig};
use agent_gateway::gateway::{AppState, RedactionState, ResolvedAuthConfig, create_router};
use agent_gateway::oracle::{OracleError, TextGenerator};
use async_trait::async_trait;
use axum::Router;
use axum::http::HeaderName;
use gateway_core::RouteCatalog;
use tokio::net::TcpListener;

/// Oracle that replays answers in order, repeating the last one
pub struct SequenceOracle {
    answers: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl SequenceOracle {
    pub fn new(answers: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.iter().map(|a| (*a).to_string()).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for SequenceOracle {
    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(&self, _prompt: &str) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut answers = self.answers.lock().unwrap();
        let answer = if answers.len() > 1 {
            answers.pop_front()
        } else {
            answers.front().cloned()
        };
        answer.ok_or(OracleError::EmptyResponse)
    }
}

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// HTTP caller against `base_url` that marks requests with `X-Agent-Request`
pub fn http_caller(base_url: &str) -> Arc<dyn ApiCaller> {
    let config = AgentConfig {
        api_base_url: base_url.to_string(),
        connect_timeout: Duration::from_secs(1),
        request_timeout: Duration::from_secs(2),
        mark_outbound_requests: true,
    };
    Arc::new(
        HttpApiCaller::new(&config, Some(HeaderName::from_static("x-agent-request"))).unwrap(),
    )
}

/// Orchestrator with oracle-backed intent and synthesis
pub fn orchestrator(
    catalog: RouteCatalog,
    oracle: Arc<dyn TextGenerator>,
    caller: Arc<dyn ApiCaller>,
) -> AgentOrchestrator {
    AgentOrchestrator::new(
        Arc::new(catalog),
        Arc::new(OracleIntentResolver::new(Arc::clone(&oracle))),
        caller,
        Arc::new(OracleAnswerSynthesizer::new(oracle)),
    )
}

/// Fully layered gateway router
pub fn gateway_router(orchestrator: AgentOrchestrator, auth: &AuthConfig) -> Router {
    let state = Arc::new(AppState {
        orchestrator,
        auth_config: Arc::new(ResolvedAuthConfig::from_config(auth).unwrap()),
        redaction: Arc::new(RedactionState::from_config(&RedactionConfig::default()).unwrap()),
        request_timeout: Duration::from_secs(10),
        max_body_size: 64 * 1024,
    });
    create_router(state)
}
