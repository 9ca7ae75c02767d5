//! Test doubles shared by the agent unit tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::oracle::{OracleError, TextGenerator};

/// Oracle that replays one canned answer and records every prompt
pub(crate) struct ScriptedOracle {
    configured: bool,
    answer: Result<String, OracleError>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub(crate) fn answering(text: &str) -> Self {
        Self::with(true, Ok(text.to_string()))
    }

    pub(crate) fn failing(error: OracleError) -> Self {
        Self::with(true, Err(error))
    }

    pub(crate) fn unconfigured() -> Self {
        Self::with(false, Err(OracleError::NotConfigured))
    }

    fn with(configured: bool, answer: Result<String, OracleError>) -> Self {
        Self {
            configured,
            answer,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for ScriptedOracle {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answer.clone()
    }
}
