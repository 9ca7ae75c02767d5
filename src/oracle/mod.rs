//! Reasoning oracle access
//!
//! The oracle is an opaque external text-generation service. Everything the
//! gateway needs from it is "send a prompt, get the first text answer back",
//! so the vendor sits behind [`TextGenerator`] and can be swapped or mocked.

mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use thiserror::Error;

/// Oracle call failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// No API key configured
    #[error("reasoning service is not configured (missing API key)")]
    NotConfigured,

    /// Connect/DNS/timeout failure
    #[error("reasoning service request failed: {0}")]
    Transport(String),

    /// Non-2xx answer
    #[error("reasoning service returned HTTP {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Truncated response body (diagnostics only)
        body: String,
    },

    /// Answer without any text part
    #[error("reasoning service returned no text")]
    EmptyResponse,

    /// Answer that is not the expected envelope
    #[error("reasoning service returned an unreadable response: {0}")]
    InvalidResponse(String),
}

/// A text-generation backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Whether a credential is available; callers short-circuit when `false`
    fn is_configured(&self) -> bool;

    /// Send one prompt and return the first candidate's first text part
    async fn generate(&self, prompt: &str) -> Result<String, OracleError>;
}
