//! Gateway server implementation

pub mod auth;
pub mod redaction;
mod router;
mod server;

pub use auth::{Principal, ResolvedAuthConfig, auth_middleware};
pub use redaction::{RedactionState, redact_value, redaction_middleware};
pub use router::{AppState, create_router};
pub use server::{Gateway, build_orchestrator};
