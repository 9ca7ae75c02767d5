//! Agent Gateway Library
//!
//! Natural-language front door for the application REST API. A prompt goes
//! to a reasoning oracle that picks one operation from a compiled-in
//! allow-list; the gateway binds the extracted arguments, calls the API with
//! the caller's own credential and turns the outcome into a uniform
//! envelope.
//!
//! # Features
//!
//! - **Allow-list**: the oracle can only ever reach [`routes::builtin_catalog`]
//! - **Safe binding**: untrusted arguments are encoded per parameter location
//! - **Error translation**: upstream failures become user-safe text
//! - **Redaction**: JSON responses to marked agent requests lose sensitive fields
//! - **Production Ready**: JWT auth, health check, request ids, graceful shutdown

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod oracle;
pub mod routes;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber
                .with(fmt::layer().json())
                .try_init()
                .map_err(|e| Error::Internal(e.to_string()))?;
        }
        _ => {
            subscriber
                .with(fmt::layer())
                .try_init()
                .map_err(|e| Error::Internal(e.to_string()))?;
        }
    }

    Ok(())
}
