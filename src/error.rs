//! Error types for the agent gateway

use std::io;

use thiserror::Error;

/// Result type alias for the agent gateway
pub type Result<T> = std::result::Result<T, Error>;

/// Agent gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Route catalog failed startup validation
    #[error("Route catalog error: {0}")]
    Catalog(#[from] gateway_core::CatalogError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
