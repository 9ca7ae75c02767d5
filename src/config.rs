//! Configuration management

use std::{collections::HashSet, env, path::Path, time::Duration};

use axum::http::HeaderName;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before processing config.
    /// Paths support ~ expansion. Loaded in order, later files override earlier.
    pub env_files: Vec<String>,
    /// Server configuration
    pub server: ServerConfig,
    /// Inbound authentication
    pub auth: AuthConfig,
    /// Application API the agent calls into
    pub agent: AgentConfig,
    /// Reasoning oracle
    pub oracle: OracleConfig,
    /// Response redaction
    pub redaction: RedactionConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Graceful shutdown timeout
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 39500,
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Inbound authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Require a signed bearer token on non-public paths
    pub enabled: bool,

    /// Base64-encoded HS256 secret shared with the token issuer.
    /// Supports: literal value or `env:VAR_NAME`
    pub jwt_secret: Option<String>,

    /// Paths that bypass authentication (default: `["/health"]`)
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

fn default_public_paths() -> Vec<String> {
    vec!["/health".to_string()]
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            jwt_secret: None,
            public_paths: default_public_paths(),
        }
    }
}

impl AuthConfig {
    /// Resolve the JWT secret (expand `env:` references)
    #[must_use]
    pub fn resolve_jwt_secret(&self) -> Option<String> {
        self.jwt_secret.as_deref().and_then(resolve_secret)
    }
}

/// Application API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Base URL relative operation paths are joined to
    pub api_base_url: String,
    /// Connect timeout for application calls
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Total timeout for application calls
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Send the redaction marker header on outbound application calls
    pub mark_outbound_requests: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(8),
            mark_outbound_requests: true,
        }
    }
}

/// Reasoning oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// API base URL (`{base_url}/models/{model}:generateContent`)
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// API key. Supports: literal value or `env:VAR_NAME`
    pub api_key: String,
    /// Connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Total timeout per oracle call
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: "env:GEMINI_API_KEY".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(8),
        }
    }
}

impl OracleConfig {
    /// Resolve the API key; `None` when unset or blank
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret(&self.api_key)
    }
}

/// Response redaction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    /// Enable redaction of agent-originated responses
    pub enabled: bool,
    /// Inbound header whose non-blank value marks a request as agent-originated
    pub marker_header: String,
    /// Field names removed from JSON responses (case-insensitive)
    pub redacted_fields: Vec<String>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            marker_header: "X-Agent-Request".to_string(),
            redacted_fields: [
                "createdAt",
                "userId",
                "created at",
                "email",
                "emailVerified",
                "receiverId",
                "requestId",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
        }
    }
}

impl RedactionConfig {
    /// Lower-cased field set used for matching
    #[must_use]
    pub fn field_set(&self) -> HashSet<String> {
        self.redacted_fields
            .iter()
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect()
    }

    /// Parsed marker header name
    pub fn marker_header_name(&self) -> Result<HeaderName> {
        HeaderName::from_bytes(self.marker_header.trim().as_bytes()).map_err(|e| {
            Error::Config(format!(
                "Invalid redaction marker header '{}': {e}",
                self.marker_header
            ))
        })
    }
}

/// Resolve a secret reference: `env:VAR` reads the variable, anything else is
/// taken literally. Blank results and unset variables yield `None`.
fn resolve_secret(value: &str) -> Option<String> {
    let resolved = match value.strip_prefix("env:") {
        Some(var_name) => env::var(var_name).ok()?,
        None => value.to_string(),
    };
    let resolved = resolved.trim();
    (!resolved.is_empty()).then(|| resolved.to_string())
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist, cannot be parsed,
    /// or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        // Load from file if provided
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (AGENT_GATEWAY_ prefix)
        figment = figment.merge(Env::prefixed("AGENT_GATEWAY_").split("__"));

        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        // Load env files into process environment (before env var expansion)
        config.load_env_files();

        // Expand ${VAR} in URLs
        config.expand_env_vars()?;

        config.validate()?;

        Ok(config)
    }

    /// Check values that would otherwise fail at request time
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        for (label, raw) in [
            ("agent.api_base_url", &self.agent.api_base_url),
            ("oracle.base_url", &self.oracle.base_url),
        ] {
            let url = Url::parse(raw)
                .map_err(|e| Error::Config(format!("Invalid {label} '{raw}': {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::Config(format!(
                    "{label} must use http or https, got '{}'",
                    url.scheme()
                )));
            }
        }

        if self.oracle.model.trim().is_empty() {
            return Err(Error::Config("oracle.model must not be blank".to_string()));
        }

        self.redaction.marker_header_name()?;

        if self.auth.enabled && self.auth.resolve_jwt_secret().is_none() {
            return Err(Error::Config(
                "auth.enabled requires auth.jwt_secret".to_string(),
            ));
        }

        Ok(())
    }

    /// Load environment files into the process environment.
    /// Supports ~ expansion. Files that don't exist are silently skipped.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let expanded = if path_str.starts_with('~') {
                if let Some(home) = dirs::home_dir() {
                    path_str.replacen('~', &home.display().to_string(), 1)
                } else {
                    path_str.clone()
                }
            } else {
                path_str.clone()
            };

            let path = Path::new(&expanded);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => {
                        tracing::info!("Loaded env file: {expanded}");
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load env file {expanded}: {e}");
                    }
                }
            } else {
                tracing::debug!("Env file not found (skipped): {expanded}");
            }
        }
    }

    /// Expand ${VAR} and ${VAR:-default} patterns in URL values
    fn expand_env_vars(&mut self) -> Result<()> {
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
            .map_err(|e| Error::Internal(e.to_string()))?;

        self.agent.api_base_url = Self::expand_string(&re, &self.agent.api_base_url);
        self.oracle.base_url = Self::expand_string(&re, &self.oracle.base_url);
        Ok(())
    }

    /// Expand environment variables in a string
    fn expand_string(re: &Regex, value: &str) -> String {
        re.replace_all(value, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default = caps.get(2).map_or("", |m| m.as_str());
            env::var(var_name).unwrap_or_else(|_| default.to_string())
        })
        .into_owned()
    }
}
