//! Call executor: performs a resolved request against the application API

use std::fmt;

use async_trait::async_trait;
use axum::http::HeaderName;
use gateway_core::{HttpMethod, Operation, ResolvedRequest};
use reqwest::{Client, Method, header};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AgentConfig;

/// Successful (2xx) application call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSuccess {
    /// Operation that was called
    pub operation_name: String,
    /// Final URL
    pub url: String,
    /// Response body as text
    pub body: String,
}

/// An application call that produced an error status or no response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCallFailure {
    /// Operation that was called
    pub operation_name: String,
    /// Final URL
    pub url: String,
    /// HTTP status, `None` when no response was received
    pub status_code: Option<u16>,
    /// Response body, when one was received
    pub response_body: Option<String>,
}

/// Why an application call did not succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// Operation needs a credential and none was supplied
    #[error("`{operation}` requires an authenticated caller")]
    AuthorizationMissing {
        /// Operation name
        operation: String,
    },

    /// Connect, DNS or timeout failure
    #[error("`{operation}` could not reach {url}: {message}")]
    Transport {
        /// Operation name
        operation: String,
        /// Target URL
        url: String,
        /// Client error text
        message: String,
    },

    /// 4xx/5xx answer
    #[error("`{}` returned HTTP {}", .0.operation_name, .0.status_code.unwrap_or_default())]
    Status(ExternalCallFailure),
}

/// Something that can execute a resolved operation
#[async_trait]
pub trait ApiCaller: Send + Sync {
    /// Execute `resolved` for `operation`, forwarding `credential` verbatim
    /// as the `Authorization` header
    async fn call(
        &self,
        operation: &Operation,
        resolved: &ResolvedRequest,
        credential: Option<&str>,
    ) -> Result<ApiSuccess, CallError>;
}

/// [`ApiCaller`] over `reqwest`
#[derive(Clone)]
pub struct HttpApiCaller {
    client: Client,
    base_url: String,
    marker_header: Option<HeaderName>,
}

impl fmt::Debug for HttpApiCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpApiCaller")
            .field("base_url", &self.base_url)
            .field("marker_header", &self.marker_header)
            .finish_non_exhaustive()
    }
}

impl HttpApiCaller {
    /// Create a caller. `marker_header` is attached (value `1`) to every
    /// outbound request when set.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &AgentConfig, marker_header: Option<HeaderName>) -> crate::Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            marker_header,
        })
    }

    /// Absolute URL for a resolved path
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        let has_scheme = |scheme: &str| {
            path.get(..scheme.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
        };
        if has_scheme("http://") || has_scheme("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl ApiCaller for HttpApiCaller {
    async fn call(
        &self,
        operation: &Operation,
        resolved: &ResolvedRequest,
        credential: Option<&str>,
    ) -> Result<ApiSuccess, CallError> {
        let credential = credential.filter(|c| !c.trim().is_empty());
        if operation.requires_auth && credential.is_none() {
            return Err(CallError::AuthorizationMissing {
                operation: operation.name.clone(),
            });
        }

        let url = self.url_for(&resolved.path);
        let mut request = self
            .client
            .request(reqwest_method(operation.method), &url)
            .header(header::ACCEPT, "application/json");

        if let Some(credential) = credential.filter(|_| operation.requires_auth) {
            request = request.header(header::AUTHORIZATION, credential);
        }
        if let Some(marker) = &self.marker_header {
            request = request.header(marker.clone(), "1");
        }
        if let Some(body) = &resolved.body {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        debug!(
            operation = %operation.name,
            method = %operation.method,
            url = %url,
            "Calling application API"
        );

        let response = request.send().await.map_err(|e| {
            warn!(
                operation = %operation.name,
                url = %url,
                error = %e,
                "Application API call failed"
            );
            CallError::Transport {
                operation: operation.name.clone(),
                url: url.clone(),
                message: e.without_url().to_string(),
            }
        })?;

        let status = response.status();
        let body = response.text().await;

        if status.is_success() {
            let body = body.map_err(|e| CallError::Transport {
                operation: operation.name.clone(),
                url: url.clone(),
                message: e.without_url().to_string(),
            })?;
            debug!(
                operation = %operation.name,
                status = status.as_u16(),
                bytes = body.len(),
                "Application API call succeeded"
            );
            return Ok(ApiSuccess {
                operation_name: operation.name.clone(),
                url,
                body,
            });
        }

        Err(CallError::Status(ExternalCallFailure {
            operation_name: operation.name.clone(),
            url,
            status_code: Some(status.as_u16()),
            response_body: body.ok(),
        }))
    }
}
