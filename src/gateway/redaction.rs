//! Response redaction for agent traffic
//!
//! When an inbound request carries the marker header, JSON responses are
//! rewritten with every configured field removed at any depth. Keys are
//! matched case-insensitively. Non-JSON responses and bodies that fail to
//! parse pass through unchanged.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderMap, HeaderName, Request, header},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::Result;
use crate::config::RedactionConfig;

/// Redaction settings shared with the middleware
#[derive(Debug, Clone)]
pub struct RedactionState {
    enabled: bool,
    marker: HeaderName,
    fields: HashSet<String>,
}

impl RedactionState {
    /// Build from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the marker header name is invalid.
    pub fn from_config(config: &RedactionConfig) -> Result<Self> {
        Ok(Self {
            enabled: config.enabled,
            marker: config.marker_header_name()?,
            fields: config.field_set(),
        })
    }

    /// Marker header that activates redaction
    #[must_use]
    pub fn marker(&self) -> &HeaderName {
        &self.marker
    }

    /// Whether a request with `headers` should have its response redacted
    #[must_use]
    pub fn applies_to(&self, headers: &HeaderMap) -> bool {
        self.enabled
            && !self.fields.is_empty()
            && headers
                .get(&self.marker)
                .is_some_and(|v| !v.as_bytes().trim_ascii().is_empty())
    }
}

/// Remove every object key whose lowercase form is in `fields`, recursing
/// into kept values and array elements
pub fn redact_value(value: &mut Value, fields: &HashSet<String>) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !fields.contains(&key.to_lowercase()));
            for child in map.values_mut() {
                redact_value(child, fields);
            }
        }
        Value::Array(items) => {
            for item in items {
                redact_value(item, fields);
            }
        }
        _ => {}
    }
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let mime = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || mime.ends_with("/json") || mime.ends_with("+json")
}

/// Redaction middleware
pub async fn redaction_middleware(
    State(state): State<Arc<RedactionState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.applies_to(request.headers()) {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    if !is_json_content_type(response.headers()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path, error = %e, "Could not buffer response for redaction");
            parts.headers.remove(header::CONTENT_LENGTH);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let mut value: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            debug!(path = %path, error = %e, "Response is not valid JSON, leaving it unredacted");
            return Response::from_parts(parts, Body::from(bytes));
        }
    };

    redact_value(&mut value, &state.fields);

    match serde_json::to_vec(&value) {
        Ok(redacted) => {
            parts.headers.remove(header::CONTENT_LENGTH);
            debug!(
                path = %path,
                before = bytes.len(),
                after = redacted.len(),
                "Redacted agent response"
            );
            Response::from_parts(parts, Body::from(redacted))
        }
        Err(e) => {
            warn!(path = %path, error = %e, "Could not re-serialize redacted response");
            Response::from_parts(parts, Body::from(bytes))
        }
    }
}
