//! Authentication middleware
//!
//! Validates `Authorization: Bearer <jwt>` (HS256, base64-encoded shared
//! secret) on non-public paths and injects the caller's [`Principal`]. The
//! raw header stays on the request so handlers can forward it downstream.

use std::fmt;
use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::{Error, Result};

/// User id reported when authentication is disabled or skipped
pub const ANONYMOUS: &str = "anonymous";

/// The authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Token subject
    pub user_id: String,
}

impl Principal {
    fn anonymous() -> Self {
        Self {
            user_id: ANONYMOUS.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

/// Resolved authentication configuration (secret decoded)
pub struct ResolvedAuthConfig {
    /// Whether auth is enabled
    pub enabled: bool,
    /// Public paths
    pub public_paths: Vec<String>,
    key: Option<DecodingKey>,
    validation: Validation,
}

impl fmt::Debug for ResolvedAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedAuthConfig")
            .field("enabled", &self.enabled)
            .field("public_paths", &self.public_paths)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl ResolvedAuthConfig {
    /// Create resolved config from `AuthConfig`
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when auth is enabled and the secret is
    /// missing or not valid base64.
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let key = match config.resolve_jwt_secret() {
            Some(secret) => {
                let bytes = STANDARD.decode(secret.trim()).map_err(|e| {
                    Error::Config(format!("auth.jwt_secret is not valid base64: {e}"))
                })?;
                Some(DecodingKey::from_secret(&bytes))
            }
            None if config.enabled => {
                return Err(Error::Config(
                    "auth.enabled requires auth.jwt_secret".to_string(),
                ));
            }
            None => None,
        };

        Ok(Self {
            enabled: config.enabled,
            public_paths: config.public_paths.clone(),
            key,
            validation: Validation::new(Algorithm::HS256),
        })
    }

    /// Check if a path is public (bypasses auth)
    #[must_use]
    pub fn is_public_path(&self, path: &str) -> bool {
        // Whole segments only: `/health` covers `/health/live` but not `/healthz`
        self.public_paths.iter().any(|p| {
            let p = p.trim_end_matches('/');
            path == p || path.strip_prefix(p).is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Validate a token and return its principal if valid
    #[must_use]
    pub fn validate_token(&self, token: &str) -> Option<Principal> {
        let key = self.key.as_ref()?;
        match jsonwebtoken::decode::<Claims>(token, key, &self.validation) {
            Ok(data) if !data.claims.sub.trim().is_empty() => Some(Principal {
                user_id: data.claims.sub,
            }),
            Ok(_) => {
                debug!("Token has a blank subject");
                None
            }
            Err(e) => {
                debug!(error = %e, "Token rejected");
                None
            }
        }
    }
}

/// Extract the token from a raw `Authorization` value
#[must_use]
pub fn bearer_token(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authentication middleware
pub async fn auth_middleware(
    State(auth_config): State<Arc<ResolvedAuthConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if !auth_config.enabled {
        request.extensions_mut().insert(Principal::anonymous());
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();

    if auth_config.is_public_path(&path) {
        debug!(path = %path, "Public path, skipping auth");
        request.extensions_mut().insert(Principal::anonymous());
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token);

    let Some(token) = token else {
        warn!(path = %path, "Missing Authorization header");
        return unauthorized_response(
            "Missing Authorization header. Use: Authorization: Bearer <token>",
        );
    };

    if let Some(principal) = auth_config.validate_token(token) {
        debug!(user = %principal.user_id, path = %path, "Authenticated request");
        request.extensions_mut().insert(principal);
        next.run(request).await
    } else {
        warn!(path = %path, "Invalid token");
        unauthorized_response("Invalid token")
    }
}

/// Create a 401 Unauthorized response
fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        Json(json!({ "error": message })),
    )
        .into_response()
}
