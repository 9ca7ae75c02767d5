//! Request resolution: binding untrusted arguments into an operation.
//!
//! Every argument value reaching [`resolve`] comes from oracle output and is
//! treated as attacker-controlled. Values only ever land in the slot their
//! declared [`ParameterLocation`] allows, and each slot has its own encoding:
//!
//! - PATH values are percent-encoded (only RFC 3986 unreserved characters
//!   survive), so they cannot add segments, queries or fragments
//! - QUERY values are percent-encoded and appended as `name=value`
//! - BODY values are JSON-encoded string fields

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

use crate::operation::{Operation, ParameterLocation, placeholders};

/// A concrete request ready for execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    /// Substituted path, including the query string when present
    pub path: String,
    /// JSON object built from BODY arguments, `None` when there are none
    pub body: Option<String>,
}

/// Resolution failures (caller-input problems, surfaced verbatim)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// A required argument is absent or blank
    #[error("`{operation}` requires parameter `{parameter}`.")]
    MissingParameter {
        /// Operation name
        operation: String,
        /// Parameter name
        parameter: String,
    },

    /// A placeholder survived substitution
    #[error("`{operation}` could not be resolved because `{placeholder}` was missing.")]
    UnresolvedPlaceholder {
        /// Operation name
        operation: String,
        /// Placeholder name
        placeholder: String,
    },

    /// A path value would navigate the URL (`.` or `..`)
    #[error("`{operation}` received an invalid value for path parameter `{parameter}`.")]
    InvalidPathValue {
        /// Operation name
        operation: String,
        /// Parameter name
        parameter: String,
    },

    /// The JSON body could not be produced
    #[error("Request body for `{operation}` could not be created: {message}")]
    BodyEncoding {
        /// Operation name
        operation: String,
        /// Serializer message
        message: String,
    },
}

/// Bind `arguments` into `operation`.
///
/// Arguments without a declared parameter are ignored. Blank values count as
/// absent.
///
/// # Errors
///
/// See [`ResolutionError`].
pub fn resolve(
    operation: &Operation,
    arguments: &BTreeMap<String, String>,
) -> Result<ResolvedRequest, ResolutionError> {
    let mut path = operation.path_template.clone();
    let mut query: Vec<(&str, &str)> = Vec::new();
    let mut body: Vec<(&str, &str)> = Vec::new();

    for parameter in &operation.parameters {
        let value = arguments
            .get(&parameter.name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty());

        if value.is_none() && parameter.required {
            return Err(ResolutionError::MissingParameter {
                operation: operation.name.clone(),
                parameter: parameter.name.clone(),
            });
        }

        match parameter.location {
            ParameterLocation::Path => {
                let value = value.unwrap_or_default();
                if value == "." || value == ".." {
                    return Err(ResolutionError::InvalidPathValue {
                        operation: operation.name.clone(),
                        parameter: parameter.name.clone(),
                    });
                }
                let placeholder = format!("{{{}}}", parameter.name);
                path = path.replace(&placeholder, &urlencoding::encode(value));
            }
            ParameterLocation::Query => {
                if let Some(value) = value {
                    query.push((parameter.name.as_str(), value));
                }
            }
            ParameterLocation::Body => {
                if let Some(value) = value {
                    body.push((parameter.name.as_str(), value));
                }
            }
        }
    }

    if let Some(leftover) = placeholders(&path).first() {
        return Err(ResolutionError::UnresolvedPlaceholder {
            operation: operation.name.clone(),
            placeholder: (*leftover).to_string(),
        });
    }

    if !query.is_empty() {
        let query_string = query
            .iter()
            .map(|(key, value)| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&");
        let separator = if path.contains('?') { '&' } else { '?' };
        path = format!("{path}{separator}{query_string}");
    }

    let body = if body.is_empty() {
        None
    } else {
        let json = serde_json::to_string(&OrderedBody(&body)).map_err(|e| {
            ResolutionError::BodyEncoding {
                operation: operation.name.clone(),
                message: e.to_string(),
            }
        })?;
        Some(json)
    };

    Ok(ResolvedRequest { path, body })
}

/// Serializes body fields as a JSON object in declaration order
struct OrderedBody<'a>(&'a [(&'a str, &'a str)]);

impl Serialize for OrderedBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
