//! Operation and parameter definitions

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// HTTP methods an operation may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Canonical upper-case method name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a resolved argument ends up in the outgoing request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParameterLocation {
    /// Substituted into the path template at `{name}`
    #[default]
    Path,
    /// Appended as `name=value` to the query string
    Query,
    /// Added as a field of the JSON request body
    Body,
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Path => "PATH",
            Self::Query => "QUERY",
            Self::Body => "BODY",
        })
    }
}

/// A declared operation parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    /// Parameter name (argument key and placeholder name)
    pub name: String,
    /// Description shown to the oracle
    pub description: String,
    /// Whether resolution fails when the argument is absent
    pub required: bool,
    /// Request location
    pub location: ParameterLocation,
}

impl Parameter {
    /// Required path parameter
    pub fn path(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ParameterLocation::Path)
    }

    /// Required query parameter
    pub fn query(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ParameterLocation::Query)
    }

    /// Required body parameter
    pub fn body(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ParameterLocation::Body)
    }

    fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        location: ParameterLocation,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
            location,
        }
    }

    /// Mark the parameter as optional
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// A single allow-listed application call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Unique name (case-insensitive key)
    pub name: String,
    /// Description shown to the oracle and the answer synthesizer
    pub description: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Relative path with `{param}` placeholders
    pub path_template: String,
    /// Declared parameters, in resolution order
    pub parameters: Vec<Parameter>,
    /// Whether the caller's credential must be forwarded
    pub requires_auth: bool,
    /// Status code to user-facing message template
    pub error_templates: BTreeMap<u16, String>,
}

impl Operation {
    /// Create an authenticated operation without parameters
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        method: HttpMethod,
        path_template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            method,
            path_template: path_template.into(),
            parameters: Vec::new(),
            requires_auth: true,
            error_templates: BTreeMap::new(),
        }
    }

    /// Append a parameter
    #[must_use]
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Register a message template for an HTTP status
    #[must_use]
    pub fn with_error_template(mut self, status: u16, template: impl Into<String>) -> Self {
        self.error_templates.insert(status, template.into());
        self
    }

    /// Allow the operation to run without a caller credential
    #[must_use]
    pub fn public(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    /// Look up a declared parameter by name
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Extract `{name}` placeholder names from a template, in order of appearance.
///
/// Empty braces (`{}`) are not placeholders.
#[must_use]
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(0) => rest = &after[1..],
            Some(end) => {
                found.push(&after[..end]);
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    found
}
