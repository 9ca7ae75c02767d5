//! Error translator: upstream failures to user-safe text

use std::collections::BTreeMap;

use gateway_core::Operation;

use super::ExternalCallFailure;

/// Rendered failure message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Text shown to the caller
    pub message: String,
    /// `true` when it came from one of the operation's error templates
    pub templated: bool,
}

/// Translate `failure` using `operation`'s error templates.
///
/// Without a template for the status, a 404 carrying a `username` argument
/// gets a dedicated message; everything else gets a generic one.
#[must_use]
pub fn translate(
    operation: &Operation,
    failure: &ExternalCallFailure,
    arguments: &BTreeMap<String, String>,
) -> Translation {
    if let Some(template) = failure
        .status_code
        .and_then(|status| operation.error_templates.get(&status))
    {
        return Translation {
            message: render(template, arguments),
            templated: true,
        };
    }

    let username = arguments
        .get("username")
        .map(|u| u.trim())
        .filter(|u| !u.is_empty());
    let message = match (failure.status_code, username) {
        (Some(404), Some(username)) => format!("No user named '{username}' was found."),
        (Some(status), _) => format!("`{}` call failed: HTTP {status}", operation.name),
        (None, _) => format!("`{}` call failed: HTTP ?", operation.name),
    };

    Translation {
        message,
        templated: false,
    }
}

/// Replace every `{name}` with its argument; unknown placeholders stay as-is
fn render(template: &str, arguments: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + len];
        out.push_str(&rest[..start]);
        match arguments.get(name) {
            Some(value) => out.push_str(value.trim()),
            None => out.push_str(&rest[start..=start + len]),
        }
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::{HttpMethod, Parameter};
    use pretty_assertions::assert_eq;

    fn failure(status: Option<u16>) -> ExternalCallFailure {
        ExternalCallFailure {
            operation_name: "op".to_string(),
            url: "http://api.test/x".to_string(),
            status_code: status,
            response_body: None,
        }
    }

    fn args(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn send_request_op() -> Operation {
        Operation::new(
            "Send Friend Request",
            "send",
            HttpMethod::Post,
            "api/v1/friends/requests",
        )
        .with_parameter(Parameter::body("receiverId", "receiver"))
        .with_error_template(404, "User '{receiverId}' could not be found.")
        .with_error_template(409, "There is already a pending request with this user.")
    }

    #[test]
    fn template_for_status_is_rendered() {
        let t = translate(&send_request_op(), &failure(Some(404)), &args(&[("receiverId", "42")]));
        assert_eq!(
            t,
            Translation {
                message: "User '42' could not be found.".to_string(),
                templated: true
            }
        );

        let t = translate(&send_request_op(), &failure(Some(409)), &BTreeMap::new());
        assert_eq!(t.message, "There is already a pending request with this user.");
        assert!(t.templated);
    }

    #[test]
    fn unknown_placeholder_left_untouched() {
        let t = translate(&send_request_op(), &failure(Some(404)), &BTreeMap::new());
        assert_eq!(t.message, "User '{receiverId}' could not be found.");
    }

    #[test]
    fn username_404_fallback() {
        let op = Operation::new("Lookup", "d", HttpMethod::Get, "api/v1/users/{username}")
            .with_parameter(Parameter::path("username", "u"));
        let t = translate(&op, &failure(Some(404)), &args(&[("username", "jdoe")]));
        assert_eq!(t.message, "No user named 'jdoe' was found.");
        assert!(!t.templated);
    }

    #[test]
    fn generic_fallback() {
        let t = translate(&send_request_op(), &failure(Some(500)), &BTreeMap::new());
        assert_eq!(t.message, "`Send Friend Request` call failed: HTTP 500");

        let t = translate(&send_request_op(), &failure(None), &BTreeMap::new());
        assert_eq!(t.message, "`Send Friend Request` call failed: HTTP ?");
    }

    #[test]
    fn render_handles_unbalanced_braces() {
        assert_eq!(render("a {x} b {", &args(&[("x", "1")])), "a 1 b {");
        assert_eq!(render("no placeholders", &BTreeMap::new()), "no placeholders");
    }
}
