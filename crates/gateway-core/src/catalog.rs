//! Validated, immutable route catalog

use std::collections::HashSet;

use thiserror::Error;

use crate::operation::{Operation, ParameterLocation, placeholders};

/// Catalog construction errors. These are programming errors in the
/// compiled-in table and must stop the process at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Operation name is empty or whitespace
    #[error("Operation name must not be blank")]
    BlankName,

    /// Two operations share a name (case-insensitive)
    #[error("Duplicate operation name: {0}")]
    DuplicateName(String),

    /// A parameter name is declared twice on one operation
    #[error("`{operation}` declares parameter `{parameter}` more than once")]
    DuplicateParameter {
        /// Operation name
        operation: String,
        /// Parameter name
        parameter: String,
    },

    /// A path placeholder has no matching PATH parameter
    #[error("`{operation}` path placeholder `{placeholder}` has no declared PATH parameter")]
    UndeclaredPathPlaceholder {
        /// Operation name
        operation: String,
        /// Placeholder name
        placeholder: String,
    },

    /// An error-template placeholder has no matching parameter
    #[error("`{operation}` error template for HTTP {status} uses undeclared placeholder `{placeholder}`")]
    UndeclaredTemplatePlaceholder {
        /// Operation name
        operation: String,
        /// HTTP status of the template
        status: u16,
        /// Placeholder name
        placeholder: String,
    },

    /// Path template starts with a placeholder
    #[error("`{0}` path template must not begin with a placeholder")]
    LeadingPlaceholder(String),
}

/// The allow-list of callable operations.
///
/// Built once, never mutated. Lookups are case-insensitive exact matches.
#[derive(Debug, Clone, Default)]
pub struct RouteCatalog {
    operations: Vec<Operation>,
}

impl RouteCatalog {
    /// Build a catalog, validating every operation
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] found.
    pub fn new(operations: Vec<Operation>) -> Result<Self, CatalogError> {
        let mut names = HashSet::new();
        for operation in &operations {
            validate_operation(operation)?;
            if !names.insert(operation.name.trim().to_lowercase()) {
                return Err(CatalogError::DuplicateName(operation.name.clone()));
            }
        }
        Ok(Self { operations })
    }

    /// All operations, in declaration order
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Find an operation by name (case-insensitive, surrounding whitespace ignored)
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Operation> {
        let name = name.trim();
        self.operations
            .iter()
            .find(|op| op.name.eq_ignore_ascii_case(name))
    }

    /// Number of operations
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the catalog has no operations
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

fn validate_operation(operation: &Operation) -> Result<(), CatalogError> {
    if operation.name.trim().is_empty() {
        return Err(CatalogError::BlankName);
    }

    let mut declared = HashSet::new();
    for parameter in &operation.parameters {
        if !declared.insert(parameter.name.as_str()) {
            return Err(CatalogError::DuplicateParameter {
                operation: operation.name.clone(),
                parameter: parameter.name.clone(),
            });
        }
    }

    if operation.path_template.trim_start().starts_with('{') {
        return Err(CatalogError::LeadingPlaceholder(operation.name.clone()));
    }

    for placeholder in placeholders(&operation.path_template) {
        let is_path_param = operation
            .parameter(placeholder)
            .is_some_and(|p| p.location == ParameterLocation::Path);
        if !is_path_param {
            return Err(CatalogError::UndeclaredPathPlaceholder {
                operation: operation.name.clone(),
                placeholder: placeholder.to_string(),
            });
        }
    }

    for (status, template) in &operation.error_templates {
        for placeholder in placeholders(template) {
            if operation.parameter(placeholder).is_none() {
                return Err(CatalogError::UndeclaredTemplatePlaceholder {
                    operation: operation.name.clone(),
                    status: *status,
                    placeholder: placeholder.to_string(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{HttpMethod, Parameter};

    fn user_by_username() -> Operation {
        Operation::new(
            "Get User By Username",
            "Fetches a profile",
            HttpMethod::Get,
            "api/v1/users/username/{username}",
        )
        .with_parameter(Parameter::path("username", "Username"))
        .with_error_template(404, "No user named '{username}' was found.")
    }

    #[test]
    fn find_by_name_is_case_insensitive() {
        let catalog = RouteCatalog::new(vec![user_by_username()]).unwrap();

        assert!(catalog.find_by_name("get user by username").is_some());
        assert!(catalog.find_by_name("  GET USER BY USERNAME ").is_some());
        assert!(catalog.find_by_name("Get User").is_none());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut other = user_by_username();
        other.name = "GET USER BY USERNAME".to_string();

        let err = RouteCatalog::new(vec![user_by_username(), other]).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateName("GET USER BY USERNAME".to_string()));
    }

    #[test]
    fn rejects_undeclared_path_placeholder() {
        let op = Operation::new("Broken", "x", HttpMethod::Get, "api/v1/users/{userId}");

        let err = RouteCatalog::new(vec![op]).unwrap_err();
        assert!(matches!(err, CatalogError::UndeclaredPathPlaceholder { .. }));
    }

    #[test]
    fn rejects_path_placeholder_bound_to_query_parameter() {
        let op = Operation::new("Broken", "x", HttpMethod::Get, "api/v1/users/{userId}")
            .with_parameter(Parameter::query("userId", "id"));

        let err = RouteCatalog::new(vec![op]).unwrap_err();
        assert!(matches!(err, CatalogError::UndeclaredPathPlaceholder { .. }));
    }

    #[test]
    fn rejects_undeclared_template_placeholder() {
        let op = user_by_username().with_error_template(409, "Conflict for {receiverId}");

        let err = RouteCatalog::new(vec![op]).unwrap_err();
        assert_eq!(
            err,
            CatalogError::UndeclaredTemplatePlaceholder {
                operation: "Get User By Username".to_string(),
                status: 409,
                placeholder: "receiverId".to_string(),
            }
        );
    }

    #[test]
    fn rejects_leading_placeholder() {
        let op = Operation::new("Open", "x", HttpMethod::Get, "{target}/users")
            .with_parameter(Parameter::path("target", "host"));

        let err = RouteCatalog::new(vec![op]).unwrap_err();
        assert_eq!(err, CatalogError::LeadingPlaceholder("Open".to_string()));
    }

    #[test]
    fn rejects_blank_name_and_duplicate_parameter() {
        let blank = Operation::new("  ", "x", HttpMethod::Get, "api");
        assert_eq!(RouteCatalog::new(vec![blank]).unwrap_err(), CatalogError::BlankName);

        let dup = Operation::new("Dup", "x", HttpMethod::Get, "api")
            .with_parameter(Parameter::query("page", "p"))
            .with_parameter(Parameter::body("page", "p"));
        assert!(matches!(
            RouteCatalog::new(vec![dup]).unwrap_err(),
            CatalogError::DuplicateParameter { .. }
        ));
    }

    #[test]
    fn empty_catalog_is_valid() {
        let catalog = RouteCatalog::new(Vec::new()).unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.find_by_name("anything").is_none());
    }
}
