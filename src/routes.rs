//! Compiled-in operation table: the only application endpoints the agent may call

use gateway_core::{CatalogError, HttpMethod, Operation, Parameter, RouteCatalog};

fn page() -> Parameter {
    Parameter::query("page", "Zero-based page number for pagination.").optional()
}

fn size() -> Parameter {
    Parameter::query("size", "Number of records per page.").optional()
}

/// Operations exposed to the agent
pub fn builtin_operations() -> Vec<Operation> {
    vec![
        Operation::new(
            "User Statistics",
            "Returns the authenticated user's statistics.",
            HttpMethod::Get,
            "api/v1/users",
        ),
        Operation::new(
            "Get User By Username",
            "Fetches a user's profile information by username.",
            HttpMethod::Get,
            "api/v1/users/username/{username}",
        )
        .with_parameter(Parameter::path("username", "Username to search (e.g., minaaa)."))
        .with_error_template(404, "No user named '{username}' was found."),
        Operation::new(
            "Send Friend Request",
            "Sends a friend request to the specified user.",
            HttpMethod::Post,
            "api/v1/friends/requests",
        )
        .with_parameter(Parameter::body(
            "receiverId",
            "UUID of the user who should receive the request.",
        ))
        .with_parameter(
            Parameter::body("message", "Optional note to include with the request.").optional(),
        )
        .with_error_template(404, "User '{receiverId}' could not be found.")
        .with_error_template(409, "There is already a pending request with this user."),
        Operation::new(
            "Received Friend Requests",
            "Lists pending friend requests received by the user.",
            HttpMethod::Get,
            "api/v1/friends/requests/received",
        )
        .with_parameter(page())
        .with_parameter(size()),
        Operation::new(
            "Sent Friend Requests",
            "Lists pending friend requests created by the user.",
            HttpMethod::Get,
            "api/v1/friends/requests/sent",
        )
        .with_parameter(page())
        .with_parameter(size()),
        Operation::new(
            "Friend Suggestions",
            "Lists suggested profiles using friends of friends.",
            HttpMethod::Get,
            "api/v1/friends/suggestions",
        )
        .with_parameter(page())
        .with_parameter(size()),
        Operation::new(
            "Friend Stats",
            "Returns a summary of total friends and pending requests.",
            HttpMethod::Get,
            "api/v1/friends/stats",
        ),
        Operation::new(
            "Specific User Friends",
            "Lists a specific user's friends if the viewer has permission.",
            HttpMethod::Get,
            "api/v1/friends/user/{userId}",
        )
        .with_parameter(Parameter::path(
            "userId",
            "UUID of the user whose friends will be fetched.",
        ))
        .with_parameter(page())
        .with_parameter(size())
        .with_error_template(403, "You are not allowed to view this user's friends.")
        .with_error_template(404, "User '{userId}' was not found."),
        Operation::new(
            "My Survey Responses",
            "Lists survey responses previously submitted by the authenticated user.",
            HttpMethod::Get,
            "api/v1/survey-responses/my",
        ),
    ]
}

/// Validated catalog of [`builtin_operations`]
pub fn builtin_catalog() -> Result<RouteCatalog, CatalogError> {
    RouteCatalog::new(builtin_operations())
}
