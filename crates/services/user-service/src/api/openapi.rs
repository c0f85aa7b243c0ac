//! OpenAPI documentation.

use utoipa::OpenApi;

use domain::{CreateUserRequest, UpdateUserRequest, User};

/// API documentation struct.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::health_handler::healthcheck,
        crate::api::handlers::user_handler::create_user,
        crate::api::handlers::user_handler::list_users,
        crate::api::handlers::user_handler::get_user,
        crate::api::handlers::user_handler::update_user,
        crate::api::handlers::user_handler::delete_user,
    ),
    components(
        schemas(
            User,
            CreateUserRequest,
            UpdateUserRequest,
        )
    ),
    tags(
        (name = "Users", description = "User management endpoints"),
        (name = "Health", description = "Liveness probe"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_user_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/users"));
        assert!(doc.paths.paths.contains_key("/api/v1/users/{id}"));
        assert!(doc.paths.paths.contains_key("/healthcheck"));
    }
}
