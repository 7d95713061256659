use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// API Router Module
///
/// Defines the protected `/api` routes. The edge router guard bypasses `/api/`
/// entirely, so every handler here re-establishes trust through the `AuthUser`
/// extractor; the role-restricted ones additionally gate on `require_role`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // GET /api/auth/me
        // Echoes the verified claim of the presented token.
        .route("/api/auth/me", get(handlers::me))
        // GET /api/users — ADMIN: every account in the portal.
        .route("/api/users", get(handlers::list_users))
        // PUT /api/users/{id}/role — ADMIN: change a stored role. Outstanding
        // tokens keep the role they were signed with.
        .route("/api/users/{id}/role", put(handlers::set_user_role))
        // GET /api/school/students — TEACHER, ADMIN: the student roster.
        .route("/api/school/students", get(handlers::list_students))
}
