use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Portal Router Module
///
/// Defines the protected navigation routes. None of these handlers checks a
/// credential itself: the edge router guard classifies each path (role-restricted
/// or authenticated-only), performs the verification, and forwards with identity
/// headers injected. The handlers echo that forwarded identity.
///
/// Path ↔ rule alignment:
/// - `/admin` — ADMIN only.
/// - `/school/{student,teacher,parent}` — the matching role, plus ADMIN.
/// - `/donations/history`, `/profile` — any authenticated session (the guard's
///   default for unclassified paths).
pub fn portal_routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(handlers::admin_dashboard))
        .route("/school/student", get(handlers::student_dashboard))
        .route("/school/teacher", get(handlers::teacher_dashboard))
        .route("/school/parent", get(handlers::parent_dashboard))
        .route("/donations/history", get(handlers::donations_history))
        .route("/profile", get(handlers::profile_page))
}
