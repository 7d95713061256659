use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are unauthenticated and accessible to any client. The
/// page paths listed here must stay in lockstep with the edge router guard's
/// public rule set: a path routed here but not classified public would redirect
/// anonymous visitors to the login page.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated endpoint used for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // --- Session endpoints ---
        // POST /api/auth/login — credential check, token issuance, session cookie.
        .route("/api/auth/login", post(handlers::login))
        // POST /api/auth/register — account creation plus immediate sign-in.
        .route("/api/auth/register", post(handlers::register))
        // POST /api/auth/logout — expires the session cookie unconditionally.
        .route("/api/auth/logout", post(handlers::logout))
        // --- Auth navigation targets ---
        // GET /auth/login?redirect=... — the login redirect destination.
        .route("/auth/login", get(handlers::login_page))
        .route("/auth/register", get(handlers::public_page))
        // GET /unauthorized — authenticated-but-wrong-role destination.
        .route("/unauthorized", get(handlers::unauthorized_page))
        // --- Marketing pages ---
        .route("/", get(handlers::public_page))
        .route("/about", get(handlers::public_page))
        .route("/events", get(handlers::public_page))
        .route("/prayer-times", get(handlers::public_page))
        .route("/library", get(handlers::public_page))
        .route("/contact", get(handlers::public_page))
        .route("/donate", get(handlers::public_page))
}
