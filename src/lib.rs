use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core authentication & authorization gate.
pub mod auth;
pub mod gate;
pub mod session;
pub mod token;

// Application services and components.
pub mod config;
pub mod handlers;
pub mod models;
pub mod repository;

// Module for routing segregation (Public, Portal, API).
pub mod routes;
use routes::{api, portal, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use config::AppConfig;
pub use gate::RouteTable;
pub use repository::{PostgresRepository, Repository, RepositoryState};
pub use token::TokenService;

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the portal's API
/// surface, aggregating every handler decorated with `#[utoipa::path]` and the
/// schemas referenced by their request/response bodies. Served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::register, handlers::logout, handlers::me,
        handlers::list_users, handlers::set_user_role, handlers::list_students
    ),
    components(
        schemas(
            models::User, models::UserProfile, models::Role, models::LoginRequest,
            models::RegisterRequest, models::RoleUpdateRequest, models::AuthResponse,
        )
    ),
    tags(
        (name = "madrasa-portal", description = "Madrasa Portal Auth & School API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all application services
/// and configuration, shared across all incoming requests. Everything here is
/// read-only after startup: in particular the token service (key material derived
/// once from the configured secret) and the route classification table.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: abstracts user-account persistence via the PgPool connection.
    pub repo: RepositoryState,
    /// Token Issuer/Verifier: signs and validates session tokens.
    pub tokens: TokenService,
    /// The static route classification table consulted by the edge router guard.
    pub routes: Arc<RouteTable>,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These implementations allow extractors and handlers to selectively pull
// components from the shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> TokenService {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's entire routing structure, applies the edge router
/// guard and the global middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes: marketing pages, auth navigation targets, session endpoints.
        .merge(public::public_routes())
        // Portal routes: protected navigation, gated by the edge router guard below.
        .merge(portal::portal_routes())
        // API routes: each handler enforces auth itself via the endpoint guard.
        .merge(api::api_routes())
        // Edge Router Guard: intercepts every inbound request before its handler.
        // Classifies the path (bypass / public / auth-required / role-restricted)
        // and redirects or forwards with identity headers accordingly.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::route_guard,
        ))
        // Apply the unified state to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID generation: a unique UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request tracing: wraps the request/response lifecycle in a span
                // correlated by the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Helper used by `TraceLayer` to customize span creation: includes the
/// `x-request-id` header (if present) alongside the HTTP method and URI, so every
/// log line for a single request is correlated by a unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
