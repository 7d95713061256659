/// Router Module Index
///
/// Organizes the application's routing into modules that map onto the two guard
/// layers. Navigation (page) routes are gated centrally by the edge router guard;
/// API routes bypass that guard and enforce authentication per handler through the
/// endpoint guard. The split keeps each route's protection mechanism visible at the
/// module level.

/// Routes accessible to any client: health check, the marketing pages, the auth
/// navigation targets, and the session endpoints (login/register/logout).
pub mod public;

/// Protected navigation routes. Reached only through the edge router guard, which
/// has already verified the session and injected the identity headers.
pub mod portal;

/// Protected `/api` routes. Each handler re-establishes trust itself via the
/// `AuthUser` extractor and `require_role`.
pub mod api;
