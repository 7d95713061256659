use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use url::form_urlencoded;

use crate::{AppState, models::Role, session};

// Identity headers injected on a successful forward. Informational only: handlers
// reachable outside this guard's matcher must re-verify via the endpoint guard.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Pattern
///
/// A single route-classification rule: exact path match, or segment-aware prefix
/// match (`/donate` covers `/donate` and `/donate/zakat`, never `/donations`).
#[derive(Debug, Clone)]
enum Pattern {
    Exact(&'static str),
    Prefix(&'static str),
}

impl Pattern {
    fn matches(&self, path: &str) -> bool {
        match self {
            Pattern::Exact(p) => path == *p,
            Pattern::Prefix(p) => {
                path == *p || (path.starts_with(p) && path.as_bytes().get(p.len()) == Some(&b'/'))
            }
        }
    }
}

/// RouteClass
///
/// The access class the table assigns to a request path.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteClass {
    /// Forward without consulting the session cookie at all.
    Public,
    /// Any verified identity may pass.
    AuthRequired,
    /// Only the listed roles may pass; other verified identities are turned away.
    Restricted(&'static [Role]),
}

/// RouteTable
///
/// The static route classification table consulted by the edge router guard. Built
/// once at startup from a hand-maintained rule set and never mutated at runtime.
/// Rules are evaluated in order — public set first, then the role-restricted map —
/// and the first match wins. Paths matching no rule default to
/// authentication-required, so forgetting to classify a new page fails closed.
pub struct RouteTable {
    public: Vec<Pattern>,
    restricted: Vec<(Pattern, &'static [Role])>,
}

impl RouteTable {
    /// The portal's navigation rules: marketing pages and the auth pages are public;
    /// the admin area and the per-role school dashboards are role-restricted;
    /// everything else (donation history, profile, the school landing page) needs
    /// any authenticated session.
    pub fn portal() -> Self {
        Self {
            public: vec![
                Pattern::Exact("/"),
                Pattern::Exact("/health"),
                Pattern::Prefix("/about"),
                Pattern::Prefix("/events"),
                Pattern::Prefix("/prayer-times"),
                Pattern::Prefix("/library"),
                Pattern::Prefix("/contact"),
                Pattern::Prefix("/donate"),
                // Login/registration must stay public or the login redirect loops.
                Pattern::Prefix("/auth"),
                Pattern::Exact("/unauthorized"),
            ],
            restricted: vec![
                (Pattern::Prefix("/admin"), &[Role::Admin]),
                (
                    Pattern::Prefix("/school/student"),
                    &[Role::Student, Role::Admin],
                ),
                (
                    Pattern::Prefix("/school/teacher"),
                    &[Role::Teacher, Role::Admin],
                ),
                (
                    Pattern::Prefix("/school/parent"),
                    &[Role::Parent, Role::Admin],
                ),
            ],
        }
    }

    /// classify
    ///
    /// Resolves the access class for a request path. First matching rule wins;
    /// unmatched paths require authentication.
    pub fn classify(&self, path: &str) -> RouteClass {
        if self.public.iter().any(|rule| rule.matches(path)) {
            return RouteClass::Public;
        }
        if let Some((_, allowed)) = self
            .restricted
            .iter()
            .find(|(rule, _)| rule.matches(path))
        {
            return RouteClass::Restricted(allowed);
        }
        RouteClass::AuthRequired
    }
}

/// Paths the guard never gates: static assets, API documentation, and every
/// `/api/` route. API handlers enforce authentication themselves through the
/// endpoint guard, so gating them here would only duplicate the redirect-flavored
/// handling that makes no sense for JSON clients.
fn is_bypassed(path: &str) -> bool {
    path == "/favicon.ico"
        || path.starts_with("/assets/")
        || path.starts_with("/api/")
        || path.starts_with("/swagger-ui")
        || path.starts_with("/api-docs")
}

/// route_guard
///
/// The edge router guard: middleware over every inbound navigation request, run
/// before any page handler. Checks are evaluated strictly in order and the first
/// terminal outcome (bypass / forward / redirect) short-circuits the rest:
///
/// 1. Bypass — insecure test mode, static assets, API paths.
/// 2. Public — matching paths forward without the cookie being read.
/// 3. Missing cookie — redirect to the login page, preserving the requested path.
/// 4. Failed verification — same redirect, plus the invalid cookie is expired.
///    Fail closed: a transient error is indistinguishable from a forged token.
/// 5. Role check — authenticated but role not allowed: redirect to /unauthorized.
/// 6. Forward — inject the verified identity as request headers and pass through.
///
/// The guard performs no I/O beyond the framework's own dispatch; verification is
/// a local signature check, never a database round-trip.
pub async fn route_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();

    // 1. Bypass
    if state.config.insecure_auth_bypass || is_bypassed(&path) {
        return next.run(request).await;
    }

    // 2. Public
    let class = state.routes.classify(&path);
    if class == RouteClass::Public {
        return next.run(request).await;
    }

    // 3. Token extraction. Navigation requests carry the session cookie only;
    // the bearer fallback belongs to the endpoint guard.
    let Some(token) = session::cookie_token(request.headers()) else {
        return login_redirect(&path, false, &state);
    };

    // 4. Verification
    let Some(claims) = state.tokens.verify(&token) else {
        return login_redirect(&path, true, &state);
    };

    // 5. Role check
    if let RouteClass::Restricted(allowed) = class {
        if !claims.role.allowed_by(allowed) {
            return (
                StatusCode::FOUND,
                [(header::LOCATION, "/unauthorized".to_string())],
            )
                .into_response();
        }
    }

    // 6. Forward with identity
    let mut request = request;
    let headers = request.headers_mut();
    if let Ok(id) = HeaderValue::from_str(&claims.sub.to_string()) {
        headers.insert(USER_ID_HEADER, id);
    }
    headers.insert(USER_ROLE_HEADER, HeaderValue::from_static(claims.role.as_str()));
    if let Ok(email) = HeaderValue::from_str(&claims.email) {
        headers.insert(USER_EMAIL_HEADER, email);
    }
    next.run(request).await
}

/// 302 to the login page with a `redirect` parameter capturing the originally
/// requested path. When `clear_cookie` is set the response also expires the
/// presented (invalid) session cookie.
fn login_redirect(path: &str, clear_cookie: bool, state: &AppState) -> Response {
    let encoded: String = form_urlencoded::byte_serialize(path.as_bytes()).collect();
    let location = format!("/auth/login?redirect={}", encoded);

    if clear_cookie {
        let expired = session::clear_session_cookie(state.config.secure_cookies());
        (
            StatusCode::FOUND,
            [
                (header::LOCATION, location),
                (header::SET_COOKIE, expired),
            ],
        )
            .into_response()
    } else {
        (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
    }
}
