use axum::http::{HeaderMap, header};

use crate::token::SESSION_TTL_SECS;

/// Name of the HTTP-only session cookie carrying the signed token.
pub const AUTH_COOKIE: &str = "auth-token";

/// build_cookie
///
/// Renders a `Set-Cookie` value for the session cookie. Issue and clear use the
/// identical attribute set (`HttpOnly; SameSite=Lax; Path=/`, `Secure` outside local
/// development) and differ only in value and `Max-Age`, so a clear always matches
/// the cookie it is removing.
fn build_cookie(value: &str, max_age: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
        AUTH_COOKIE, value, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// The `Set-Cookie` value installing a freshly issued session token (7-day window).
pub fn session_cookie(token: &str, secure: bool) -> String {
    build_cookie(token, SESSION_TTL_SECS, secure)
}

/// The `Set-Cookie` value expiring the session cookie immediately (`Max-Age=0`).
/// Used on logout and whenever a presented token fails verification.
pub fn clear_session_cookie(secure: bool) -> String {
    build_cookie("", 0, secure)
}

// --- Token Extraction Strategies ---
//
// Ordered list tried in sequence; the first strategy that yields a token wins.
// Cookie before bearer header: the browser session is authoritative for clients
// that have both.
const STRATEGIES: &[fn(&HeaderMap) -> Option<String>] = &[cookie_token, bearer_token];

/// Extracts the session token from the `auth-token` cookie, if present.
pub fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|cookie| {
                let mut parts = cookie.trim().splitn(2, '=');
                let name = parts.next()?.trim();
                let value = parts.next()?.trim();
                if name == AUTH_COOKIE && !value.is_empty() {
                    Some(value.to_string())
                } else {
                    None
                }
            })
        })
}

/// Extracts the session token from an `Authorization: Bearer` header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

/// extract_token
///
/// Runs the extraction strategies in order and returns the first token found.
/// Returns `None` when the request carries no credential at all.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    STRATEGIES.iter().find_map(|strategy| strategy(headers))
}
