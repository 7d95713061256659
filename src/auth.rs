use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use uuid::Uuid;

use crate::{models::Role, session, token::TokenService};

/// AuthUser
///
/// The resolved identity of an authenticated request: the verified contents of the
/// session token, nothing more. Resolution is a pure token verification — no database
/// lookup — so the identity a handler sees is exactly the claim that was signed at
/// issuance time.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The unique identifier of the user (the token's `sub` claim).
    pub id: Uuid,
    /// Display/audit email captured at issuance time.
    pub email: String,
    /// The role the token was signed with. Used for all RBAC decisions.
    pub role: Role,
}

/// AuthRejection
///
/// The discriminated failure outcome of the endpoint guard. Authentication failure
/// (missing or invalid credential) and authorization failure (valid credential,
/// wrong role) map to distinct statuses so clients can render "please log in"
/// versus "you're logged in but can't do this".
#[derive(Debug, Clone, PartialEq)]
pub enum AuthRejection {
    /// No credential, or a credential that failed verification. 401.
    Unauthenticated,
    /// A verified identity whose role is outside the allowed set. 403.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthRejection::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Authentication required")
            }
            AuthRejection::Forbidden => (StatusCode::FORBIDDEN, "Insufficient permissions"),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// require_auth
///
/// The endpoint guard. Every protected handler re-establishes trust through this
/// function (directly or via the [`AuthUser`] extractor) instead of trusting the
/// identity headers injected by the edge router guard, since a handler cannot assume
/// it was reached only through the edge guard's matcher.
///
/// Flow: extract the token (cookie first, then bearer header) → verify → optionally
/// check the role against an allowed set. Produces either the identity or a
/// ready-to-return rejection, never both; callers propagate the rejection unchanged.
pub fn require_auth(
    headers: &HeaderMap,
    tokens: &TokenService,
    allowed_roles: Option<&[Role]>,
) -> Result<AuthUser, AuthRejection> {
    let token = session::extract_token(headers).ok_or(AuthRejection::Unauthenticated)?;

    // Any verification failure collapses to the same outcome as a missing
    // credential; the guard exposes no oracle.
    let claims = tokens
        .verify(&token)
        .ok_or(AuthRejection::Unauthenticated)?;

    if let Some(allowed) = allowed_roles {
        if !claims.role.allowed_by(allowed) {
            return Err(AuthRejection::Forbidden);
        }
    }

    Ok(AuthUser {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}

impl AuthUser {
    /// require_role
    ///
    /// The single role-gate predicate used by handlers that restrict an already
    /// authenticated identity to a subset of roles.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AuthRejection> {
        if self.role.allowed_by(allowed) {
            Ok(())
        } else {
            Err(AuthRejection::Forbidden)
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's `FromRequestParts` trait, making `AuthUser` usable as a function
/// argument in any protected handler. Authentication stays in the extractor,
/// business logic stays in the handler; a handler that declares `AuthUser` is
/// unreachable without a verified token.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    // Allows the extractor to pull the token verifier from the app state.
    TokenService: FromRef<S>,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = TokenService::from_ref(state);
        require_auth(&parts.headers, &tokens, None)
    }
}
