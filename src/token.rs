use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::models::{Role, User};

/// Fixed validity window of a session token: 7 days.
pub const SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Claims
///
/// The payload embedded in a session token: the identity claim (subject id, email,
/// role) plus the standard issued-at and expiry timestamps. A claim is immutable for
/// the token's lifetime; role changes on the underlying account only take effect once
/// the token expires and a new one is issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the UUID of the user account the token was issued for.
    pub sub: Uuid,
    /// Display/audit email captured at issuance time. Not an authorization key.
    pub email: String,
    /// The role the holder is authorized as, frozen at issuance time.
    pub role: Role,
    /// Issued At (iat): timestamp when the token was created.
    pub iat: usize,
    /// Expiration Time (exp): timestamp after which the token must not be accepted.
    pub exp: usize,
}

/// TokenService
///
/// Issues and verifies signed session tokens (HS256). The signing secret is turned
/// into key material exactly once, at process start; the service itself is read-only
/// shared state with no per-request configuration reads.
///
/// The token *is* the session: there is no server-side session store, and any process
/// holding the same secret can independently verify a presented token.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    /// Builds the service from the configured signing secret. `AppConfig::load`
    /// guarantees the secret is present and non-empty before this is reached.
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// issue
    ///
    /// Creates a signed session token binding the user's identity claim, valid for
    /// [`SESSION_TTL_SECS`] from now.
    ///
    /// A signing failure is surfaced to the caller; the request that triggered the
    /// issuance must fail rather than fall back to any weaker credential.
    pub fn issue(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        let now = unix_now();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now + SESSION_TTL_SECS as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// verify
    ///
    /// Validates a presented token's signature and expiry, returning the embedded
    /// claims or `None`. Every failure mode — malformed input, bad signature,
    /// expired token — collapses into the same `None` so callers cannot be used as
    /// a verification oracle. Pure function of (token, secret, current time); no
    /// I/O and no side effects.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .ok()
    }
}

/// Seconds since the Unix epoch.
fn unix_now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or(0)
}
