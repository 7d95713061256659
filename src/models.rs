use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The closed set of account roles recognized by the portal. The role is embedded in
/// every session token and is the sole input to route and endpoint authorization.
///
/// Authorization checks go through [`Role::allowed_by`]; no other role comparison
/// exists in the codebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    #[default]
    Student,
    Teacher,
    Parent,
    Admin,
}

impl Role {
    /// Whether this role appears in the given allowed set.
    pub fn allowed_by(self, allowed: &[Role]) -> bool {
        allowed.contains(&self)
    }

    /// The canonical wire/storage spelling of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Teacher => "TEACHER",
            Role::Parent => "PARENT",
            Role::Admin => "ADMIN",
        }
    }

    /// Parses the canonical spelling back into a role. Returns `None` for anything
    /// outside the closed set; callers decide how loudly to fail.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "STUDENT" => Some(Role::Student),
            "TEACHER" => Some(Role::Teacher),
            "PARENT" => Some(Role::Parent),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User
///
/// The user's canonical account record as stored in the `users` table and exposed
/// to administrators. The subset of it that a session token asserts is
/// [`UserProfile`].
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct User {
    // Primary key of the `users` table; the `sub` claim of issued tokens.
    pub id: Uuid,
    // Display and audit identifier. Never used as an authorization key.
    pub email: String,
    // The RBAC field embedded in session tokens at issuance time.
    pub role: Role,
    // Account creation timestamp; not part of the token claim.
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for the public registration endpoint (POST /api/auth/register).
/// The password is hashed before storage and never persisted or logged in clear text.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// Requested account role. Admin accounts cannot be self-registered.
    pub role: Role,
}

/// LoginRequest
///
/// Input payload for the login endpoint (POST /api/auth/login).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// RoleUpdateRequest
///
/// Admin payload for changing a user's stored role (PUT /api/users/{id}/role).
/// The change applies to tokens issued after the update; outstanding session tokens
/// keep the role they were signed with until they expire.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RoleUpdateRequest {
    pub role: Role,
}

// --- Response Payloads (Output Schemas) ---

/// UserProfile
///
/// The identity claim as a response body: exactly the facts a session token
/// asserts about its holder, nothing from the account record beyond them.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// AuthResponse
///
/// Output of both login and registration: the claim embedded in the freshly issued
/// session token, mirrored for client-side state hydration, plus the token itself
/// for non-browser clients that authenticate via the `Authorization` header instead
/// of the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
}
