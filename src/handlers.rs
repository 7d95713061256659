use crate::{
    AppState,
    auth::{AuthRejection, AuthUser},
    gate::{USER_EMAIL_HEADER, USER_ID_HEADER, USER_ROLE_HEADER},
    models::{
        AuthResponse, LoginRequest, RegisterRequest, Role, RoleUpdateRequest, User, UserProfile,
    },
    session,
};
use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

// --- Error Shape ---

/// ApiError
///
/// The uniform JSON error response for API handlers: a status code plus a short
/// `{"error": ...}` body. Guard rejections convert into this shape so handlers can
/// propagate them with `?` unchanged.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<AuthRejection> for ApiError {
    fn from(rejection: AuthRejection) -> Self {
        match rejection {
            AuthRejection::Unauthenticated => {
                ApiError::new(StatusCode::UNAUTHORIZED, "Authentication required")
            }
            AuthRejection::Forbidden => {
                ApiError::new(StatusCode::FORBIDDEN, "Insufficient permissions")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

// --- Password Hashing ---

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

/// Constant outcome for every failure mode: unparseable hash, wrong password.
fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

// --- Session Handlers ---

/// login
///
/// [Public Route] Verifies the presented credentials and issues a fresh session
/// token: 7-day HTTP-only cookie plus the same claim mirrored in the body for
/// client-side state hydration.
///
/// Unknown email and wrong password produce the identical 401 so the endpoint
/// cannot be used to probe which accounts exist.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let credentials = state.repo.find_credentials(&payload.email).await;

    let Some(credentials) = credentials else {
        return Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
        ));
    };
    if !verify_password(&payload.password, &credentials.password_hash) {
        return Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
        ));
    }

    issue_session(&state, credentials.user, StatusCode::OK)
}

/// register
///
/// [Public Route] Creates a new account and signs the caller in immediately,
/// following the same issuance path as login. Admin accounts are provisioned by an
/// existing administrator, never self-registered.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, session issued", body = AuthResponse),
        (status = 400, description = "Role not self-assignable"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    if payload.role == Role::Admin {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Admin accounts cannot be self-registered",
        ));
    }

    let password_hash = hash_password(&payload.password).map_err(|e| {
        tracing::error!("password hashing failed: {:?}", e);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Registration failed")
    })?;

    let user = state
        .repo
        .create_user(&payload.email, &password_hash, payload.role)
        .await
        .ok_or_else(|| ApiError::new(StatusCode::CONFLICT, "Email already registered"))?;

    issue_session(&state, user, StatusCode::CREATED)
}

/// logout
///
/// [Public Route] Destroys the session by expiring the cookie immediately. The
/// token itself remains valid until its expiry (there is no server-side session
/// store to revoke it from), so the cookie is cleared whether or not the request
/// carried a verifiable one.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Session cookie cleared"))
)]
pub async fn logout(State(state): State<AppState>) -> Response {
    let expired = session::clear_session_cookie(state.config.secure_cookies());
    (
        StatusCode::OK,
        [(header::SET_COOKIE, expired)],
        Json(json!({ "ok": true })),
    )
        .into_response()
}

/// me
///
/// [Authenticated Route] Echoes the verified identity claim of the presented token.
/// This is the claim as signed at issuance — a role change on the account shows up
/// here only after re-login.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current identity", body = UserProfile),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(user: AuthUser) -> Json<UserProfile> {
    Json(UserProfile {
        id: user.id,
        email: user.email,
        role: user.role,
    })
}

/// Shared issuance tail of login and register: sign the claim, set the session
/// cookie, mirror the claim in the body. A signing failure fails the request;
/// there is no weaker fallback credential.
fn issue_session(state: &AppState, user: User, status: StatusCode) -> Result<Response, ApiError> {
    let token = state.tokens.issue(&user).map_err(|e| {
        tracing::error!("token signing failed: {:?}", e);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Could not create session")
    })?;

    let cookie = session::session_cookie(&token, state.config.secure_cookies());
    Ok((
        status,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user: UserProfile::from(&user),
            token,
        }),
    )
        .into_response())
}

// --- Admin & School Handlers ---

/// list_users
///
/// [Admin Route] Lists every account in the portal.
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_users(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, ApiError> {
    user.require_role(&[Role::Admin])?;
    Ok(Json(state.repo.list_users().await))
}

/// set_user_role
///
/// [Admin Route] Changes an account's stored role. Outstanding session tokens are
/// untouched: the holder keeps acting under the old role until their token expires
/// and is reissued at next login.
#[utoipa::path(
    put,
    path = "/api/users/{id}/role",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = RoleUpdateRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such user")
    )
)]
pub async fn set_user_role(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoleUpdateRequest>,
) -> Result<Json<User>, ApiError> {
    user.require_role(&[Role::Admin])?;
    match state.repo.set_user_role(id, payload.role).await {
        Some(updated) => Ok(Json(updated)),
        None => Err(ApiError::new(StatusCode::NOT_FOUND, "No such user")),
    }
}

/// list_students
///
/// [School Route] The student roster, visible to teaching staff and admins.
#[utoipa::path(
    get,
    path = "/api/school/students",
    responses(
        (status = 200, description = "Student accounts", body = [User]),
        (status = 403, description = "Not teaching staff")
    )
)]
pub async fn list_students(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, ApiError> {
    user.require_role(&[Role::Teacher, Role::Admin])?;
    Ok(Json(state.repo.list_users_by_role(Role::Student).await))
}

// --- Navigation (Page) Handlers ---
//
// The portal's pages are rendered client-side; these handlers return the small
// JSON payloads behind each navigation path. Protected pages sit behind the edge
// router guard and echo the identity headers it injected, which keeps the guard's
// forwarding contract observable end to end.

#[derive(Deserialize)]
pub struct LoginPageQuery {
    /// Originally requested path, carried through the login redirect.
    pub redirect: Option<String>,
}

/// The login navigation target. Echoes the `redirect` parameter so the client can
/// return the user to where the guard intercepted them.
pub async fn login_page(Query(query): Query<LoginPageQuery>) -> Json<Value> {
    Json(json!({ "page": "login", "redirect": query.redirect }))
}

/// Navigation target for authenticated users that lack the required role.
pub async fn unauthorized_page() -> Json<Value> {
    Json(json!({
        "page": "unauthorized",
        "message": "You are signed in but do not have access to this area."
    }))
}

/// Catch-all for the public marketing pages; the payload identifies the page by
/// its path.
pub async fn public_page(uri: Uri) -> Json<Value> {
    Json(json!({ "page": uri.path(), "public": true }))
}

/// Identity as forwarded by the edge router guard. Informational: pages display
/// it, API handlers never trust it.
fn forwarded_identity(headers: &HeaderMap) -> Value {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    json!({
        "user_id": get(USER_ID_HEADER),
        "role": get(USER_ROLE_HEADER),
        "email": get(USER_EMAIL_HEADER),
    })
}

pub async fn admin_dashboard(headers: HeaderMap) -> Json<Value> {
    Json(json!({ "page": "admin", "identity": forwarded_identity(&headers) }))
}

pub async fn student_dashboard(headers: HeaderMap) -> Json<Value> {
    Json(json!({ "page": "school-student", "identity": forwarded_identity(&headers) }))
}

pub async fn teacher_dashboard(headers: HeaderMap) -> Json<Value> {
    Json(json!({ "page": "school-teacher", "identity": forwarded_identity(&headers) }))
}

pub async fn parent_dashboard(headers: HeaderMap) -> Json<Value> {
    Json(json!({ "page": "school-parent", "identity": forwarded_identity(&headers) }))
}

pub async fn donations_history(headers: HeaderMap) -> Json<Value> {
    Json(json!({ "page": "donations-history", "identity": forwarded_identity(&headers) }))
}

pub async fn profile_page(headers: HeaderMap) -> Json<Value> {
    Json(json!({ "page": "profile", "identity": forwarded_identity(&headers) }))
}
