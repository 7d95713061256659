use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHasher};
use async_trait::async_trait;
use madrasa_portal::{
    AppState, RouteTable, TokenService,
    config::AppConfig,
    create_router,
    models::{Role, User},
    repository::{Credentials, Repository},
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use uuid::Uuid;

// --- In-Memory Repository ---
//
// A small stateful store so the session endpoints can be exercised end to end:
// registration inserts, login reads hashes, role updates mutate.
struct InMemoryRepo {
    // (user, password_hash)
    users: Mutex<Vec<(User, String)>>,
}

impl InMemoryRepo {
    fn seeded(users: Vec<(User, &str)>) -> Self {
        let users = users
            .into_iter()
            .map(|(user, password)| (user, hash(password)))
            .collect();
        Self {
            users: Mutex::new(users),
        }
    }
}

fn hash(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

#[async_trait]
impl Repository for InMemoryRepo {
    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|(u, _)| u.id == id)
            .map(|(u, _)| u.clone())
    }

    async fn find_credentials(&self, email: &str) -> Option<Credentials> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|(u, _)| u.email == email)
            .map(|(u, h)| Credentials {
                user: u.clone(),
                password_hash: h.clone(),
            })
    }

    async fn create_user(&self, email: &str, password_hash: &str, role: Role) -> Option<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|(u, _)| u.email == email) {
            return None;
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role,
            created_at: chrono::Utc::now(),
        };
        users.push((user.clone(), password_hash.to_string()));
        Some(user)
    }

    async fn list_users(&self) -> Vec<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .map(|(u, _)| u.clone())
            .collect()
    }

    async fn list_users_by_role(&self, role: Role) -> Vec<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u.role == role)
            .map(|(u, _)| u.clone())
            .collect()
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> Option<User> {
        let mut users = self.users.lock().unwrap();
        let entry = users.iter_mut().find(|(u, _)| u.id == id)?;
        entry.0.role = role;
        Some(entry.0.clone())
    }
}

// --- Test Harness ---

const STUDENT_ID: Uuid = Uuid::from_u128(21);
const ADMIN_ID: Uuid = Uuid::from_u128(22);

fn seeded_repo() -> InMemoryRepo {
    InMemoryRepo::seeded(vec![
        (
            User {
                id: STUDENT_ID,
                email: "yusuf@example.org".to_string(),
                role: Role::Student,
                created_at: chrono::Utc::now(),
            },
            "hifz-circle-2026",
        ),
        (
            User {
                id: ADMIN_ID,
                email: "maryam@example.org".to_string(),
                role: Role::Admin,
                created_at: chrono::Utc::now(),
            },
            "admin-passphrase",
        ),
    ])
}

async fn spawn_app(repo: InMemoryRepo) -> String {
    let config = AppConfig::default();
    let tokens = TokenService::new(&config.token_secret);
    let state = AppState {
        repo: Arc::new(repo),
        tokens,
        routes: Arc::new(RouteTable::portal()),
        config,
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    address
}

async fn login(app: &str, email: &str, password: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/api/auth/login", app))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .unwrap()
}

// --- Session Flow ---

#[tokio::test]
async fn login_sets_the_session_cookie_and_mirrors_the_claim() {
    let app = spawn_app(seeded_repo()).await;

    let response = login(&app, "yusuf@example.org", "hifz-circle-2026").await;
    assert_eq!(response.status(), 200);

    let set_cookie = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("login must set the session cookie");
    assert!(set_cookie.starts_with("auth-token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Max-Age=604800"));

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["user"]["email"], "yusuf@example.org");
    assert_eq!(body["user"]["role"], "STUDENT");

    // The mirrored token is usable as a bearer credential.
    let token = body["token"].as_str().unwrap();
    let me = reqwest::Client::new()
        .get(format!("{}/api/auth/me", app))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(me.status(), 200);
    let me: serde_json::Value = me.json().await.unwrap();
    assert_eq!(me["id"], STUDENT_ID.to_string());
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app(seeded_repo()).await;

    let wrong_password = login(&app, "yusuf@example.org", "wrong").await;
    let unknown_email = login(&app, "nobody@example.org", "wrong").await;

    assert_eq!(wrong_password.status(), 401);
    assert_eq!(unknown_email.status(), 401);

    let a: serde_json::Value = wrong_password.json().await.unwrap();
    let b: serde_json::Value = unknown_email.json().await.unwrap();
    // Same body either way: no account-existence oracle.
    assert_eq!(a, b);
    assert_eq!(a["error"], "Invalid email or password");
}

#[tokio::test]
async fn registration_creates_the_account_and_signs_in() {
    let app = spawn_app(seeded_repo()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/auth/register", app))
        .json(&json!({
            "email": "fatima@example.org",
            "password": "first-grade-1447",
            "role": "PARENT"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    assert!(
        response
            .headers()
            .get(reqwest::header::SET_COOKIE)
            .is_some()
    );
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["user"]["role"], "PARENT");

    // The fresh credentials immediately work for login.
    let again = login(&app, "fatima@example.org", "first-grade-1447").await;
    assert_eq!(again.status(), 200);
}

#[tokio::test]
async fn registration_rejects_duplicates_and_admin_self_assignment() {
    let app = spawn_app(seeded_repo()).await;
    let client = reqwest::Client::new();

    let duplicate = client
        .post(format!("{}/api/auth/register", app))
        .json(&json!({
            "email": "yusuf@example.org",
            "password": "whatever-123",
            "role": "STUDENT"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), 409);

    let admin = client
        .post(format!("{}/api/auth/register", app))
        .json(&json!({
            "email": "new-admin@example.org",
            "password": "whatever-123",
            "role": "ADMIN"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(admin.status(), 400);
}

#[tokio::test]
async fn logout_expires_the_session_cookie() {
    let app = spawn_app(seeded_repo()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/auth/logout", app))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let set_cookie = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(set_cookie.starts_with("auth-token=;"));
    assert!(set_cookie.contains("Max-Age=0"));
}

// --- Role Gating & Claim Immutability ---

#[tokio::test]
async fn user_management_is_admin_only() {
    let app = spawn_app(seeded_repo()).await;
    let client = reqwest::Client::new();

    let student: serde_json::Value = login(&app, "yusuf@example.org", "hifz-circle-2026")
        .await
        .json()
        .await
        .unwrap();
    let admin: serde_json::Value = login(&app, "maryam@example.org", "admin-passphrase")
        .await
        .json()
        .await
        .unwrap();

    let forbidden = client
        .get(format!("{}/api/users", app))
        .bearer_auth(student["token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), 403);
    let body: serde_json::Value = forbidden.json().await.unwrap();
    assert_eq!(body["error"], "Insufficient permissions");

    let allowed = client
        .get(format!("{}/api/users", app))
        .bearer_auth(admin["token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), 200);
    let users: Vec<serde_json::Value> = allowed.json().await.unwrap();
    assert_eq!(users.len(), 2);
}

#[tokio::test]
async fn the_student_roster_is_for_teaching_staff() {
    let app = spawn_app(seeded_repo()).await;
    let client = reqwest::Client::new();

    // A teacher account, registered through the normal flow.
    let teacher: serde_json::Value = client
        .post(format!("{}/api/auth/register", app))
        .json(&json!({
            "email": "bilal@example.org",
            "password": "tajwid-rules-7",
            "role": "TEACHER"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let roster = client
        .get(format!("{}/api/school/students", app))
        .bearer_auth(teacher["token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(roster.status(), 200);
    let students: Vec<serde_json::Value> = roster.json().await.unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0]["email"], "yusuf@example.org");

    let student: serde_json::Value = login(&app, "yusuf@example.org", "hifz-circle-2026")
        .await
        .json()
        .await
        .unwrap();
    let forbidden = client
        .get(format!("{}/api/school/students", app))
        .bearer_auth(student["token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), 403);
}

#[tokio::test]
async fn a_role_change_does_not_touch_outstanding_tokens() {
    let app = spawn_app(seeded_repo()).await;
    let client = reqwest::Client::new();

    let student: serde_json::Value = login(&app, "yusuf@example.org", "hifz-circle-2026")
        .await
        .json()
        .await
        .unwrap();
    let admin: serde_json::Value = login(&app, "maryam@example.org", "admin-passphrase")
        .await
        .json()
        .await
        .unwrap();
    let student_token = student["token"].as_str().unwrap();

    // Admin promotes the student to teacher.
    let updated = client
        .put(format!("{}/api/users/{}/role", app, STUDENT_ID))
        .bearer_auth(admin["token"].as_str().unwrap())
        .json(&json!({ "role": "TEACHER" }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), 200);
    let updated: serde_json::Value = updated.json().await.unwrap();
    assert_eq!(updated["role"], "TEACHER");

    // The already-issued token keeps the role it was signed with.
    let me: serde_json::Value = client
        .get(format!("{}/api/auth/me", app))
        .bearer_auth(student_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["role"], "STUDENT");

    // A fresh login picks up the new role.
    let relogin: serde_json::Value = login(&app, "yusuf@example.org", "hifz-circle-2026")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(relogin["user"]["role"], "TEACHER");
}
