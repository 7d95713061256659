use crate::models::{Role, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Credentials
///
/// Internal persistence shape pairing a user record with its password hash.
/// Never serialized into a response; the hash stops at the login handler.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, allowing handlers
/// to interact with the data layer without knowing the specific implementation
/// (Postgres, Mock, etc.).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's asynchronous task
/// boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    // Credential lookup for the password check that precedes token issuance.
    async fn find_credentials(&self, email: &str) -> Option<Credentials>;
    // Returns None when the email is already taken (or on a storage failure).
    async fn create_user(&self, email: &str, password_hash: &str, role: Role) -> Option<User>;

    // --- Administration ---
    async fn list_users(&self) -> Vec<User>;
    async fn list_users_by_role(&self, role: Role) -> Vec<User>;
    // Changes the stored role only. Outstanding session tokens keep the role they
    // were signed with until they expire.
    async fn set_user_role(&self, id: Uuid, role: Role) -> Option<User>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the PostgreSQL
/// database. Storage failures are logged and collapsed to `None`/empty at this
/// boundary; handlers translate absence into the appropriate status code.
pub struct PostgresRepository {
    pool: PgPool,
}

/// Raw `users` row. The role column is plain text; [`row_to_user`] narrows it into
/// the closed `Role` set and refuses rows that fall outside it.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: Uuid,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
    password_hash: String,
}

fn row_to_user(row: UserRow) -> Option<User> {
    match Role::parse(&row.role) {
        Some(role) => Some(User {
            id: row.id,
            email: row.email,
            role,
            created_at: row.created_at,
        }),
        None => {
            tracing::error!("user {} has unrecognized role {:?}", row.id, row.role);
            None
        }
    }
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Option<User> {
        match sqlx::query_as::<_, UserRow>("SELECT id, email, role, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => row.and_then(row_to_user),
            Err(e) => {
                tracing::error!("get_user error: {:?}", e);
                None
            }
        }
    }

    async fn find_credentials(&self, email: &str) -> Option<Credentials> {
        match sqlx::query_as::<_, CredentialRow>(
            "SELECT id, email, role, created_at, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        {
            Ok(row) => row.and_then(|r| {
                let password_hash = r.password_hash;
                row_to_user(UserRow {
                    id: r.id,
                    email: r.email,
                    role: r.role,
                    created_at: r.created_at,
                })
                .map(|user| Credentials {
                    user,
                    password_hash,
                })
            }),
            Err(e) => {
                tracing::error!("find_credentials error: {:?}", e);
                None
            }
        }
    }

    /// create_user
    ///
    /// Inserts the new account, relying on the unique index on `email`:
    /// a conflict inserts nothing and surfaces as `None`.
    async fn create_user(&self, email: &str, password_hash: &str, role: Role) -> Option<User> {
        match sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, email, role, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(role.as_str())
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        {
            Ok(row) => row.and_then(row_to_user),
            Err(e) => {
                tracing::error!("create_user error: {:?}", e);
                None
            }
        }
    }

    async fn list_users(&self) -> Vec<User> {
        match sqlx::query_as::<_, UserRow>(
            "SELECT id, email, role, created_at FROM users ORDER BY email ASC",
        )
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows.into_iter().filter_map(row_to_user).collect(),
            Err(e) => {
                tracing::error!("list_users error: {:?}", e);
                vec![]
            }
        }
    }

    async fn list_users_by_role(&self, role: Role) -> Vec<User> {
        match sqlx::query_as::<_, UserRow>(
            "SELECT id, email, role, created_at FROM users WHERE role = $1 ORDER BY email ASC",
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows.into_iter().filter_map(row_to_user).collect(),
            Err(e) => {
                tracing::error!("list_users_by_role error: {:?}", e);
                vec![]
            }
        }
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> Option<User> {
        match sqlx::query_as::<_, UserRow>(
            "UPDATE users SET role = $2 WHERE id = $1 RETURNING id, email, role, created_at",
        )
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await
        {
            Ok(row) => row.and_then(row_to_user),
            Err(e) => {
                tracing::error!("set_user_role error: {:?}", e);
                None
            }
        }
    }
}
