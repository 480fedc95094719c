use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::{Row, error::SqlState};

use crate::{
    error::{AppError, Result},
    models::user::{NewUser, Role, User},
};

/// Storage for user accounts and their derived credentials.
///
/// Only the derived credential is ever stored; plaintext passwords and tokens never reach it.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Inserts a new user. Teachers also get a row in `teachers`.
    ///
    /// Fails with [`AppError::Conflict`] when the email is taken.
    async fn create_user(&self, new_user: NewUser) -> Result<User>;

    /// Replaces a user's stored credential.
    async fn update_password_hash(&self, user_id: i64, password_hash: &str) -> Result<()>;
}

/// Parses the `users.role` column. Rows written by other tools may carry roles this service
/// does not issue tokens for; those surface as [`AppError::UnsupportedRole`].
fn parse_stored_role(user_id: i64, role: &str) -> Result<Role> {
    role.parse().map_err(|_| AppError::UnsupportedRole {
        user_id,
        role: role.to_string(),
    })
}

fn is_unique_violation(code: Option<&SqlState>) -> bool {
    code == Some(&SqlState::UNIQUE_VIOLATION)
}

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    let id: i32 = row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?;
    let role: String = row.try_get("role").map_err(|_| AppError::MissingData("role".to_string()))?;
    let phone: Option<String> = row.try_get("phone").map_err(|_| AppError::MissingData("phone".to_string()))?;

    Ok(User {
        id: i64::from(id),
        role: parse_stored_role(i64::from(id), &role)?,
        email: row.try_get("email").map_err(|_| AppError::MissingData("email".to_string()))?,
        password_hash: row.try_get("password_hash").map_err(|_| AppError::MissingData("password_hash".to_string()))?,
        full_name: row.try_get("full_name").map_err(|_| AppError::MissingData("full_name".to_string()))?,
        phone: phone.unwrap_or_default(),
    })
}

/// PostgreSQL-backed [`UserRepository`].
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool,
}

impl PgUserRepository {
    /// Creates a new `PgUserRepository` over a connection pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, email, password_hash, role, full_name, phone
                FROM users
                WHERE email = $1
                "#,
                &[&email],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let mut client = self.pool.get().await?;
        let transaction = client.transaction().await?;

        let existing = transaction
            .query_opt("SELECT id FROM users WHERE email = $1", &[&new_user.email])
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let row = transaction
            .query_one(
                r#"
                INSERT INTO users (email, password_hash, role, full_name, phone)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, email, password_hash, role, full_name, phone
                "#,
                &[
                    &new_user.email,
                    &new_user.password_hash,
                    &new_user.role.as_str(),
                    &new_user.full_name,
                    &new_user.phone,
                ],
            )
            .await
            .map_err(|e| {
                // A concurrent registration can win the race past the SELECT above.
                if is_unique_violation(e.code()) {
                    AppError::Conflict("User already exists".to_string())
                } else {
                    AppError::Database(e)
                }
            })?;
        let user = row_to_user(&row)?;

        if user.role == Role::Teacher {
            let user_id = i32::try_from(user.id)
                .map_err(|_| AppError::Internal(format!("user id out of range: {}", user.id)))?;
            transaction
                .execute(
                    "INSERT INTO teachers (user_id, rate_per_student) VALUES ($1, 0)",
                    &[&user_id],
                )
                .await?;
        }

        transaction.commit().await?;
        tracing::info!("✅ User created with ID: {}", user.id);
        Ok(user)
    }

    async fn update_password_hash(&self, user_id: i64, password_hash: &str) -> Result<()> {
        let user_id = i32::try_from(user_id)
            .map_err(|_| AppError::Internal(format!("user id out of range: {}", user_id)))?;
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE users SET password_hash = $1 WHERE id = $2",
                &[&password_hash, &user_id],
            )
            .await?;
        Ok(())
    }
}
