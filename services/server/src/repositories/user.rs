//! User repository for database operations

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use chrono::Utc;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use tracing::info;
use uuid::Uuid;

use crate::models::User;

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user with a freshly hashed password.
    ///
    /// Returns `Ok(None)` when the username is already taken.
    pub async fn create(&self, username: &str, password: &str) -> Result<Option<User>> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();

        let id = Uuid::new_v4();
        let registered_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO users (id, username, password_hash, registered_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(id.to_string())
        .bind(username)
        .bind(&password_hash)
        .bind(registered_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                info!("Created user {}", username);
                Ok(Some(User {
                    id,
                    username: username.to_string(),
                    password_hash,
                    registered_at,
                }))
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Find a user by username
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, registered_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_user).transpose()
    }

    /// Verify a password against the stored hash.
    pub fn verify_password(&self, user: &User, password: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

        let argon2 = Argon2::default();
        Ok(argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

fn map_user(row: SqliteRow) -> Result<User> {
    let id: String = row.get("id");
    Ok(User {
        id: Uuid::parse_str(&id)?,
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        registered_at: row.get("registered_at"),
    })
}
