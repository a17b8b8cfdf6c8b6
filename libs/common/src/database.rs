//! Database module for handling SQLite connections and operations
//!
//! This module provides connection pooling, configuration, schema bootstrap
//! and health checks for the SQLite database.

use crate::error::{DatabaseError, DatabaseResult};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::str::FromStr;
use tracing::info;

/// Database configuration struct
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Create a new DatabaseConfig from environment variables
    ///
    /// # Environment Variables
    /// - `DATABASE_URL`: SQLite connection URL (default: "sqlite://data/pixelbin.db")
    /// - `DATABASE_MAX_CONNECTIONS`: Maximum number of connections (default: 5)
    pub fn from_env() -> DatabaseResult<Self> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/pixelbin.db".to_string());

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

/// Initialize a SQLite connection pool
///
/// The database file is created if it does not exist yet.
pub async fn init_pool(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    // Create the parent directory for file-backed databases so a fresh
    // checkout can boot without manual setup.
    if let Some(file) = config.database_url.strip_prefix("sqlite://") {
        if let Some(parent) = std::path::Path::new(file).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DatabaseError::Configuration(format!(
                        "Failed to create database directory: {}",
                        e
                    ))
                })?;
            }
        }
    }

    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(|e| DatabaseError::Configuration(format!("Invalid database URL: {}", e)))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .map_err(DatabaseError::Connection)?;

    info!("Database connection pool initialized");
    Ok(pool)
}

/// Create the application tables if they do not exist yet
///
/// Runs at startup, before the first request is served.
pub async fn init_schema(pool: &SqlitePool) -> DatabaseResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id            TEXT PRIMARY KEY,
            username      TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            registered_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(DatabaseError::Migration)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS images (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            uploaded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(DatabaseError::Migration)?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_images_user_id ON images(user_id)")
        .execute(pool)
        .await
        .map_err(DatabaseError::Migration)?;

    info!("Database schema initialized");
    Ok(())
}

/// Check database connectivity
pub async fn health_check(pool: &SqlitePool) -> DatabaseResult<bool> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(DatabaseError::Query)?;

    Ok(true)
}
