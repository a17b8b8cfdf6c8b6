//! Integration tests for the infrastructure components
//!
//! These tests verify that the SQLite database layer can be initialized,
//! bootstrapped and queried through the public API of the crate.

use common::database::{DatabaseConfig, health_check, init_pool, init_schema};
use sqlx::Row;

/// Test that verifies the database pool can be created, the schema
/// bootstrapped, and basic row round-trips performed
#[tokio::test]
async fn test_infrastructure_integration() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig {
        database_url: "sqlite::memory:".to_string(),
        max_connections: 1,
    };
    let pool = init_pool(&db_config).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    init_schema(&pool).await?;

    // Insert a user and read it back through a plain query.
    sqlx::query(
        "INSERT INTO users (id, username, password_hash, registered_at) VALUES ($1, $2, $3, $4)",
    )
    .bind("8f2f3e1f-0000-4000-8000-000000000001")
    .bind("integration_user")
    .bind("$argon2id$placeholder")
    .bind("2026-01-01T00:00:00Z")
    .execute(&pool)
    .await?;

    let row = sqlx::query("SELECT username FROM users WHERE username = $1")
        .bind("integration_user")
        .fetch_one(&pool)
        .await?;
    let username: String = row.get("username");
    assert_eq!(username, "integration_user");

    // The username uniqueness constraint must hold at write time.
    let duplicate = sqlx::query(
        "INSERT INTO users (id, username, password_hash, registered_at) VALUES ($1, $2, $3, $4)",
    )
    .bind("8f2f3e1f-0000-4000-8000-000000000002")
    .bind("integration_user")
    .bind("$argon2id$placeholder")
    .bind("2026-01-01T00:00:00Z")
    .execute(&pool)
    .await;
    assert!(duplicate.is_err(), "duplicate username must be rejected");

    Ok(())
}
