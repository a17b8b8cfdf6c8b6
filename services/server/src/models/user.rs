//! User model and related payloads

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// User entity
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub registered_at: DateTime<Utc>,
}

/// Login and registration form payload
#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}
