//! Application state shared across handlers

use sqlx::SqlitePool;

use crate::{
    config::AppConfig,
    rate_limiter::RateLimiter,
    repositories::{ImageRepository, UserRepository},
    session::SessionStore,
    storage::BlobStore,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: AppConfig,
    pub users: UserRepository,
    pub images: ImageRepository,
    pub blobs: BlobStore,
    pub sessions: SessionStore,
    pub rate_limiter: RateLimiter,
}
