use anyhow::Result;
use std::time::Duration;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod ids;
mod middleware;
mod models;
mod pipeline;
mod rate_limiter;
mod repositories;
mod routes;
mod session;
mod state;
mod storage;
mod validation;

use crate::{
    config::AppConfig,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::{ImageRepository, UserRepository},
    session::SessionStore,
    state::AppState,
    storage::BlobStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_max_level(Level::INFO)
        .init();

    info!("Starting pixelbin service");

    let config = AppConfig::from_env();

    // Initialize database connection pool and bootstrap the schema
    let db_config = common::database::DatabaseConfig::from_env()?;
    let pool = common::database::init_pool(&db_config).await?;
    common::database::init_schema(&pool).await?;

    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let blobs = BlobStore::open(config.blob_root.clone()).await?;
    let users = UserRepository::new(pool.clone());
    let images = ImageRepository::new(pool.clone());
    let sessions = SessionStore::new(Duration::from_secs(config.session_ttl_seconds));
    let rate_limiter = RateLimiter::new(RateLimiterConfig::from_env());

    let app_state = AppState {
        db_pool: pool,
        config: config.clone(),
        users,
        images,
        blobs,
        sessions,
        rate_limiter,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("pixelbin listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
