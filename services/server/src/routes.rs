//! HTTP routes and the upload orchestration pipeline

use axum::{
    Form, Json, Router,
    extract::{DefaultBodyLimit, Extension, Multipart, Path, Query, State},
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    ids::ImageId,
    middleware::{AuthUser, require_auth, require_auth_or_login},
    models::Credentials,
    pipeline,
    repositories::RemoveOutcome,
    session::SESSION_COOKIE,
    state::AppState,
    storage::BlobError,
    validation,
};

/// Query flag selecting browser-mode responses on dual-mode endpoints.
///
/// Machine clients get a plain body; passing `?s` switches the endpoint to
/// redirect like an HTML form flow.
#[derive(Deserialize)]
struct ResponseMode {
    s: Option<String>,
}

impl ResponseMode {
    fn browser(&self) -> bool {
        self.s.is_some()
    }
}

/// Create the router for the pixelbin service
pub fn create_router(state: AppState) -> Router {
    // The transport-level body cap sits above the application cap so that
    // oversized files fail the explicit size check (413 with a clear
    // message) instead of dying inside multipart framing.
    let body_limit = state.config.limits.max_upload_bytes + 64 * 1024;

    let upload_routes = Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let browser_routes = Router::new()
        .route("/mine", get(list_mine))
        .route("/d/:id", get(delete_image))
        .route("/logout", post(logout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth_or_login,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/i/:id", get(retrieve_image))
        .merge(upload_routes)
        .merge(browser_routes)
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool).await.is_ok();
    Json(json!({
        "status": "ok",
        "service": "pixelbin",
        "database": database,
    }))
}

/// Upload endpoint.
///
/// Authentication happens in the route middleware; everything after it runs
/// in strict order and short-circuits on the first failure.
async fn upload(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Query(mode): Query<ResponseMode>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    if !state.rate_limiter.is_allowed(&user_id.to_string()).await {
        warn!("Upload rate limit exceeded for user {}", user_id);
        return Err(AppError::RateLimited);
    }

    let (filename, data) = read_file_field(multipart, state.config.limits.max_upload_bytes)
        .await
        .map_err(|e| {
            error!("Upload failed: {}", e);
            e
        })?;

    let id = ingest(&state, user_id, &filename, data).await.map_err(|e| {
        error!("Upload failed: {}", e);
        e
    })?;

    if mode.browser() {
        Ok(Redirect::to(&format!("/i/{}", id)).into_response())
    } else {
        Ok((StatusCode::OK, format!("{}\n", id)).into_response())
    }
}

/// Pull the `file` field out of the multipart form.
async fn read_file_field(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<(String, Vec<u8>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(AppError::EmptyFilename);
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        if data.len() > max_bytes {
            return Err(AppError::EntityTooLarge {
                max_bytes,
            });
        }

        return Ok((filename, data.to_vec()));
    }

    Err(AppError::NoFile)
}

/// The content pipeline for one authenticated upload: validate, normalize,
/// allocate an identifier, store the blob, record ownership.
async fn ingest(
    state: &AppState,
    user_id: Uuid,
    filename: &str,
    data: Vec<u8>,
) -> Result<ImageId, AppError> {
    validation::check_extension(filename, &state.config.limits.allowed_extensions)?;
    let detected = validation::sniff_image(&data, &state.config.limits.allowed_mime_types)?;

    let normalized =
        pipeline::normalize_with_timeout(data, state.config.limits.normalize_timeout).await?;

    let id = ImageId::generate();
    state.blobs.put(&id, &normalized.bytes).await?;

    match state.images.record_upload(&id, user_id).await {
        Ok(record) => {
            info!(
                "Image uploaded: {} by user {} ({}x{}, from {})",
                record.id, record.user_id, normalized.width, normalized.height, detected
            );
            Ok(id)
        }
        Err(e) => {
            // A blob without an ownership record must not survive.
            if let Err(cleanup) = state.blobs.delete(&id).await {
                error!("Failed to remove blob {} after ledger failure: {}", id, cleanup);
            }
            Err(AppError::Internal(e))
        }
    }
}

/// Serve a stored image by identifier.
async fn retrieve_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    // Parsing is the traversal defense: anything that is not 32 hex chars
    // never reaches the filesystem.
    let id: ImageId = id.parse().map_err(|_| AppError::NotFound)?;

    match state.blobs.get(&id).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response()),
        Err(BlobError::NotFound) => {
            info!("Image not found: {}", id);
            Err(AppError::NotFound)
        }
        Err(e) => Err(e.into()),
    }
}

/// List the ids of every image the current user owns.
async fn list_mine(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<Vec<ImageId>>, AppError> {
    let ids = state.images.list_by_owner(user_id).await?;
    Ok(Json(ids))
}

/// Delete an image owned by the current user.
///
/// Deleting an image someone else owns answers exactly like deleting an
/// image that does not exist.
async fn delete_image(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let id: ImageId = id.parse().map_err(|_| AppError::NotFound)?;

    // The ledger both authorizes and removes; only then is storage touched.
    match state.images.remove(&id, user_id).await? {
        RemoveOutcome::Removed => {}
        RemoveOutcome::NotFound => {
            warn!("Delete refused: image {} does not exist", id);
            return Err(AppError::NotFound);
        }
        RemoveOutcome::Forbidden => {
            warn!(
                "Delete refused: user {} does not own image {}",
                user_id, id
            );
            return Err(AppError::Forbidden);
        }
    }

    match state.blobs.delete(&id).await {
        Ok(()) => {}
        Err(BlobError::NotFound) => warn!("Blob already missing for image {}", id),
        Err(e) => return Err(e.into()),
    }

    info!("Image deleted: {}", id);
    Ok(Redirect::to("/mine"))
}

/// User login endpoint
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(credentials): Form<Credentials>,
) -> Result<(CookieJar, Redirect), AppError> {
    info!("Login attempt for user: {}", credentials.username);

    let user = state
        .users
        .find_by_username(&credentials.username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !state.users.verify_password(&user, &credentials.password)? {
        return Err(AppError::InvalidCredentials);
    }

    let token = state.sessions.create(user.id).await;
    Ok((jar.add(session_cookie(token)), Redirect::to("/")))
}

/// User registration endpoint
async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(credentials): Form<Credentials>,
) -> Result<(CookieJar, Redirect), AppError> {
    validation::validate_username(&credentials.username).map_err(AppError::BadRequest)?;
    validation::validate_password(&credentials.password).map_err(AppError::BadRequest)?;

    let user = state
        .users
        .create(&credentials.username, &credentials.password)
        .await?
        .ok_or(AppError::UsernameTaken)?;

    info!("User registered: {} at {}", user.username, user.registered_at);

    let token = state.sessions.create(user.id).await;
    Ok((jar.add(session_cookie(token)), Redirect::to("/")))
}

/// Revoke the current session.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.revoke(cookie.value()).await;
    }
    (jar.remove(Cookie::from(SESSION_COOKIE)), Redirect::to("/"))
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, UploadLimits};
    use crate::rate_limiter::{RateLimiter, RateLimiterConfig};
    use crate::repositories::{ImageRepository, UserRepository};
    use crate::session::SessionStore;
    use crate::storage::BlobStore;
    use common::database::{DatabaseConfig, init_pool, init_schema};
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::path::Path;
    use std::time::Duration;

    async fn test_state(blob_root: &Path) -> AppState {
        let config = AppConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            blob_root: blob_root.to_path_buf(),
            session_ttl_seconds: 3600,
            limits: UploadLimits {
                max_upload_bytes: 20 * 1024 * 1024,
                allowed_extensions: ["png", "jpg", "jpeg", "gif"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                allowed_mime_types: ["image/png", "image/jpeg", "image/gif"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                normalize_timeout: Duration::from_secs(30),
            },
        };

        let db_config = DatabaseConfig {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
        };
        let pool = init_pool(&db_config).await.expect("pool");
        init_schema(&pool).await.expect("schema");

        AppState {
            db_pool: pool.clone(),
            config,
            users: UserRepository::new(pool.clone()),
            images: ImageRepository::new(pool),
            blobs: BlobStore::open(blob_root).await.expect("blob store"),
            sessions: SessionStore::new(Duration::from_secs(3600)),
            rate_limiter: RateLimiter::new(RateLimiterConfig::default()),
        }
    }

    async fn test_user(state: &AppState, username: &str) -> Uuid {
        state
            .users
            .create(username, "a test password")
            .await
            .expect("create user")
            .expect("username free")
            .id
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 255]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).expect("encode png");
        buf.into_inner()
    }

    #[tokio::test]
    async fn test_ingest_stores_blob_and_ownership() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = test_state(dir.path()).await;
        let alice = test_user(&state, "alice").await;

        let id = ingest(&state, alice, "photo.png", png_bytes(64, 64))
            .await
            .expect("ingest");

        assert!(state.blobs.exists(&id).await);
        let mine = state.images.list_by_owner(alice).await.expect("list");
        assert_eq!(mine, vec![id]);
    }

    #[tokio::test]
    async fn test_reupload_yields_distinct_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = test_state(dir.path()).await;
        let alice = test_user(&state, "alice").await;

        let data = png_bytes(64, 64);
        let first = ingest(&state, alice, "photo.png", data.clone())
            .await
            .expect("ingest");
        let second = ingest(&state, alice, "photo.png", data).await.expect("ingest");

        assert_ne!(first, second);
        assert_eq!(state.images.list_by_owner(alice).await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn test_ingest_rejects_disallowed_extension_before_decode() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = test_state(dir.path()).await;
        let alice = test_user(&state, "alice").await;

        // Real PNG bytes, wrong extension: refused before any sniff or
        // decode work.
        let result = ingest(&state, alice, "photo.txt", png_bytes(8, 8)).await;
        assert!(matches!(result, Err(AppError::DisallowedExtension)));
        assert!(state.images.list_by_owner(alice).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_ingest_rejects_text_masquerading_as_image() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = test_state(dir.path()).await;
        let alice = test_user(&state, "alice").await;

        let result = ingest(&state, alice, "notes.jpg", b"just some text".to_vec()).await;
        assert!(matches!(result, Err(AppError::InvalidImageContent(_))));
        assert!(state.images.list_by_owner(alice).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_oversized_upload_is_downscaled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = test_state(dir.path()).await;
        let alice = test_user(&state, "alice").await;

        let id = ingest(&state, alice, "big.png", png_bytes(5000, 2000))
            .await
            .expect("ingest");

        let stored = state.blobs.get(&id).await.expect("blob");
        let decoded = image::ImageReader::new(Cursor::new(&stored))
            .with_guessed_format()
            .expect("guess")
            .decode()
            .expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (3840, 1536));
    }

    #[tokio::test]
    async fn test_delete_by_non_owner_looks_like_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = test_state(dir.path()).await;
        let alice = test_user(&state, "alice").await;
        let bob = test_user(&state, "bob").await;

        let id = ingest(&state, alice, "photo.png", png_bytes(16, 16))
            .await
            .expect("ingest");

        // Bob owns nothing here; the ledger refuses before storage is
        // touched.
        assert!(!state.images.is_owner(&id, bob).await.expect("check"));
        assert!(state.blobs.exists(&id).await);
        assert_eq!(
            state.images.remove(&id, bob).await.expect("remove"),
            RemoveOutcome::Forbidden
        );
    }
}
