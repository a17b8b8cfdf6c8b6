//! Request-level error types for the pixelbin service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::storage::BlobError;

/// Everything that can go wrong while serving a request
#[derive(Error, Debug)]
pub enum AppError {
    /// The multipart form carried no file field
    #[error("No file uploaded")]
    NoFile,

    /// The file field carried no filename
    #[error("Empty file name")]
    EmptyFilename,

    /// The filename extension is not on the allow-list
    #[error("File extension not allowed")]
    DisallowedExtension,

    /// The payload bytes are not an allowed raster image type
    #[error("Invalid image content: {0}")]
    InvalidImageContent(&'static str),

    /// The payload sniffed as an image but could not be decoded
    #[error("Image data could not be decoded")]
    DecodeError,

    /// The payload exceeds the upload size cap
    #[error("File too large (max: {max_bytes} bytes)")]
    EntityTooLarge { max_bytes: usize },

    /// Too many uploads inside the rate window
    #[error("Too many uploads, try again later")]
    RateLimited,

    /// No valid session
    #[error("Unauthorized")]
    Unauthorized,

    /// The image exists but belongs to another user. Responds exactly like
    /// NotFound so ownership is never revealed.
    #[error("Image not found")]
    Forbidden,

    /// No such image
    #[error("Image not found")]
    NotFound,

    /// Normalization exceeded its processing budget
    #[error("Image processing timed out")]
    ProcessingTimeout,

    /// Login with a wrong username or password
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Registration with a username that already exists
    #[error("Username already taken")]
    UsernameTaken,

    /// Malformed request input
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Database failure
    #[error("Internal server error")]
    Database(#[from] common::error::DatabaseError),

    /// Blob store I/O failure
    #[error("Internal server error")]
    Storage(#[source] std::io::Error),

    /// Anything else that should never reach the client in detail
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<BlobError> for AppError {
    fn from(e: BlobError) -> Self {
        match e {
            BlobError::NotFound => AppError::NotFound,
            BlobError::Io(io) => AppError::Storage(io),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NoFile
            | AppError::EmptyFilename
            | AppError::InvalidImageContent(_)
            | AppError::DecodeError
            | AppError::ProcessingTimeout
            | AppError::UsernameTaken
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::DisallowedExtension => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::EntityTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden | AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Storage(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        match &self {
            AppError::Database(e) => error!("Database error: {}", e),
            AppError::Storage(e) => error!("Storage error: {}", e),
            AppError::Internal(e) => error!("Internal error: {:#}", e),
            _ => {}
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
