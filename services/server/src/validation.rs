//! Upload and account input validation

use regex::Regex;
use std::sync::OnceLock;

use crate::error::AppError;

/// Check the filename extension against the allow-list.
///
/// This is a fast pre-filter only; it never authorizes content. The real
/// media-type decision is [`sniff_image`].
pub fn check_extension(filename: &str, allowed: &[String]) -> Result<(), AppError> {
    if filename.is_empty() {
        return Err(AppError::EmptyFilename);
    }

    match filename.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_ascii_lowercase();
            if allowed.iter().any(|a| *a == ext) {
                Ok(())
            } else {
                Err(AppError::DisallowedExtension)
            }
        }
        None => Err(AppError::DisallowedExtension),
    }
}

/// Classify the true media type of the payload from its magic bytes and
/// check it against the allow-list. The filename plays no part here.
///
/// Returns the detected MIME type for logging.
pub fn sniff_image(data: &[u8], allowed_mime: &[String]) -> Result<&'static str, AppError> {
    if data.is_empty() {
        return Err(AppError::InvalidImageContent("empty payload"));
    }

    let Some(kind) = infer::get(data) else {
        return Err(AppError::InvalidImageContent("unrecognized content"));
    };

    let mime = kind.mime_type();
    if allowed_mime.iter().any(|m| m == mime) {
        Ok(mime)
    } else {
        Err(AppError::InvalidImageContent("disallowed content type"))
    }
}

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if username.len() > 32 {
        return Err("Username must be at most 32 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err("Username can only contain letters, numbers, and underscores".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}
