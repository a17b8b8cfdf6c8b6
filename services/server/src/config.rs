//! Service configuration loaded from environment variables

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Limits applied to a single upload request
#[derive(Debug, Clone)]
pub struct UploadLimits {
    /// Maximum accepted payload size in bytes
    pub max_upload_bytes: usize,
    /// Filename extensions accepted by the pre-filter
    pub allowed_extensions: Vec<String>,
    /// MIME types accepted by the content sniffer
    pub allowed_mime_types: Vec<String>,
    /// Wall-clock budget for the decode/resize/encode work of one upload
    pub normalize_timeout: Duration,
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: String,
    /// Directory holding the stored image blobs
    pub blob_root: PathBuf,
    /// Session lifetime in seconds
    pub session_ttl_seconds: u64,
    /// Upload limits
    pub limits: UploadLimits,
}

impl AppConfig {
    /// Create a new AppConfig from environment variables
    ///
    /// # Environment Variables
    /// - `BIND_ADDR`: listener address (default: "0.0.0.0:8081")
    /// - `BLOB_ROOT`: image blob directory (default: "data/images")
    /// - `SESSION_TTL_SECONDS`: session lifetime (default: 7 days)
    /// - `MAX_UPLOAD_BYTES`: upload size cap (default: 20 MiB)
    /// - `ALLOWED_EXTENSIONS`: comma-separated extension allow-list
    ///   (default: "png,jpg,jpeg,gif")
    /// - `ALLOWED_MIME_TYPES`: comma-separated sniffed-type allow-list
    ///   (default: "image/png,image/jpeg,image/gif")
    /// - `NORMALIZE_TIMEOUT_SECONDS`: processing budget (default: 10)
    pub fn from_env() -> Self {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8081".to_string());
        let blob_root =
            PathBuf::from(env::var("BLOB_ROOT").unwrap_or_else(|_| "data/images".to_string()));
        let session_ttl_seconds = parse_env("SESSION_TTL_SECONDS", 604_800);

        let limits = UploadLimits {
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 20 * 1024 * 1024),
            allowed_extensions: list_env("ALLOWED_EXTENSIONS", "png,jpg,jpeg,gif"),
            allowed_mime_types: list_env("ALLOWED_MIME_TYPES", "image/png,image/jpeg,image/gif"),
            normalize_timeout: Duration::from_secs(parse_env("NORMALIZE_TIMEOUT_SECONDS", 10)),
        };

        Self {
            bind_addr,
            blob_root,
            session_ttl_seconds,
            limits,
        }
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn list_env(key: &str, default: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
