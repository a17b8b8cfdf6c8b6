//! Rate limiter for bounding upload frequency

use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of attempts inside one window
    pub max_attempts: u32,
    /// Window length in seconds
    pub window_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 40,
            window_seconds: 60,
        }
    }
}

impl RateLimiterConfig {
    /// Create a new RateLimiterConfig from environment variables
    ///
    /// # Environment Variables
    /// - `UPLOAD_RATE_LIMIT`: attempts per window (default: 40)
    /// - `UPLOAD_RATE_WINDOW_SECONDS`: window length (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_attempts = env::var("UPLOAD_RATE_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_attempts);
        let window_seconds = env::var("UPLOAD_RATE_WINDOW_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.window_seconds);

        Self {
            max_attempts,
            window_seconds,
        }
    }
}

/// Rate limiter entry
#[derive(Debug)]
struct RateLimiterEntry {
    /// Attempts counted in the current window
    attempts: u32,
    /// Start of the current window
    window_start: Instant,
}

/// Process-local rate limiter; state resets with the process.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check whether `key` may make another attempt, counting this call as
    /// one when allowed.
    pub async fn is_allowed(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            attempts: 0,
            window_start: now,
        });

        // Check if the window has elapsed
        if now.duration_since(entry.window_start) >= Duration::from_secs(self.config.window_seconds)
        {
            entry.attempts = 0;
            entry.window_start = now;
        }

        if entry.attempts >= self.config.max_attempts {
            info!("Rate limit reached for key {}", key);
            return false;
        }

        entry.attempts += 1;
        true
    }
}
