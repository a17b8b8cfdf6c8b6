//! Opaque image identifiers
//!
//! Identifiers are 128-bit random tokens rendered as 32 lowercase hex
//! characters. They are generated server-side and never derived from client
//! input, so they cannot be guessed or enumerated. Parsing validates the
//! charset and length, which also makes a parsed identifier safe to use as
//! a file name.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Length of an identifier in hex characters
pub const ID_LEN: usize = 32;

/// Opaque identifier naming one stored image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ImageId(String);

/// Error returned when client-supplied input is not a valid identifier
#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed image identifier")]
pub struct InvalidImageId;

impl ImageId {
    /// Allocate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ImageId {
    type Err = InvalidImageId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_only = s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if s.len() == ID_LEN && hex_only {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidImageId)
        }
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
