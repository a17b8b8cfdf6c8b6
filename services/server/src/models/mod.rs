//! Service models

pub mod image;
pub mod user;

// Re-export for convenience
pub use image::ImageRecord;
pub use user::{Credentials, User};
