//! Repositories for database operations

pub mod image;
pub mod user;

// Re-export for convenience
pub use image::{ImageRepository, RemoveOutcome};
pub use user::UserRepository;
