//! Image ownership record

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::ids::ImageId;

/// One uploaded image and its owner
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub id: ImageId,
    pub user_id: Uuid,
    pub uploaded_at: DateTime<Utc>,
}
