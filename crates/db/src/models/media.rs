//! Stored file records.

use analog_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `media` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Media {
    pub id: DbId,
    pub file_name: String,
    pub path: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording a file that has already been written to storage.
#[derive(Debug, Clone)]
pub struct CreateMedia {
    pub file_name: String,
    pub path: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
}
