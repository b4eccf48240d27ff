//! Stored custom-field values.

use analog_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `field_values` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FieldValue {
    pub id: DbId,
    pub field_id: DbId,
    pub group_id: DbId,
    pub owner_id: DbId,
    pub value: Option<String>,
    pub media_id: Option<DbId>,
    pub in_repeater: bool,
    pub repeater_instance_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A stored value joined with its field definition, its group and the
/// path of its media file.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FieldValueDetail {
    pub id: DbId,
    pub field_id: DbId,
    pub group_id: DbId,
    pub owner_id: DbId,
    pub value: Option<String>,
    pub media_id: Option<DbId>,
    pub in_repeater: bool,
    pub repeater_instance_id: Option<DbId>,
    pub field_slug: String,
    pub field_title: String,
    pub field_type: String,
    pub group_slug: String,
    pub group_active: bool,
    pub group_repeater: bool,
    pub media_path: Option<String>,
}

impl FieldValueDetail {
    /// The value to show: the media path when a file is attached, the raw
    /// value otherwise.
    pub fn resolved(&self) -> Option<&str> {
        self.media_path.as_deref().or(self.value.as_deref())
    }

    pub fn is_file(&self) -> bool {
        self.media_id.is_some()
    }
}

/// A value to insert. `None` columns are stored as NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFieldValue {
    pub field_id: DbId,
    pub group_id: DbId,
    pub value: Option<String>,
    pub media_id: Option<DbId>,
}

/// A change to a stored value. `None` columns are left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValuePatch {
    pub id: DbId,
    pub value: Option<String>,
    pub media_id: Option<DbId>,
}
