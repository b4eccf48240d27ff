//! Repeater instance models and DTOs.

use analog_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `repeater_instances` table, with the ids of its values.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RepeaterInstance {
    pub id: DbId,
    pub group_id: DbId,
    pub owner_id: DbId,
    pub position: i32,
    pub values: Vec<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Request body for `PUT /api/v1/repeaters/positions`.
///
/// `ids` lists every instance of the group for the owner, in the new order.
#[derive(Debug, Clone, Deserialize)]
pub struct ReorderRepeaters {
    pub group_id: DbId,
    pub owner_id: DbId,
    pub ids: Vec<DbId>,
}
