//! Repository for the `fields` table.

use analog_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::field::{Field, FieldSettings};

/// Column list for `fields` queries.
const COLUMNS: &str = "id, group_id, title, slug, field_type, description, required, \
    default_val, parameters, position, created_at, updated_at";

/// Provides CRUD operations for field definitions.
pub struct FieldRepo;

impl FieldRepo {
    /// Append a field definition to a group. It takes the next position
    /// after the group's current last field.
    pub async fn create(
        pool: &PgPool,
        group_id: DbId,
        settings: &FieldSettings,
    ) -> Result<Field, sqlx::Error> {
        let query = format!(
            "INSERT INTO fields \
                 (group_id, title, slug, field_type, description, required, \
                  default_val, parameters, position) \
             SELECT $1, $2, $3, $4, $5, $6, $7, $8, COALESCE(MAX(position), 0) + 1 \
             FROM fields WHERE group_id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Field>(&query)
            .bind(group_id)
            .bind(&settings.title)
            .bind(&settings.slug)
            .bind(settings.field_type.as_str())
            .bind(&settings.description)
            .bind(settings.required)
            .bind(&settings.default_val)
            .bind(Json(&settings.parameters))
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Field>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM fields WHERE id = $1");
        sqlx::query_as::<_, Field>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Load several definitions at once. Unknown ids are skipped.
    pub async fn find_many(pool: &PgPool, ids: &[DbId]) -> Result<Vec<Field>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!("SELECT {COLUMNS} FROM fields WHERE id = ANY($1) ORDER BY id");
        sqlx::query_as::<_, Field>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Fields of one group in display order.
    pub async fn list_by_group(pool: &PgPool, group_id: DbId) -> Result<Vec<Field>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM fields WHERE group_id = $1 ORDER BY position, id"
        );
        sqlx::query_as::<_, Field>(&query)
            .bind(group_id)
            .fetch_all(pool)
            .await
    }

    /// Fields of several groups, ordered by group then display order.
    pub async fn list_by_groups(
        pool: &PgPool,
        group_ids: &[DbId],
    ) -> Result<Vec<Field>, sqlx::Error> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM fields \
             WHERE group_id = ANY($1) \
             ORDER BY group_id, position, id"
        );
        sqlx::query_as::<_, Field>(&query)
            .bind(group_ids)
            .fetch_all(pool)
            .await
    }

    /// Overwrite a field definition. The type and owning group never change.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        settings: &FieldSettings,
    ) -> Result<Option<Field>, sqlx::Error> {
        let query = format!(
            "UPDATE fields SET \
                 title = $2, slug = $3, description = $4, required = $5, \
                 default_val = $6, parameters = $7 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Field>(&query)
            .bind(id)
            .bind(&settings.title)
            .bind(&settings.slug)
            .bind(&settings.description)
            .bind(settings.required)
            .bind(&settings.default_val)
            .bind(Json(&settings.parameters))
            .fetch_optional(pool)
            .await
    }

    /// Delete a field definition together with every value stored for it.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM fields WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
