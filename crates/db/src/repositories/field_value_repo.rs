//! Repository for the `field_values` table.
//!
//! Writes come in batches from one form submission, so the write methods
//! take an open transaction and send each batch as a single `UNNEST`
//! statement.

use std::collections::HashMap;

use analog_core::types::DbId;
use sqlx::PgPool;

use crate::models::field_value::{FieldValue, FieldValueDetail, FieldValuePatch, NewFieldValue};

/// Column list for `field_values` queries.
const COLUMNS: &str = "id, field_id, group_id, owner_id, value, media_id, in_repeater, \
    repeater_instance_id, created_at, updated_at";

/// Values joined with their definition, group and media file.
const DETAIL_SELECT: &str = "\
    SELECT v.id, v.field_id, v.group_id, v.owner_id, v.value, v.media_id, \
           v.in_repeater, v.repeater_instance_id, \
           f.slug AS field_slug, f.title AS field_title, f.field_type, \
           g.slug AS group_slug, g.active AS group_active, g.repeater AS group_repeater, \
           m.path AS media_path \
    FROM field_values v \
    JOIN fields f ON f.id = v.field_id \
    JOIN field_groups g ON g.id = v.group_id \
    LEFT JOIN media m ON m.id = v.media_id";

/// Provides read and batch-write operations for stored field values.
pub struct FieldValueRepo;

impl FieldValueRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<FieldValue>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM field_values WHERE id = $1");
        sqlx::query_as::<_, FieldValue>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Plain (non-repeater) values of one owner.
    pub async fn list_plain_details(
        pool: &PgPool,
        owner_id: DbId,
    ) -> Result<Vec<FieldValueDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT} \
             WHERE v.owner_id = $1 AND NOT v.in_repeater \
             ORDER BY g.id, f.position, f.id"
        );
        sqlx::query_as::<_, FieldValueDetail>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    /// Every value of one owner, repeater values included.
    pub async fn list_details_for_owner(
        pool: &PgPool,
        owner_id: DbId,
    ) -> Result<Vec<FieldValueDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT} \
             WHERE v.owner_id = $1 \
             ORDER BY g.id, f.position, f.id, v.id"
        );
        sqlx::query_as::<_, FieldValueDetail>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    /// Values belonging to the given repeater instances, ordered by
    /// instance then field position.
    pub async fn list_details_for_instances(
        pool: &PgPool,
        instance_ids: &[DbId],
    ) -> Result<Vec<FieldValueDetail>, sqlx::Error> {
        if instance_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "{DETAIL_SELECT} \
             WHERE v.repeater_instance_id = ANY($1) \
             ORDER BY v.repeater_instance_id, f.position, f.id"
        );
        sqlx::query_as::<_, FieldValueDetail>(&query)
            .bind(instance_ids)
            .fetch_all(pool)
            .await
    }

    /// Insert or update plain values of an owner.
    ///
    /// An existing plain value for the same field is updated in place;
    /// `None` columns keep their stored content. When one batch names a
    /// field twice the last entry wins.
    pub async fn upsert_plain_in(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        owner_id: DbId,
        values: &[NewFieldValue],
    ) -> Result<Vec<FieldValue>, sqlx::Error> {
        let values = dedupe_by_field(values);
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let (field_ids, group_ids, texts, media_ids) = unzip_new(&values);

        let query = format!(
            "INSERT INTO field_values (field_id, group_id, owner_id, value, media_id, in_repeater) \
             SELECT t.field_id, t.group_id, $5, t.value, t.media_id, FALSE \
             FROM UNNEST($1::bigint[], $2::bigint[], $3::text[], $4::bigint[]) \
                  AS t(field_id, group_id, value, media_id) \
             ON CONFLICT (owner_id, field_id) WHERE NOT in_repeater DO UPDATE SET \
                 value = COALESCE(EXCLUDED.value, field_values.value), \
                 media_id = COALESCE(EXCLUDED.media_id, field_values.media_id) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FieldValue>(&query)
            .bind(&field_ids)
            .bind(&group_ids)
            .bind(&texts)
            .bind(&media_ids)
            .bind(owner_id)
            .fetch_all(&mut **tx)
            .await
    }

    /// Insert the values of one repeater instance.
    pub async fn insert_for_instance_in(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        owner_id: DbId,
        instance_id: DbId,
        values: &[NewFieldValue],
    ) -> Result<Vec<FieldValue>, sqlx::Error> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let (field_ids, group_ids, texts, media_ids) = unzip_new(values);

        let query = format!(
            "INSERT INTO field_values \
                 (field_id, group_id, owner_id, value, media_id, in_repeater, repeater_instance_id) \
             SELECT t.field_id, t.group_id, $5, t.value, t.media_id, TRUE, $6 \
             FROM UNNEST($1::bigint[], $2::bigint[], $3::text[], $4::bigint[]) \
                  WITH ORDINALITY AS t(field_id, group_id, value, media_id, ord) \
             ORDER BY t.ord \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FieldValue>(&query)
            .bind(&field_ids)
            .bind(&group_ids)
            .bind(&texts)
            .bind(&media_ids)
            .bind(owner_id)
            .bind(instance_id)
            .fetch_all(&mut **tx)
            .await
    }

    /// `(id, field_id)` of those `ids` that are values of `owner_id`.
    pub async fn owned_field_ids(
        pool: &PgPool,
        owner_id: DbId,
        ids: &[DbId],
    ) -> Result<Vec<(DbId, DbId)>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as(
            "SELECT id, field_id FROM field_values WHERE owner_id = $1 AND id = ANY($2)",
        )
        .bind(owner_id)
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Apply patches to stored values of `owner_id`. `None` columns keep
    /// their stored content; ids belonging to other owners are skipped.
    ///
    /// Returns the updated rows.
    pub async fn update_batch_in(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        owner_id: DbId,
        patches: &[FieldValuePatch],
    ) -> Result<Vec<FieldValue>, sqlx::Error> {
        if patches.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<DbId> = patches.iter().map(|p| p.id).collect();
        let texts: Vec<Option<String>> = patches.iter().map(|p| p.value.clone()).collect();
        let media_ids: Vec<Option<DbId>> = patches.iter().map(|p| p.media_id).collect();

        let query = format!(
            "UPDATE field_values v SET \
                 value = COALESCE(t.value, v.value), \
                 media_id = COALESCE(t.media_id, v.media_id) \
             FROM UNNEST($1::bigint[], $2::text[], $3::bigint[]) AS t(id, value, media_id) \
             WHERE v.id = t.id AND v.owner_id = $4 \
             RETURNING {}",
            qualified_columns("v"),
        );
        sqlx::query_as::<_, FieldValue>(&query)
            .bind(&ids)
            .bind(&texts)
            .bind(&media_ids)
            .bind(owner_id)
            .fetch_all(&mut **tx)
            .await
    }

    /// Drop the file from a stored value, leaving an empty value.
    ///
    /// Returns `None` if the value does not exist.
    pub async fn clear_file(pool: &PgPool, id: DbId) -> Result<Option<FieldValue>, sqlx::Error> {
        let query = format!(
            "UPDATE field_values SET value = '', media_id = NULL \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FieldValue>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Delete every value of an owner. Returns the number of rows removed.
    pub async fn delete_for_owner_in(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        owner_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM field_values WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Keep the last entry per field, in first-seen order. `ON CONFLICT` cannot
/// touch the same row twice in one statement.
fn dedupe_by_field(values: &[NewFieldValue]) -> Vec<NewFieldValue> {
    let mut order: Vec<DbId> = Vec::new();
    let mut latest: HashMap<DbId, &NewFieldValue> = HashMap::new();
    for value in values {
        if latest.insert(value.field_id, value).is_none() {
            order.push(value.field_id);
        }
    }
    order
        .into_iter()
        .filter_map(|id| latest.get(&id).map(|v| (*v).clone()))
        .collect()
}

type NewColumns = (Vec<DbId>, Vec<DbId>, Vec<Option<String>>, Vec<Option<DbId>>);

fn unzip_new(values: &[NewFieldValue]) -> NewColumns {
    let mut columns: NewColumns = (
        Vec::with_capacity(values.len()),
        Vec::with_capacity(values.len()),
        Vec::with_capacity(values.len()),
        Vec::with_capacity(values.len()),
    );
    for value in values {
        columns.0.push(value.field_id);
        columns.1.push(value.group_id);
        columns.2.push(value.value.clone());
        columns.3.push(value.media_id);
    }
    columns
}

fn qualified_columns(alias: &str) -> String {
    COLUMNS
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_value(field_id: DbId, value: &str) -> NewFieldValue {
        NewFieldValue {
            field_id,
            group_id: 1,
            value: Some(value.into()),
            media_id: None,
        }
    }

    #[test]
    fn dedupe_keeps_last_entry_per_field() {
        let deduped = dedupe_by_field(&[
            new_value(1, "a"),
            new_value(2, "b"),
            new_value(1, "c"),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].field_id, 1);
        assert_eq!(deduped[0].value.as_deref(), Some("c"));
        assert_eq!(deduped[1].value.as_deref(), Some("b"));
    }

    #[test]
    fn qualified_columns_prefixes_every_column() {
        let cols = qualified_columns("v");
        assert!(cols.starts_with("v.id, v.field_id"));
        assert!(cols.ends_with("v.updated_at"));
    }
}
