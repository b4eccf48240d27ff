//! Repository for the `media` table.

use analog_core::types::DbId;
use sqlx::PgPool;

use crate::models::media::{CreateMedia, Media};

/// Column list for `media` queries.
const COLUMNS: &str = "id, file_name, path, content_type, size_bytes, created_at, updated_at";

/// Provides CRUD operations for stored files.
pub struct MediaRepo;

impl MediaRepo {
    /// Record a file that has been written to storage.
    pub async fn create(pool: &PgPool, input: &CreateMedia) -> Result<Media, sqlx::Error> {
        let query = format!(
            "INSERT INTO media (file_name, path, content_type, size_bytes) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Media>(&query)
            .bind(&input.file_name)
            .bind(&input.path)
            .bind(&input.content_type)
            .bind(input.size_bytes)
            .fetch_one(pool)
            .await
    }

    /// Record a stored file as part of a larger write.
    pub async fn create_in(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        input: &CreateMedia,
    ) -> Result<Media, sqlx::Error> {
        let query = format!(
            "INSERT INTO media (file_name, path, content_type, size_bytes) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Media>(&query)
            .bind(&input.file_name)
            .bind(&input.path)
            .bind(&input.content_type)
            .bind(input.size_bytes)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Media>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM media WHERE id = $1");
        sqlx::query_as::<_, Media>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a media record. Field values pointing at it lose their file
    /// reference (`ON DELETE SET NULL`).
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM media WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
