//! Repository for the `repeater_instances` table.

use analog_core::types::DbId;
use sqlx::PgPool;

use crate::models::repeater::RepeaterInstance;

/// Column list for `repeater_instances` queries; expects the table aliased
/// as `r`.
const COLUMNS: &str = "\
    r.id, r.group_id, r.owner_id, r.position, \
    ARRAY(SELECT v.id FROM field_values v WHERE v.repeater_instance_id = r.id ORDER BY v.id) AS \"values\", \
    r.created_at, r.updated_at";

/// Provides CRUD operations for repeater instances.
pub struct RepeaterRepo;

impl RepeaterRepo {
    /// Open a new instance at the end of the owner's list for `group_id`.
    pub async fn create_in(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        group_id: DbId,
        owner_id: DbId,
    ) -> Result<RepeaterInstance, sqlx::Error> {
        let query = format!(
            "WITH r AS ( \
                 INSERT INTO repeater_instances (group_id, owner_id, position) \
                 SELECT $1, $2, COALESCE(MAX(position), 0) + 1 \
                 FROM repeater_instances WHERE group_id = $1 AND owner_id = $2 \
                 RETURNING * \
             ) \
             SELECT {COLUMNS} FROM r"
        );
        sqlx::query_as::<_, RepeaterInstance>(&query)
            .bind(group_id)
            .bind(owner_id)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<RepeaterInstance>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM repeater_instances r WHERE r.id = $1");
        sqlx::query_as::<_, RepeaterInstance>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Read an instance inside a transaction, seeing values written earlier
    /// in that transaction.
    pub async fn find_by_id_in(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
    ) -> Result<Option<RepeaterInstance>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM repeater_instances r WHERE r.id = $1");
        sqlx::query_as::<_, RepeaterInstance>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Instances of the given groups for one owner, in display order.
    pub async fn list_for_owner(
        pool: &PgPool,
        owner_id: DbId,
        group_ids: &[DbId],
    ) -> Result<Vec<RepeaterInstance>, sqlx::Error> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM repeater_instances r \
             WHERE r.owner_id = $1 AND r.group_id = ANY($2) \
             ORDER BY r.group_id, r.position, r.id"
        );
        sqlx::query_as::<_, RepeaterInstance>(&query)
            .bind(owner_id)
            .bind(group_ids)
            .fetch_all(pool)
            .await
    }

    /// Lock and return the ids of an owner's instances of one group.
    pub async fn ids_for_owner_in(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        group_id: DbId,
        owner_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT id FROM repeater_instances \
             WHERE group_id = $1 AND owner_id = $2 \
             ORDER BY position, id \
             FOR UPDATE",
        )
        .bind(group_id)
        .bind(owner_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Number the given instances 1..n in slice order.
    pub async fn set_positions_in(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        ordered_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        if ordered_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE repeater_instances r SET position = t.ord \
             FROM UNNEST($1::bigint[]) WITH ORDINALITY AS t(id, ord) \
             WHERE r.id = t.id",
        )
        .bind(ordered_ids)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete an instance together with its values.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM repeater_instances WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every instance of an owner. Returns the number removed.
    pub async fn delete_for_owner_in(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        owner_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM repeater_instances WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }
}
