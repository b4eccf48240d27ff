//! Repository for the `field_groups` table.
//!
//! Deleting a group cascades through foreign keys to its field definitions,
//! repeater instances and stored values in a single statement.

use analog_core::field_group::BulkGroupAction;
use analog_core::listing::{resolve_sort_column, Pagination};
use analog_core::types::DbId;
use sqlx::PgPool;

use crate::models::field_group::{
    FieldGroup, FieldGroupListParams, FieldGroupPage, FieldGroupSettings,
};

/// Column list for `field_groups` queries; expects the table aliased as `g`.
const COLUMNS: &str = "\
    g.id, g.name, g.slug, g.active, g.repeater, g.sortable, g.recipient, g.condition, \
    ARRAY(SELECT f.id FROM fields f WHERE f.group_id = g.id ORDER BY f.position, f.id) AS fields, \
    ARRAY(SELECT r.id FROM repeater_instances r WHERE r.group_id = g.id ORDER BY r.position, r.id) AS repeaters, \
    g.created_at, g.updated_at";

/// Columns the admin listing may sort by.
const SORTABLE_COLUMNS: &[&str] = &[
    "name",
    "slug",
    "recipient",
    "condition",
    "active",
    "repeater",
    "created_at",
    "updated_at",
];

/// Filter shared by the listing and its count query. `$1` is the search
/// pattern or NULL.
const SEARCH_FILTER: &str = "\
    ($1::text IS NULL \
     OR g.name ILIKE $1 OR g.slug ILIKE $1 \
     OR g.recipient ILIKE $1 OR g.condition ILIKE $1)";

/// Provides CRUD operations for field groups.
pub struct FieldGroupRepo;

impl FieldGroupRepo {
    /// Insert a new field group.
    pub async fn create(
        pool: &PgPool,
        settings: &FieldGroupSettings,
    ) -> Result<FieldGroup, sqlx::Error> {
        let query = format!(
            "WITH g AS ( \
                 INSERT INTO field_groups \
                     (name, slug, active, repeater, sortable, recipient, condition) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 RETURNING * \
             ) \
             SELECT {COLUMNS} FROM g"
        );
        sqlx::query_as::<_, FieldGroup>(&query)
            .bind(&settings.name)
            .bind(&settings.slug)
            .bind(settings.active)
            .bind(settings.repeater)
            .bind(settings.sortable)
            .bind(settings.binding.recipient())
            .bind(settings.binding.condition())
            .fetch_one(pool)
            .await
    }

    /// Find a field group by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<FieldGroup>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM field_groups g WHERE g.id = $1");
        sqlx::query_as::<_, FieldGroup>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Active groups bound to `recipient`, plus active groups bound to
    /// `template` when one is given.
    pub async fn list_applicable(
        pool: &PgPool,
        recipient: &str,
        template: Option<&str>,
    ) -> Result<Vec<FieldGroup>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM field_groups g \
             WHERE g.active \
               AND (g.recipient = $1 \
                    OR (g.recipient = 'Template' AND g.condition = $2)) \
             ORDER BY g.id"
        );
        sqlx::query_as::<_, FieldGroup>(&query)
            .bind(recipient)
            .bind(template)
            .fetch_all(pool)
            .await
    }

    /// Paginated, searchable, sortable listing for the admin index.
    pub async fn list(
        pool: &PgPool,
        params: &FieldGroupListParams,
    ) -> Result<FieldGroupPage, RepoError> {
        let column = resolve_sort_column(params.order_by.as_deref(), SORTABLE_COLUMNS, "created_at")?;
        let direction = params.sort.unwrap_or_default();
        let pagination = Pagination::new(params.page, params.limit);
        let pattern = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let count_query = format!("SELECT COUNT(*) FROM field_groups g WHERE {SEARCH_FILTER}");
        let total: (i64,) = sqlx::query_as(&count_query)
            .bind(pattern.as_deref())
            .fetch_one(pool)
            .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM field_groups g \
             WHERE {SEARCH_FILTER} \
             ORDER BY g.{column} {dir}, g.id \
             LIMIT $2 OFFSET $3",
            dir = direction.as_sql(),
        );
        let items = sqlx::query_as::<_, FieldGroup>(&query)
            .bind(pattern.as_deref())
            .bind(pagination.limit)
            .bind(pagination.offset)
            .fetch_all(pool)
            .await?;

        Ok(FieldGroupPage {
            items,
            total: total.0,
            page: pagination.page,
            limit: pagination.limit,
            page_count: pagination.page_count(total.0),
            next_sort: direction.swapped(),
        })
    }

    /// Overwrite a field group's settings.
    ///
    /// Returns `None` if no group with the given ID exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        settings: &FieldGroupSettings,
    ) -> Result<Option<FieldGroup>, sqlx::Error> {
        let query = format!(
            "WITH g AS ( \
                 UPDATE field_groups SET \
                     name = $2, slug = $3, active = $4, repeater = $5, \
                     sortable = $6, recipient = $7, condition = $8 \
                 WHERE id = $1 \
                 RETURNING * \
             ) \
             SELECT {COLUMNS} FROM g"
        );
        sqlx::query_as::<_, FieldGroup>(&query)
            .bind(id)
            .bind(&settings.name)
            .bind(&settings.slug)
            .bind(settings.active)
            .bind(settings.repeater)
            .bind(settings.sortable)
            .bind(settings.binding.recipient())
            .bind(settings.binding.condition())
            .fetch_optional(pool)
            .await
    }

    /// Apply one bulk action to every listed group.
    ///
    /// Returns the number of groups affected. Rebinding actions must carry a
    /// valid binding; callers validate with [`BulkGroupAction::binding`].
    pub async fn bulk_apply(
        pool: &PgPool,
        ids: &[DbId],
        action: &BulkGroupAction,
    ) -> Result<u64, RepoError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = match action {
            BulkGroupAction::Activate | BulkGroupAction::Deactivate => {
                sqlx::query("UPDATE field_groups SET active = $2 WHERE id = ANY($1)")
                    .bind(ids)
                    .bind(matches!(action, BulkGroupAction::Activate))
                    .execute(pool)
                    .await?
            }
            BulkGroupAction::EnableRepeater => {
                sqlx::query("UPDATE field_groups SET repeater = TRUE WHERE id = ANY($1)")
                    .bind(ids)
                    .execute(pool)
                    .await?
            }
            BulkGroupAction::DisableRepeater => sqlx::query(
                "UPDATE field_groups SET repeater = FALSE, sortable = FALSE WHERE id = ANY($1)",
            )
            .bind(ids)
            .execute(pool)
            .await?,
            BulkGroupAction::ApplyTemplate { .. } | BulkGroupAction::ApplyContentType { .. } => {
                let binding = action.binding()?.ok_or_else(|| {
                    analog_core::error::CoreError::Internal("rebind action without binding".into())
                })?;
                sqlx::query(
                    "UPDATE field_groups SET recipient = $2, condition = $3 WHERE id = ANY($1)",
                )
                .bind(ids)
                .bind(binding.recipient())
                .bind(binding.condition())
                .execute(pool)
                .await?
            }
            BulkGroupAction::Delete => {
                sqlx::query("DELETE FROM field_groups WHERE id = ANY($1)")
                    .bind(ids)
                    .execute(pool)
                    .await?
            }
        };

        Ok(result.rows_affected())
    }

    /// Delete a field group and, through cascading foreign keys, its field
    /// definitions, repeater instances and stored values.
    ///
    /// Returns `true` if a group was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM field_groups WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Failure of a repository call that validates input before querying.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Core(#[from] analog_core::error::CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Escape LIKE wildcards so a search term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
