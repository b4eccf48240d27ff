//! Field group models and DTOs.

use analog_core::error::CoreError;
use analog_core::field_group::{
    normalize_sortable, validate_group_name, BulkGroupAction, GroupBinding,
};
use analog_core::listing::SortDirection;
use analog_core::slug::{slug_or_derive, slugify, validate_slug};
use analog_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `field_groups` table, with the ids of its field
/// definitions (in display order) and of its repeater instances.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FieldGroup {
    pub id: DbId,
    pub name: String,
    pub slug: String,
    pub active: bool,
    pub repeater: bool,
    pub sortable: bool,
    pub recipient: String,
    pub condition: Option<String>,
    pub fields: Vec<DbId>,
    pub repeaters: Vec<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl FieldGroup {
    pub fn binding(&self) -> Result<GroupBinding, CoreError> {
        GroupBinding::resolve(&self.recipient, self.condition.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Normalized settings (what the repository writes)
// ---------------------------------------------------------------------------

/// Validated, invariant-respecting column values for a field group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldGroupSettings {
    pub name: String,
    pub slug: String,
    pub active: bool,
    pub repeater: bool,
    pub sortable: bool,
    pub binding: GroupBinding,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// DTO for creating a field group. The slug is derived from the name.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateFieldGroup {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub recipient: String,
    pub condition: Option<String>,
    pub active: Option<bool>,
    pub repeater: Option<bool>,
    pub sortable: Option<bool>,
}

impl CreateFieldGroup {
    pub fn normalize(&self) -> Result<FieldGroupSettings, CoreError> {
        validate_group_name(&self.name)?;
        let repeater = self.repeater.unwrap_or(false);
        Ok(FieldGroupSettings {
            name: self.name.trim().to_string(),
            slug: slug_or_derive(None, &self.name)?,
            active: self.active.unwrap_or(true),
            repeater,
            sortable: normalize_sortable(repeater, self.sortable.unwrap_or(false)),
            binding: GroupBinding::resolve(&self.recipient, self.condition.as_deref())?,
        })
    }
}

/// DTO for updating a field group. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateFieldGroup {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub slug: Option<String>,
    pub recipient: Option<String>,
    pub condition: Option<String>,
    pub active: Option<bool>,
    pub repeater: Option<bool>,
    pub sortable: Option<bool>,
}

impl UpdateFieldGroup {
    /// Merge this patch over `existing`.
    ///
    /// An explicit slug wins; otherwise a new name regenerates the slug.
    /// Turning `repeater` off always clears `sortable`.
    pub fn apply_to(&self, existing: &FieldGroup) -> Result<FieldGroupSettings, CoreError> {
        let name = match &self.name {
            Some(name) => {
                validate_group_name(name)?;
                name.trim().to_string()
            }
            None => existing.name.clone(),
        };

        let slug = match (&self.slug, &self.name) {
            (Some(slug), _) if !slug.trim().is_empty() => slug_or_derive(Some(slug), &name)?,
            (_, Some(_)) => slug_or_derive(None, &name)?,
            _ => {
                let slug = slugify(&existing.slug);
                validate_slug(&slug)?;
                slug
            }
        };

        let binding = match (&self.recipient, &self.condition) {
            (Some(recipient), condition) => GroupBinding::resolve(
                recipient,
                condition.as_deref().or(existing.condition.as_deref()),
            )?,
            (None, Some(condition)) => {
                GroupBinding::resolve(&existing.recipient, Some(condition))?
            }
            (None, None) => existing.binding()?,
        };

        let repeater = self.repeater.unwrap_or(existing.repeater);
        let sortable = normalize_sortable(repeater, self.sortable.unwrap_or(existing.sortable));

        Ok(FieldGroupSettings {
            name,
            slug,
            active: self.active.unwrap_or(existing.active),
            repeater,
            sortable,
            binding,
        })
    }
}

/// Query parameters for `GET /api/v1/field-groups`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldGroupListParams {
    pub search: Option<String>,
    pub order_by: Option<String>,
    pub sort: Option<SortDirection>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// One page of the field group listing.
#[derive(Debug, Clone, Serialize)]
pub struct FieldGroupPage {
    pub items: Vec<FieldGroup>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub page_count: i64,
    /// Direction the column header should toggle to next.
    pub next_sort: SortDirection,
}

/// Request body for `POST /api/v1/field-groups/bulk`.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkFieldGroupRequest {
    pub ids: Vec<DbId>,
    #[serde(flatten)]
    pub action: BulkGroupAction,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str, recipient: &str, condition: Option<&str>) -> CreateFieldGroup {
        CreateFieldGroup {
            name: name.to_string(),
            recipient: recipient.to_string(),
            condition: condition.map(str::to_string),
            active: None,
            repeater: None,
            sortable: None,
        }
    }

    fn existing() -> FieldGroup {
        FieldGroup {
            id: 1,
            name: "Gallery".into(),
            slug: "gallery".into(),
            active: true,
            repeater: true,
            sortable: true,
            recipient: "Template".into(),
            condition: Some("Home".into()),
            fields: vec![],
            repeaters: vec![],
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn create_derives_slug_and_defaults() {
        let settings = create("Hero Banner", "Pages", None).normalize().unwrap();
        assert_eq!(settings.slug, "hero-banner");
        assert!(settings.active);
        assert!(!settings.repeater);
        assert!(!settings.sortable);
    }

    #[test]
    fn create_forces_sortable_off_without_repeater() {
        let mut input = create("Hero", "Pages", None);
        input.sortable = Some(true);
        assert!(!input.normalize().unwrap().sortable);

        input.repeater = Some(true);
        assert!(input.normalize().unwrap().sortable);
    }

    #[test]
    fn create_drops_condition_for_content_type() {
        let settings = create("Hero", "Posts", Some("Home")).normalize().unwrap();
        assert_eq!(settings.binding.condition(), None);
    }

    #[test]
    fn create_template_without_condition_fails() {
        assert!(create("Hero", "Template", None).normalize().is_err());
    }

    #[test]
    fn update_disabling_repeater_clears_sortable() {
        let patch = UpdateFieldGroup {
            repeater: Some(false),
            ..Default::default()
        };
        let settings = patch.apply_to(&existing()).unwrap();
        assert!(!settings.repeater);
        assert!(!settings.sortable);
    }

    #[test]
    fn update_rename_regenerates_slug() {
        let patch = UpdateFieldGroup {
            name: Some("Photo Strip".into()),
            ..Default::default()
        };
        assert_eq!(patch.apply_to(&existing()).unwrap().slug, "photo-strip");
    }

    #[test]
    fn update_explicit_slug_wins() {
        let patch = UpdateFieldGroup {
            name: Some("Photo Strip".into()),
            slug: Some("strip".into()),
            ..Default::default()
        };
        assert_eq!(patch.apply_to(&existing()).unwrap().slug, "strip");
    }

    #[test]
    fn update_rebinding_to_content_type_clears_condition() {
        let patch = UpdateFieldGroup {
            recipient: Some("Pages".into()),
            ..Default::default()
        };
        let settings = patch.apply_to(&existing()).unwrap();
        assert_eq!(settings.binding, GroupBinding::ContentType("Pages".into()));
    }

    #[test]
    fn update_new_condition_keeps_template_binding() {
        let patch = UpdateFieldGroup {
            condition: Some("About".into()),
            ..Default::default()
        };
        let settings = patch.apply_to(&existing()).unwrap();
        assert_eq!(settings.binding, GroupBinding::Template("About".into()));
    }

    #[test]
    fn bulk_request_flattens_action() {
        let req: BulkFieldGroupRequest =
            serde_json::from_str(r#"{"ids":[1,2],"action":"disable_repeater"}"#).unwrap();
        assert_eq!(req.ids, vec![1, 2]);
        assert_eq!(req.action, BulkGroupAction::DisableRepeater);
    }
}
