//! Field definition models and DTOs.

use analog_core::error::CoreError;
use analog_core::field_kind::{parse_choice_list, FieldKind, FieldParameters, FieldType};
use analog_core::slug::slug_or_derive;
use analog_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use validator::Validate;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `fields` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Field {
    pub id: DbId,
    pub group_id: DbId,
    pub title: String,
    pub slug: String,
    pub field_type: String,
    pub description: Option<String>,
    pub required: bool,
    pub default_val: Option<String>,
    pub parameters: Json<FieldParameters>,
    pub position: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Field {
    /// Parsed type tag. The column is CHECK-constrained, so this only fails
    /// when the database and the code disagree about the set of types.
    pub fn kind_tag(&self) -> Result<FieldType, CoreError> {
        self.field_type.parse()
    }

    pub fn kind(&self) -> Result<FieldKind, CoreError> {
        Ok(FieldKind::new(self.kind_tag()?, &self.parameters.0))
    }

    pub fn is_select(&self) -> bool {
        self.kind_tag().is_ok_and(FieldType::is_select)
    }
}

// ---------------------------------------------------------------------------
// Normalized settings
// ---------------------------------------------------------------------------

/// Validated column values for a field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSettings {
    pub title: String,
    pub slug: String,
    pub field_type: FieldType,
    pub description: Option<String>,
    pub required: bool,
    pub default_val: Option<String>,
    pub parameters: FieldParameters,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// DTO for creating a field definition inside a group.
///
/// Choice fields may send their options as comma-separated strings in
/// `select_options` / `select_labels`; these override `parameters.select`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateField {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub slug: Option<String>,
    pub field_type: FieldType,
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    pub default_val: Option<String>,
    pub parameters: Option<FieldParameters>,
    pub select_options: Option<String>,
    pub select_labels: Option<String>,
}

impl CreateField {
    pub fn normalize(&self) -> Result<FieldSettings, CoreError> {
        let parameters = merge_choice_lists(
            self.parameters.clone().unwrap_or_default(),
            self.select_options.as_deref(),
            self.select_labels.as_deref(),
        );
        parameters.validate_for(self.field_type)?;

        Ok(FieldSettings {
            title: self.title.trim().to_string(),
            slug: slug_or_derive(self.slug.as_deref(), &self.title)?,
            field_type: self.field_type,
            description: self.description.clone(),
            required: self.required,
            default_val: self.default_val.clone(),
            parameters,
        })
    }
}

/// DTO for updating a field definition. The type cannot change.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateField {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub required: Option<bool>,
    pub default_val: Option<String>,
    pub parameters: Option<FieldParameters>,
    pub select_options: Option<String>,
    pub select_labels: Option<String>,
}

impl UpdateField {
    pub fn apply_to(&self, existing: &Field) -> Result<FieldSettings, CoreError> {
        let field_type = existing.kind_tag()?;
        let title = self
            .title
            .as_deref()
            .map(str::trim)
            .unwrap_or(&existing.title)
            .to_string();

        let slug = match (&self.slug, &self.title) {
            (Some(slug), _) => slug_or_derive(Some(slug), &title)?,
            (None, Some(_)) => slug_or_derive(None, &title)?,
            (None, None) => existing.slug.clone(),
        };

        let parameters = merge_choice_lists(
            self.parameters
                .clone()
                .unwrap_or_else(|| existing.parameters.0.clone()),
            self.select_options.as_deref(),
            self.select_labels.as_deref(),
        );
        parameters.validate_for(field_type)?;

        Ok(FieldSettings {
            title,
            slug,
            field_type,
            description: self
                .description
                .clone()
                .or_else(|| existing.description.clone()),
            required: self.required.unwrap_or(existing.required),
            default_val: self
                .default_val
                .clone()
                .or_else(|| existing.default_val.clone()),
            parameters,
        })
    }
}

fn merge_choice_lists(
    mut parameters: FieldParameters,
    options: Option<&str>,
    labels: Option<&str>,
) -> FieldParameters {
    if let Some(options) = options {
        parameters.select.options = parse_choice_list(options);
    }
    if let Some(labels) = labels {
        parameters.select.labels = parse_choice_list(labels);
    }
    parameters
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn create(title: &str, field_type: FieldType) -> CreateField {
        CreateField {
            title: title.into(),
            slug: None,
            field_type,
            description: None,
            required: false,
            default_val: None,
            parameters: None,
            select_options: None,
            select_labels: None,
        }
    }

    #[test]
    fn create_derives_slug_from_title() {
        let settings = create("Hero Image", FieldType::Upload).normalize().unwrap();
        assert_eq!(settings.slug, "hero-image");
        assert!(settings.parameters.upload.images);
    }

    #[test]
    fn create_select_reads_comma_separated_options() {
        let mut input = create("Size", FieldType::Select);
        input.select_options = Some("s, m, l".into());
        input.select_labels = Some("Small,Medium,Large".into());

        let settings = input.normalize().unwrap();
        assert_eq!(settings.parameters.select.options, vec!["s", "m", "l"]);
        assert_eq!(settings.parameters.select.labels[2], "Large");
    }

    #[test]
    fn create_select_without_options_fails() {
        assert!(create("Size", FieldType::Radio).normalize().is_err());
    }

    #[test]
    fn type_tag_deserializes_lowercase() {
        let input: CreateField =
            serde_json::from_str(r#"{"title":"Body","field_type":"textarea"}"#).unwrap();
        assert_eq!(input.field_type, FieldType::Textarea);
        assert!(!input.required);
    }
}
