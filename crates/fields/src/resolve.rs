//! Read-path assembly: field groups merged with an owner's stored values.
//!
//! [`resolve_groups`] is pure; the engine loads the rows and hands them over.

use std::collections::HashMap;

use analog_core::error::CoreError;
use analog_core::field_kind::FieldInput;
use analog_core::types::DbId;
use analog_db::models::field::Field;
use analog_db::models::field_group::FieldGroup;
use analog_db::models::field_value::FieldValueDetail;
use analog_db::models::repeater::RepeaterInstance;
use serde::Serialize;

/// A field group as shown on an item's edit form.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedFieldGroup {
    pub id: DbId,
    pub name: String,
    pub slug: String,
    pub active: bool,
    pub repeater: bool,
    pub sortable: bool,
    pub recipient: String,
    pub condition: Option<String>,
    pub fields: Vec<ResolvedField>,
    /// The owner's instances of this group, by position.
    pub repeaters: Vec<ResolvedRepeater>,
}

/// A field definition annotated with the owner's stored value.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedField {
    #[serde(flatten)]
    pub field: Field,
    pub is_select: bool,
    pub field_value_id: Option<DbId>,
    pub field_value: Option<String>,
    pub media_id: Option<DbId>,
    pub is_file: bool,
    pub input: FieldInput,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRepeater {
    pub id: DbId,
    pub position: i32,
    pub values: Vec<ResolvedRepeaterValue>,
}

/// One stored value of a repeater instance.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRepeaterValue {
    pub id: DbId,
    pub field_id: DbId,
    pub field_slug: String,
    pub field_title: String,
    pub field_type: String,
    pub value: Option<String>,
    pub media_id: Option<DbId>,
    pub is_file: bool,
    pub input: FieldInput,
}

/// Merge groups, their definitions and the owner's values.
///
/// `fields` may hold definitions of any of `groups`; `plain_values` are the
/// owner's non-repeater values; `instances` and `instance_values` are the
/// owner's repeater instances and their values.
pub fn resolve_groups(
    groups: Vec<FieldGroup>,
    fields: Vec<Field>,
    plain_values: &[FieldValueDetail],
    instances: &[RepeaterInstance],
    instance_values: &[FieldValueDetail],
) -> Result<Vec<ResolvedFieldGroup>, CoreError> {
    let plain_by_field: HashMap<DbId, &FieldValueDetail> =
        plain_values.iter().map(|v| (v.field_id, v)).collect();
    let field_by_id: HashMap<DbId, &Field> = fields.iter().map(|f| (f.id, f)).collect();

    let mut values_by_instance: HashMap<DbId, Vec<&FieldValueDetail>> = HashMap::new();
    for value in instance_values {
        if let Some(instance_id) = value.repeater_instance_id {
            values_by_instance.entry(instance_id).or_default().push(value);
        }
    }

    let mut resolved = Vec::with_capacity(groups.len());
    for group in groups {
        let mut group_fields = Vec::new();
        for field in fields.iter().filter(|f| f.group_id == group.id) {
            group_fields.push(resolve_field(field.clone(), plain_by_field.get(&field.id).copied())?);
        }

        let mut repeaters = Vec::new();
        for instance in instances.iter().filter(|r| r.group_id == group.id) {
            let values = values_by_instance
                .get(&instance.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            repeaters.push(ResolvedRepeater {
                id: instance.id,
                position: instance.position,
                values: values
                    .iter()
                    .map(|v| resolve_repeater_value(v, field_by_id.get(&v.field_id).copied()))
                    .collect::<Result<_, _>>()?,
            });
        }

        resolved.push(ResolvedFieldGroup {
            id: group.id,
            name: group.name,
            slug: group.slug,
            active: group.active,
            repeater: group.repeater,
            sortable: group.sortable,
            recipient: group.recipient,
            condition: group.condition,
            fields: group_fields,
            repeaters,
        });
    }

    Ok(resolved)
}

fn resolve_field(field: Field, stored: Option<&FieldValueDetail>) -> Result<ResolvedField, CoreError> {
    let field_value = stored.and_then(FieldValueDetail::resolved).map(str::to_string);
    let input = field.kind()?.render_input(field_value.as_deref());
    Ok(ResolvedField {
        is_select: field.is_select(),
        field_value_id: stored.map(|v| v.id),
        media_id: stored.and_then(|v| v.media_id),
        is_file: stored.is_some_and(FieldValueDetail::is_file),
        field_value,
        input,
        field,
    })
}

fn resolve_repeater_value(
    value: &FieldValueDetail,
    field: Option<&Field>,
) -> Result<ResolvedRepeaterValue, CoreError> {
    let resolved = value.resolved().map(str::to_string);
    let field = field.ok_or_else(|| {
        CoreError::Internal(format!(
            "Value {} references field {} outside its group",
            value.id, value.field_id
        ))
    })?;
    Ok(ResolvedRepeaterValue {
        id: value.id,
        field_id: value.field_id,
        field_slug: value.field_slug.clone(),
        field_title: value.field_title.clone(),
        field_type: value.field_type.clone(),
        input: field.kind()?.render_input(resolved.as_deref()),
        value: resolved,
        media_id: value.media_id,
        is_file: value.is_file(),
    })
}
