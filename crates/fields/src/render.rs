//! Render-path assembly: the slug-keyed value tree templates consume.

use std::collections::HashMap;

use analog_core::types::DbId;
use analog_db::models::field_value::FieldValueDetail;
use analog_db::models::repeater::RepeaterInstance;
use indexmap::IndexMap;
use serde::Serialize;

/// Field slug to resolved value.
pub type RenderedValues = IndexMap<String, Option<String>>;

/// Group slug to the group's rendered values.
pub type RenderTree = IndexMap<String, RenderedGroup>;

/// Values of one group: a flat map, or one map per repeater instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RenderedGroup {
    Single(RenderedValues),
    Repeated(Vec<RenderedValues>),
}

/// Build the render tree from all of an owner's values.
///
/// Inactive groups are skipped. Repeater groups list one map per instance in
/// the order of `instances`, which the caller sorts by position; plain
/// values of a repeater group and repeater values of a plain group are
/// ignored.
pub fn build_render_tree(values: &[FieldValueDetail], instances: &[RepeaterInstance]) -> RenderTree {
    let mut by_instance: HashMap<DbId, Vec<&FieldValueDetail>> = HashMap::new();
    let mut tree = RenderTree::new();

    for value in values.iter().filter(|v| v.group_active) {
        if value.group_repeater {
            if let Some(instance_id) = value.repeater_instance_id {
                by_instance.entry(instance_id).or_default().push(value);
            }
            tree.entry(value.group_slug.clone())
                .or_insert_with(|| RenderedGroup::Repeated(Vec::new()));
        } else if !value.in_repeater {
            let entry = tree
                .entry(value.group_slug.clone())
                .or_insert_with(|| RenderedGroup::Single(RenderedValues::new()));
            if let RenderedGroup::Single(map) = entry {
                map.insert(value.field_slug.clone(), value.resolved().map(str::to_string));
            }
        }
    }

    // Slugs of the groups that own each instance, as seen through values.
    let mut slug_by_group: HashMap<DbId, &str> = HashMap::new();
    for value in values.iter().filter(|v| v.group_active && v.group_repeater) {
        slug_by_group.insert(value.group_id, value.group_slug.as_str());
    }

    for instance in instances {
        let Some(slug) = slug_by_group.get(&instance.group_id) else {
            continue;
        };
        let rendered: RenderedValues = by_instance
            .get(&instance.id)
            .into_iter()
            .flatten()
            .map(|v| (v.field_slug.clone(), v.resolved().map(str::to_string)))
            .collect();
        if let Some(RenderedGroup::Repeated(rows)) = tree.get_mut(*slug) {
            rows.push(rendered);
        }
    }

    tree
}
