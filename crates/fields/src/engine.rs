//! The fields engine: `get`, `render` and `update` plus the smaller
//! maintenance operations behind the admin screens.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use analog_core::field_kind::FieldType;
use analog_core::submission::{
    decode_entries, EntryPayload, EntryTarget, FieldEntry, FieldSubmission, WriteMode,
};
use analog_core::types::DbId;
use analog_db::models::field::Field;
use analog_db::models::field_value::{FieldValue, FieldValuePatch, NewFieldValue};
use analog_db::models::repeater::{RepeaterInstance, ReorderRepeaters};
use analog_db::repositories::{FieldGroupRepo, FieldRepo, FieldValueRepo, MediaRepo, RepeaterRepo};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::{not_found, validation, FieldsError};
use crate::render::{build_render_tree, RenderTree};
use crate::resolve::{resolve_groups, ResolvedFieldGroup};
use crate::storage::{FileStore, Storage};

/// What an `update` wrote.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    /// Every inserted or updated value.
    pub values: Vec<FieldValue>,
    /// The instance opened for a new repeater submission.
    pub repeater: Option<RepeaterInstance>,
}

/// What `purge_owner` removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PurgeSummary {
    pub values: u64,
    pub repeaters: u64,
}

/// An entry whose payload has been turned into column values.
struct PreparedEntry {
    target: EntryTarget,
    value: Option<String>,
    media_id: Option<DbId>,
}

/// Resolves, renders and writes custom-field data.
#[derive(Clone)]
pub struct FieldsEngine {
    pool: PgPool,
    storage: Storage,
}

impl FieldsEngine {
    pub fn new(pool: PgPool, store: Arc<dyn FileStore>) -> Self {
        let storage = Storage::new(store);
        Self { pool, storage }
    }

    // -----------------------------------------------------------------------
    // Read path
    // -----------------------------------------------------------------------

    /// Field groups that apply to an item of `recipient` rendered with
    /// `template`, annotated with `owner`'s stored values.
    ///
    /// Without an owner the groups carry their definitions only.
    pub async fn get(
        &self,
        recipient: &str,
        template: Option<&str>,
        owner: Option<DbId>,
    ) -> Result<Vec<ResolvedFieldGroup>, FieldsError> {
        self.get_inner(recipient, template, owner)
            .await
            .inspect_err(|e| e.log("get"))
    }

    async fn get_inner(
        &self,
        recipient: &str,
        template: Option<&str>,
        owner: Option<DbId>,
    ) -> Result<Vec<ResolvedFieldGroup>, FieldsError> {
        let recipient = recipient.trim();
        if recipient.is_empty() {
            return Err(validation("A recipient is required to look up custom fields"));
        }
        let template = template.map(str::trim).filter(|t| !t.is_empty());

        let groups = FieldGroupRepo::list_applicable(&self.pool, recipient, template).await?;
        let group_ids: Vec<DbId> = groups.iter().map(|g| g.id).collect();
        let fields = FieldRepo::list_by_groups(&self.pool, &group_ids).await?;

        let (plain, instances, instance_values) = match owner {
            Some(owner) => {
                let plain = FieldValueRepo::list_plain_details(&self.pool, owner).await?;
                let repeater_groups: Vec<DbId> =
                    groups.iter().filter(|g| g.repeater).map(|g| g.id).collect();
                let instances =
                    RepeaterRepo::list_for_owner(&self.pool, owner, &repeater_groups).await?;
                let instance_ids: Vec<DbId> = instances.iter().map(|r| r.id).collect();
                let instance_values =
                    FieldValueRepo::list_details_for_instances(&self.pool, &instance_ids).await?;
                (plain, instances, instance_values)
            }
            None => (Vec::new(), Vec::new(), Vec::new()),
        };

        Ok(resolve_groups(groups, fields, &plain, &instances, &instance_values)?)
    }

    /// The slug-keyed value tree for `owner`. Empty without an owner.
    pub async fn render(&self, owner: Option<DbId>) -> Result<RenderTree, FieldsError> {
        let Some(owner) = owner else {
            return Ok(RenderTree::new());
        };

        let load = async {
            let values = FieldValueRepo::list_details_for_owner(&self.pool, owner).await?;
            let repeater_groups: Vec<DbId> = values
                .iter()
                .filter(|v| v.group_repeater)
                .map(|v| v.group_id)
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            let instances =
                RepeaterRepo::list_for_owner(&self.pool, owner, &repeater_groups).await?;
            Ok::<_, FieldsError>(build_render_tree(&values, &instances))
        };
        load.await.inspect_err(|e| e.log("render"))
    }

    // -----------------------------------------------------------------------
    // Write path
    // -----------------------------------------------------------------------

    /// Write a submission of custom-field data for `owner`.
    ///
    /// Every entry is checked before anything is stored. Uploads, values and
    /// repeater instances are then written in one transaction; files stored
    /// for a submission that does not commit are removed again.
    pub async fn update(
        &self,
        submission: FieldSubmission,
        owner: Option<DbId>,
        mode: WriteMode,
    ) -> Result<UpdateOutcome, FieldsError> {
        self.update_inner(submission, owner, mode)
            .await
            .inspect_err(|e| e.log("update"))
    }

    async fn update_inner(
        &self,
        mut submission: FieldSubmission,
        owner: Option<DbId>,
        mode: WriteMode,
    ) -> Result<UpdateOutcome, FieldsError> {
        let owner = owner.ok_or_else(|| validation("An owner is required to save custom fields"))?;
        let entries = decode_entries(&submission)?;
        if entries.is_empty() {
            return Ok(UpdateOutcome {
                values: Vec::new(),
                repeater: None,
            });
        }

        let targets = entries
            .iter()
            .map(|e| e.target(mode))
            .collect::<Result<Vec<_>, _>>()?;
        self.check_definitions(owner, &entries, &targets).await?;
        let repeater_group = match mode {
            WriteMode::NewRepeater => Some(self.check_new_repeater_group(&targets).await?),
            _ => None,
        };

        let mut stored_paths = Vec::new();
        let written = self
            .write_entries(
                owner,
                &entries,
                targets,
                repeater_group,
                &mut submission,
                &mut stored_paths,
            )
            .await;
        if written.is_err() {
            self.storage.discard(&stored_paths).await;
        }
        let outcome = written?;

        tracing::info!(
            owner,
            ?mode,
            written = outcome.values.len(),
            repeater_id = outcome.repeater.as_ref().map(|r| r.id),
            "Saved custom field values",
        );
        Ok(outcome)
    }

    /// Store uploads and write every entry in a single transaction. The
    /// public path of each stored file is pushed to `stored_paths`.
    async fn write_entries(
        &self,
        owner: DbId,
        entries: &[FieldEntry],
        targets: Vec<EntryTarget>,
        repeater_group: Option<DbId>,
        submission: &mut FieldSubmission,
        stored_paths: &mut Vec<String>,
    ) -> Result<UpdateOutcome, FieldsError> {
        let mut tx = self.pool.begin().await?;

        let mut prepared = Vec::with_capacity(entries.len());
        for (entry, target) in entries.iter().zip(targets) {
            let (value, media_id) = self
                .resolve_payload(&mut tx, entry, submission, stored_paths)
                .await?;
            prepared.push(PreparedEntry {
                target,
                value,
                media_id,
            });
        }

        let outcome = match repeater_group {
            Some(group_id) => {
                let instance = RepeaterRepo::create_in(&mut tx, group_id, owner).await?;
                let inserts: Vec<NewFieldValue> =
                    prepared.iter().filter_map(PreparedEntry::as_insert).collect();
                let values =
                    FieldValueRepo::insert_for_instance_in(&mut tx, owner, instance.id, &inserts)
                        .await?;
                let instance = RepeaterRepo::find_by_id_in(&mut tx, instance.id)
                    .await?
                    .ok_or_else(|| not_found("RepeaterInstance", instance.id))?;
                UpdateOutcome {
                    values,
                    repeater: Some(instance),
                }
            }
            None => {
                let patches: Vec<FieldValuePatch> =
                    prepared.iter().filter_map(PreparedEntry::as_patch).collect();
                let inserts: Vec<NewFieldValue> =
                    prepared.iter().filter_map(PreparedEntry::as_insert).collect();

                let mut values = FieldValueRepo::update_batch_in(&mut tx, owner, &patches).await?;
                // Values deleted since the check.
                if let Some(missing) = first_missing(&patches, &values) {
                    return Err(not_found("FieldValue", missing));
                }
                values.extend(FieldValueRepo::upsert_plain_in(&mut tx, owner, &inserts).await?);
                UpdateOutcome {
                    values,
                    repeater: None,
                }
            }
        };
        tx.commit().await?;
        Ok(outcome)
    }

    /// Every entry must resolve to an existing definition that agrees with
    /// the submitted type tag.
    ///
    /// Inserts name their field and must stay inside the submitted group.
    /// Updates must patch a value of `owner`, and the field checked is the
    /// one that value was stored for.
    async fn check_definitions(
        &self,
        owner: DbId,
        entries: &[FieldEntry],
        targets: &[EntryTarget],
    ) -> Result<(), FieldsError> {
        let value_ids: Vec<DbId> = targets
            .iter()
            .filter_map(|t| match t {
                EntryTarget::Update { value_id } => Some(*value_id),
                EntryTarget::Insert { .. } => None,
            })
            .collect();
        let owned: HashMap<DbId, DbId> =
            FieldValueRepo::owned_field_ids(&self.pool, owner, &value_ids)
                .await?
                .into_iter()
                .collect();

        let mut field_ids = Vec::with_capacity(entries.len());
        for (entry, target) in entries.iter().zip(targets) {
            let field_id = match *target {
                EntryTarget::Insert { field_id, .. } => field_id,
                EntryTarget::Update { value_id } => {
                    let stored = *owned
                        .get(&value_id)
                        .ok_or_else(|| not_found("FieldValue", value_id))?;
                    if let Some(submitted) = entry.field_id.filter(|id| *id != stored) {
                        return Err(validation(format!(
                            "Field value {value_id} belongs to field {stored}, not {submitted}"
                        )));
                    }
                    stored
                }
            };
            field_ids.push(field_id);
        }

        let unique: Vec<DbId> = field_ids
            .iter()
            .copied()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let definitions: HashMap<DbId, Field> = FieldRepo::find_many(&self.pool, &unique)
            .await?
            .into_iter()
            .map(|f| (f.id, f))
            .collect();

        for ((entry, target), field_id) in entries.iter().zip(targets).zip(field_ids) {
            let field = definitions
                .get(&field_id)
                .ok_or_else(|| not_found("Field", field_id))?;

            if let EntryTarget::Insert { group_id, .. } = target {
                if field.group_id != *group_id {
                    return Err(validation(format!(
                        "Field {field_id} does not belong to field group {group_id}"
                    )));
                }
            }
            if let Some(submitted) = entry.field_type {
                let stored: FieldType = field.kind_tag()?;
                if stored != submitted {
                    return Err(validation(format!(
                        "Field {field_id} is a {stored} field, not {submitted}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// A new repeater instance takes values of exactly one repeater group.
    async fn check_new_repeater_group(&self, targets: &[EntryTarget]) -> Result<DbId, FieldsError> {
        let groups: HashSet<DbId> = targets
            .iter()
            .filter_map(|t| match t {
                EntryTarget::Insert { group_id, .. } => Some(*group_id),
                EntryTarget::Update { .. } => None,
            })
            .collect();
        let mut groups = groups.into_iter();
        let group_id = match (groups.next(), groups.next()) {
            (Some(group_id), None) => group_id,
            (None, _) => return Err(validation("A new repeater needs at least one field")),
            (Some(_), Some(_)) => {
                return Err(validation(
                    "All fields of a new repeater must belong to the same field group",
                ))
            }
        };

        let group = FieldGroupRepo::find_by_id(&self.pool, group_id)
            .await?
            .ok_or_else(|| not_found("FieldGroup", group_id))?;
        if !group.repeater {
            return Err(validation(format!(
                "Field group '{}' is not a repeater",
                group.name
            )));
        }
        Ok(group_id)
    }

    /// Turn an entry's payload into `(value, media_id)` columns. `None`
    /// leaves the stored column untouched.
    async fn resolve_payload(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        entry: &FieldEntry,
        submission: &mut FieldSubmission,
        stored_paths: &mut Vec<String>,
    ) -> Result<(Option<String>, Option<DbId>), FieldsError> {
        match &entry.payload {
            EntryPayload::UploadSelected { media_id } => {
                let media = MediaRepo::find_by_id(&self.pool, *media_id)
                    .await?
                    .ok_or_else(|| not_found("Media", *media_id))?;
                Ok((Some(media.path), Some(media.id)))
            }
            EntryPayload::UploadAttached { file_key } => {
                let upload = submission
                    .take_file(file_key)
                    .ok_or_else(|| validation(format!("File part '{file_key}' was already used")))?;
                let media = self.storage.write_in(tx, &upload).await?;
                stored_paths.push(media.path.clone());
                Ok((Some(media.path), Some(media.id)))
            }
            EntryPayload::UploadOmitted => Ok((None, None)),
            EntryPayload::Plain(value) => Ok((value.clone(), None)),
        }
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Renumber an owner's instances of one group in the given order.
    ///
    /// `ids` must list exactly the owner's current instances of the group.
    pub async fn reorder_repeaters(
        &self,
        request: &ReorderRepeaters,
    ) -> Result<Vec<RepeaterInstance>, FieldsError> {
        let reorder = async {
            let mut tx = self.pool.begin().await?;
            let current: HashSet<DbId> =
                RepeaterRepo::ids_for_owner_in(&mut tx, request.group_id, request.owner_id)
                    .await?
                    .into_iter()
                    .collect();
            let requested: HashSet<DbId> = request.ids.iter().copied().collect();

            if requested.len() != request.ids.len() {
                return Err(validation("Repeater order lists an instance twice"));
            }
            if requested != current {
                return Err(validation(
                    "Repeater order must list every instance of the group for this owner",
                ));
            }

            RepeaterRepo::set_positions_in(&mut tx, &request.ids).await?;
            tx.commit().await?;

            tracing::info!(
                group_id = request.group_id,
                owner_id = request.owner_id,
                count = request.ids.len(),
                "Reordered repeaters",
            );
            let instances =
                RepeaterRepo::list_for_owner(&self.pool, request.owner_id, &[request.group_id])
                    .await?;
            Ok::<_, FieldsError>(instances)
        };
        reorder.await.inspect_err(|e| e.log("reorder_repeaters"))
    }

    /// Delete a repeater instance and its values.
    pub async fn delete_repeater(&self, id: DbId) -> Result<(), FieldsError> {
        let deleted = RepeaterRepo::delete(&self.pool, id)
            .await
            .map_err(FieldsError::from)
            .inspect_err(|e| e.log("delete_repeater"))?;
        if !deleted {
            let err = not_found("RepeaterInstance", id);
            err.log("delete_repeater");
            return Err(err);
        }
        tracing::info!(repeater_id = id, "Deleted repeater");
        Ok(())
    }

    /// Detach the file from a stored value.
    pub async fn clear_file(&self, value_id: DbId) -> Result<FieldValue, FieldsError> {
        let cleared = async {
            FieldValueRepo::clear_file(&self.pool, value_id)
                .await?
                .ok_or_else(|| not_found("FieldValue", value_id))
        };
        let value = cleared.await.inspect_err(|e| e.log("clear_file"))?;
        tracing::info!(value_id, "Cleared field file");
        Ok(value)
    }

    /// Delete every value and repeater instance of a content item.
    pub async fn purge_owner(&self, owner: DbId) -> Result<PurgeSummary, FieldsError> {
        let purge = async {
            let mut tx = self.pool.begin().await?;
            let values = FieldValueRepo::delete_for_owner_in(&mut tx, owner).await?;
            let repeaters = RepeaterRepo::delete_for_owner_in(&mut tx, owner).await?;
            tx.commit().await?;
            Ok::<_, FieldsError>(PurgeSummary { values, repeaters })
        };
        let summary = purge.await.inspect_err(|e| e.log("purge_owner"))?;
        tracing::info!(owner, values = summary.values, repeaters = summary.repeaters, "Purged owner");
        Ok(summary)
    }
}

impl PreparedEntry {
    fn as_insert(&self) -> Option<NewFieldValue> {
        match self.target {
            EntryTarget::Insert { field_id, group_id } => Some(NewFieldValue {
                field_id,
                group_id,
                value: self.value.clone(),
                media_id: self.media_id,
            }),
            EntryTarget::Update { .. } => None,
        }
    }

    fn as_patch(&self) -> Option<FieldValuePatch> {
        match self.target {
            EntryTarget::Update { value_id } => Some(FieldValuePatch {
                id: value_id,
                value: self.value.clone(),
                media_id: self.media_id,
            }),
            EntryTarget::Insert { .. } => None,
        }
    }
}

/// First patched id that no updated row came back for.
fn first_missing(patches: &[FieldValuePatch], updated: &[FieldValue]) -> Option<DbId> {
    let updated: HashSet<DbId> = updated.iter().map(|v| v.id).collect();
    patches.iter().map(|p| p.id).find(|id| !updated.contains(id))
}
