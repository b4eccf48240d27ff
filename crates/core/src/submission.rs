//! Decoding of submitted custom-field data.
//!
//! The admin edit form posts custom fields as parallel keys: an index list
//! (`field_index`, repeated or comma-separated) and, for every index `i`,
//!
//! | key                   | meaning                                   |
//! |-----------------------|-------------------------------------------|
//! | `{i}_field`           | raw value, or the file part for uploads   |
//! | `{i}_type`            | field definition id                       |
//! | `{i}_group`           | field group id                            |
//! | `{i}_fieldtype`       | field type tag (`text`, `upload`, ...)    |
//! | `{i}_field_value_id`  | id of the stored value being edited       |
//! | `{i}_media_select`    | id of an existing media item chosen       |
//!
//! This module turns that into typed [`FieldEntry`] values and decides, per
//! entry, whether it updates a stored value or inserts a new one.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::field_kind::FieldType;
use crate::types::DbId;

/// Key holding the list of submitted indexes.
pub const INDEX_KEY: &str = "field_index";

/// Placeholder some clients send for a field they never touched.
pub const UNDEFINED_PLACEHOLDER: &str = "undefined";

// ---------------------------------------------------------------------------
// Raw submission
// ---------------------------------------------------------------------------

/// A file part received with the submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Raw form data: text parts (a key may repeat) and file parts.
#[derive(Debug, Clone, Default)]
pub struct FieldSubmission {
    text: HashMap<String, Vec<String>>,
    files: HashMap<String, UploadedFile>,
}

impl FieldSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.text.entry(name.into()).or_default().push(value.into());
    }

    /// Record a file part. Empty parts (an untouched file input) are ignored.
    pub fn push_file(&mut self, name: impl Into<String>, file: UploadedFile) {
        if file.bytes.is_empty() && file.file_name.is_empty() {
            return;
        }
        self.files.insert(name.into(), file);
    }

    /// First value for `key`.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.text.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    /// Every value sent for `key`, in submission order.
    pub fn texts(&self, key: &str) -> &[String] {
        self.text.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn file(&self, key: &str) -> Option<&UploadedFile> {
        self.files.get(key)
    }

    /// Take ownership of a file part.
    pub fn take_file(&mut self, key: &str) -> Option<UploadedFile> {
        self.files.remove(key)
    }

    /// All submitted indexes in order, whether sent as repeated keys or as one
    /// comma-separated value.
    pub fn indexes(&self) -> Vec<String> {
        self.text
            .get(INDEX_KEY)
            .into_iter()
            .flatten()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Write mode
// ---------------------------------------------------------------------------

/// How a submission relates to repeater instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Plain (non-repeater) values of a content item.
    Plain,
    /// Values forming one brand-new repeater instance.
    NewRepeater,
    /// Values of an existing repeater instance, edited in place.
    RepeaterInPlace,
}

impl WriteMode {
    pub fn from_flags(in_repeater: bool, update_repeater: bool) -> Self {
        match (in_repeater, update_repeater) {
            (_, true) => Self::RepeaterInPlace,
            (true, false) => Self::NewRepeater,
            (false, false) => Self::Plain,
        }
    }

    pub fn in_repeater(self) -> bool {
        !matches!(self, Self::Plain)
    }
}

// ---------------------------------------------------------------------------
// Decoded entries
// ---------------------------------------------------------------------------

/// What an entry carries as its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPayload {
    /// Upload field pointing at an existing media item.
    UploadSelected { media_id: DbId },
    /// Upload field with a new file attached under `file_key`.
    UploadAttached { file_key: String },
    /// Upload field with neither; the stored value and file stay untouched.
    UploadOmitted,
    /// Any other field. `None` means the value key was absent.
    Plain(Option<String>),
}

/// One decoded index of the submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    pub index: String,
    pub field_id: Option<DbId>,
    pub group_id: Option<DbId>,
    pub field_type: Option<FieldType>,
    pub value_id: Option<DbId>,
    pub payload: EntryPayload,
}

/// Where an entry is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryTarget {
    Update { value_id: DbId },
    Insert { field_id: DbId, group_id: DbId },
}

impl FieldEntry {
    /// Name of the value / file key of this entry.
    pub fn value_key(&self) -> String {
        format!("{}_field", self.index)
    }

    /// Decide whether this entry updates or inserts under `mode`.
    ///
    /// In-place repeater edits address values by id; the index itself is the
    /// value id when no explicit `_field_value_id` was sent. New repeater
    /// instances always insert. Plain submissions update when a value id is
    /// present and insert otherwise.
    pub fn target(&self, mode: WriteMode) -> Result<EntryTarget, CoreError> {
        match (mode, self.value_id) {
            (WriteMode::RepeaterInPlace, _) => self
                .value_id
                .or_else(|| self.index.parse().ok())
                .map(|value_id| EntryTarget::Update { value_id })
                .ok_or_else(|| {
                    CoreError::Validation(format!(
                        "Repeater entry '{}' does not reference a stored value",
                        self.index
                    ))
                }),
            (WriteMode::Plain, Some(value_id)) => Ok(EntryTarget::Update { value_id }),
            (WriteMode::Plain | WriteMode::NewRepeater, _) => match (self.field_id, self.group_id) {
                (Some(field_id), Some(group_id)) => Ok(EntryTarget::Insert { field_id, group_id }),
                _ => Err(CoreError::Validation(format!(
                    "Field entry '{}' is missing its field or group id",
                    self.index
                ))),
            },
        }
    }
}

/// Decode every indexed entry of a submission.
pub fn decode_entries(submission: &FieldSubmission) -> Result<Vec<FieldEntry>, CoreError> {
    submission
        .indexes()
        .into_iter()
        .map(|index| decode_entry(submission, index))
        .collect()
}

fn decode_entry(submission: &FieldSubmission, index: String) -> Result<FieldEntry, CoreError> {
    let key = |suffix: &str| format!("{index}_{suffix}");

    let field_id = parse_id(submission, &key("type"))?;
    let group_id = parse_id(submission, &key("group"))?;
    let value_id = parse_id(submission, &key("field_value_id"))?;
    let field_type = match non_blank(submission.text(&key("fieldtype"))) {
        Some(raw) => Some(raw.parse::<FieldType>()?),
        None => None,
    };

    let value_key = key("field");
    let payload = if field_type.is_some_and(FieldType::is_upload) {
        if let Some(media_id) = parse_id(submission, &key("media_select"))? {
            EntryPayload::UploadSelected { media_id }
        } else if submission.file(&value_key).is_some() {
            EntryPayload::UploadAttached { file_key: value_key }
        } else {
            EntryPayload::UploadOmitted
        }
    } else if field_type == Some(FieldType::Checkbox) {
        EntryPayload::Plain(join_ticked(submission.texts(&value_key)))
    } else {
        EntryPayload::Plain(submission.text(&value_key).map(normalize_plain_value))
    };

    Ok(FieldEntry {
        index,
        field_id,
        group_id,
        field_type,
        value_id,
        payload,
    })
}

/// The `"undefined"` placeholder means an explicitly empty value.
fn normalize_plain_value(raw: &str) -> String {
    if raw == UNDEFINED_PLACEHOLDER {
        String::new()
    } else {
        raw.to_string()
    }
}

/// Ticked checkboxes arrive as one part each and are stored comma-separated.
fn join_ticked(parts: &[String]) -> Option<String> {
    if parts.is_empty() {
        return None;
    }
    let ticked: Vec<&str> = parts
        .iter()
        .flat_map(|p| p.split(','))
        .map(str::trim)
        .filter(|p| !p.is_empty() && *p != UNDEFINED_PLACEHOLDER)
        .collect();
    Some(ticked.join(","))
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty() && *s != UNDEFINED_PLACEHOLDER)
}

fn parse_id(submission: &FieldSubmission, key: &str) -> Result<Option<DbId>, CoreError> {
    match non_blank(submission.text(key)) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<DbId>()
            .map(Some)
            .map_err(|_| CoreError::Validation(format!("'{key}' must be a numeric id, got '{raw}'"))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
