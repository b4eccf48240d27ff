//! Field types, their per-type parameters and admin input descriptors.
//!
//! A field definition stores its type as a string tag and its parameters as a
//! JSON document holding one section per parameterised type. [`FieldKind`]
//! joins the two into a tagged union so every kind renders through its own
//! arm instead of a chain of type comparisons.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Field type tag
// ---------------------------------------------------------------------------

/// The type tag of a field definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Email,
    Url,
    Date,
    Color,
    Select,
    Checkbox,
    Radio,
    Upload,
}

impl FieldType {
    pub const ALL: [FieldType; 11] = [
        Self::Text,
        Self::Textarea,
        Self::Number,
        Self::Email,
        Self::Url,
        Self::Date,
        Self::Color,
        Self::Select,
        Self::Checkbox,
        Self::Radio,
        Self::Upload,
    ];

    /// Database / wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Number => "number",
            Self::Email => "email",
            Self::Url => "url",
            Self::Date => "date",
            Self::Color => "color",
            Self::Select => "select",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Upload => "upload",
        }
    }

    /// True for the choice-based types (select, checkbox, radio).
    pub fn is_select(self) -> bool {
        matches!(self, Self::Select | Self::Checkbox | Self::Radio)
    }

    pub fn is_upload(self) -> bool {
        self == Self::Upload
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
                CoreError::Validation(format!(
                    "Unknown field type '{s}'. Valid types: {}",
                    valid.join(", ")
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Parameters (persisted as JSONB)
// ---------------------------------------------------------------------------

/// Type-specific configuration of a field definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldParameters {
    #[serde(default)]
    pub textarea: TextareaParams,
    #[serde(default)]
    pub number: NumberParams,
    #[serde(default)]
    pub select: SelectParams,
    #[serde(default)]
    pub upload: UploadParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextareaParams {
    #[serde(default = "default_rows")]
    pub rows: u32,
}

impl Default for TextareaParams {
    fn default() -> Self {
        Self { rows: default_rows() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberParams {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default = "default_step")]
    pub step: f64,
}

impl Default for NumberParams {
    fn default() -> Self {
        Self {
            min: Some(0.0),
            max: None,
            step: default_step(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectParams {
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadParams {
    #[serde(default)]
    pub audio: bool,
    #[serde(default = "default_true")]
    pub images: bool,
    #[serde(default)]
    pub video: bool,
}

impl Default for UploadParams {
    fn default() -> Self {
        Self {
            audio: false,
            images: true,
            video: false,
        }
    }
}

fn default_rows() -> u32 {
    3
}

fn default_step() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl FieldParameters {
    /// Check the section relevant to `field_type`. Other sections are ignored.
    pub fn validate_for(&self, field_type: FieldType) -> Result<(), CoreError> {
        match field_type {
            FieldType::Textarea if self.textarea.rows == 0 => Err(CoreError::Validation(
                "Textarea rows must be at least 1".into(),
            )),
            FieldType::Number => {
                if self.number.step <= 0.0 {
                    return Err(CoreError::Validation(
                        "Number step must be greater than zero".into(),
                    ));
                }
                if let (Some(min), Some(max)) = (self.number.min, self.number.max) {
                    if min > max {
                        return Err(CoreError::Validation(format!(
                            "Number min ({min}) must not exceed max ({max})"
                        )));
                    }
                }
                Ok(())
            }
            t if t.is_select() => {
                if self.select.options.is_empty() {
                    return Err(CoreError::Validation(format!(
                        "A {t} field needs at least one option"
                    )));
                }
                if self.select.labels.len() > self.select.options.len() {
                    return Err(CoreError::Validation(
                        "There are more option labels than options".into(),
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Split a comma-separated option list as typed in the admin form.
///
/// Entries are trimmed and empty entries dropped.
pub fn parse_choice_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Tagged union
// ---------------------------------------------------------------------------

/// One selectable option of a choice field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

/// A field type joined with the parameters that apply to it.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Email,
    Url,
    Date,
    Color,
    Textarea { rows: u32 },
    Number { min: Option<f64>, max: Option<f64>, step: f64 },
    Select { choices: Vec<Choice> },
    Checkbox { choices: Vec<Choice> },
    Radio { choices: Vec<Choice> },
    Upload(UploadParams),
}

impl FieldKind {
    pub fn new(field_type: FieldType, params: &FieldParameters) -> Self {
        match field_type {
            FieldType::Text => Self::Text,
            FieldType::Email => Self::Email,
            FieldType::Url => Self::Url,
            FieldType::Date => Self::Date,
            FieldType::Color => Self::Color,
            FieldType::Textarea => Self::Textarea {
                rows: params.textarea.rows,
            },
            FieldType::Number => Self::Number {
                min: params.number.min,
                max: params.number.max,
                step: params.number.step,
            },
            FieldType::Select => Self::Select {
                choices: choices(&params.select),
            },
            FieldType::Checkbox => Self::Checkbox {
                choices: choices(&params.select),
            },
            FieldType::Radio => Self::Radio {
                choices: choices(&params.select),
            },
            FieldType::Upload => Self::Upload(params.upload),
        }
    }

    /// Build the admin input descriptor for this kind, marking the options
    /// that match the currently stored value.
    pub fn render_input(&self, current: Option<&str>) -> FieldInput {
        match self {
            Self::Text => FieldInput::plain("text"),
            Self::Email => FieldInput::plain("email"),
            Self::Url => FieldInput::plain("url"),
            Self::Date => FieldInput::plain("date"),
            Self::Color => FieldInput::plain("color"),
            Self::Textarea { rows } => FieldInput {
                rows: Some(*rows),
                ..FieldInput::plain("textarea")
            },
            Self::Number { min, max, step } => FieldInput {
                min: *min,
                max: *max,
                step: Some(*step),
                ..FieldInput::plain("number")
            },
            Self::Select { choices } => FieldInput {
                choices: mark_selected(choices, current, |c, v| c == v),
                ..FieldInput::plain("select")
            },
            // Checkboxes store every ticked option, comma-separated.
            Self::Checkbox { choices } => FieldInput {
                choices: mark_selected(choices, current, |c, v| {
                    v.split(',').any(|part| part.trim() == c)
                }),
                multiple: true,
                ..FieldInput::plain("checkbox")
            },
            Self::Radio { choices } => FieldInput {
                choices: mark_selected(choices, current, |c, v| c == v),
                ..FieldInput::plain("radio")
            },
            Self::Upload(params) => {
                let mut accept = Vec::new();
                if params.images {
                    accept.push("image/*");
                }
                if params.audio {
                    accept.push("audio/*");
                }
                if params.video {
                    accept.push("video/*");
                }
                FieldInput {
                    accept,
                    ..FieldInput::plain("file")
                }
            }
        }
    }
}

fn choices(select: &SelectParams) -> Vec<Choice> {
    select
        .options
        .iter()
        .enumerate()
        .map(|(i, value)| Choice {
            value: value.clone(),
            label: select
                .labels
                .get(i)
                .filter(|l| !l.is_empty())
                .cloned()
                .unwrap_or_else(|| value.clone()),
        })
        .collect()
}

fn mark_selected(
    choices: &[Choice],
    current: Option<&str>,
    is_match: impl Fn(&str, &str) -> bool,
) -> Vec<InputChoice> {
    choices
        .iter()
        .map(|c| InputChoice {
            value: c.value.clone(),
            label: c.label.clone(),
            selected: current.is_some_and(|v| is_match(&c.value, v)),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Admin input descriptor
// ---------------------------------------------------------------------------

/// What the admin edit form needs to draw one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldInput {
    pub input_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub multiple: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accept: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<InputChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputChoice {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl FieldInput {
    fn plain(input_type: &'static str) -> Self {
        Self {
            input_type,
            rows: None,
            min: None,
            max: None,
            step: None,
            multiple: false,
            accept: Vec::new(),
            choices: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
