//! Field-group binding rules.
//!
//! A field group is attached either to a whole content type (its recipient is
//! the content type name, e.g. `"Pages"`) or to a single template (recipient
//! is the literal `"Template"` and `condition` names the template). Only
//! repeater groups may be sortable.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Recipient value that binds a group to a template instead of a content type.
pub const RECIPIENT_TEMPLATE: &str = "Template";

/// Maximum length of a group name.
pub const MAX_GROUP_NAME_LEN: usize = 200;

/// Where a field group applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupBinding {
    /// Every item of a content type (`"Pages"`, `"Posts"`, ...).
    ContentType(String),
    /// Only items rendered with the named template.
    Template(String),
}

impl GroupBinding {
    /// Resolve a raw `recipient` / `condition` pair.
    ///
    /// A template binding requires a non-blank condition; a content-type
    /// binding discards whatever condition was supplied.
    pub fn resolve(recipient: &str, condition: Option<&str>) -> Result<Self, CoreError> {
        let recipient = recipient.trim();
        if recipient.is_empty() {
            return Err(CoreError::Validation(
                "A field group needs a recipient".into(),
            ));
        }

        if recipient != RECIPIENT_TEMPLATE {
            return Ok(Self::ContentType(recipient.to_string()));
        }

        match condition.map(str::trim) {
            Some(template) if !template.is_empty() => Ok(Self::Template(template.to_string())),
            _ => Err(CoreError::Validation(
                "Please select a template when binding a field group to a template".into(),
            )),
        }
    }

    /// The `recipient` column value.
    pub fn recipient(&self) -> &str {
        match self {
            Self::ContentType(name) => name,
            Self::Template(_) => RECIPIENT_TEMPLATE,
        }
    }

    /// The `condition` column value.
    pub fn condition(&self) -> Option<&str> {
        match self {
            Self::ContentType(_) => None,
            Self::Template(template) => Some(template),
        }
    }
}

/// `sortable` only survives on repeater groups.
pub fn normalize_sortable(repeater: bool, sortable: bool) -> bool {
    repeater && sortable
}

/// Validate a group name (non-blank, bounded length).
pub fn validate_group_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation(
            "Please provide a name for the field group".into(),
        ));
    }
    if name.len() > MAX_GROUP_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Field group name must be at most {MAX_GROUP_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Bulk edit applied to several field groups at once from the admin listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BulkGroupAction {
    Activate,
    Deactivate,
    EnableRepeater,
    /// Also clears `sortable`.
    DisableRepeater,
    /// Rebind to a template; `template` must be non-blank.
    ApplyTemplate { template: String },
    /// Rebind to a content type; clears `condition`.
    ApplyContentType { recipient: String },
    /// Delete the groups and everything that depends on them.
    Delete,
}

impl BulkGroupAction {
    /// The binding this action applies, if it rebinds groups.
    pub fn binding(&self) -> Result<Option<GroupBinding>, CoreError> {
        match self {
            Self::ApplyTemplate { template } => {
                GroupBinding::resolve(RECIPIENT_TEMPLATE, Some(template)).map(Some)
            }
            Self::ApplyContentType { recipient } => {
                let binding = GroupBinding::resolve(recipient, None)?;
                if matches!(binding, GroupBinding::Template(_)) {
                    return Err(CoreError::Validation(
                        "Use apply_template to bind groups to a template".into(),
                    ));
                }
                Ok(Some(binding))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_binding_drops_condition() {
        let b = GroupBinding::resolve("Pages", Some("Home")).unwrap();
        assert_eq!(b, GroupBinding::ContentType("Pages".into()));
        assert_eq!(b.recipient(), "Pages");
        assert_eq!(b.condition(), None);
    }

    #[test]
    fn template_binding_keeps_condition() {
        let b = GroupBinding::resolve("Template", Some("Home")).unwrap();
        assert_eq!(b.recipient(), RECIPIENT_TEMPLATE);
        assert_eq!(b.condition(), Some("Home"));
    }

    #[test]
    fn template_binding_requires_condition() {
        assert!(GroupBinding::resolve("Template", None).is_err());
        assert!(GroupBinding::resolve("Template", Some("  ")).is_err());
    }

    #[test]
    fn blank_recipient_rejected() {
        assert!(GroupBinding::resolve("", None).is_err());
    }

    #[test]
    fn sortable_requires_repeater() {
        assert!(!normalize_sortable(false, true));
        assert!(!normalize_sortable(false, false));
        assert!(normalize_sortable(true, true));
        assert!(!normalize_sortable(true, false));
    }

    #[test]
    fn group_name_validation() {
        assert!(validate_group_name("Hero").is_ok());
        assert!(validate_group_name("   ").is_err());
        assert!(validate_group_name(&"x".repeat(201)).is_err());
    }

    #[test]
    fn bulk_action_deserializes_from_tagged_json() {
        let action: BulkGroupAction =
            serde_json::from_str(r#"{"action":"apply_template","template":"Home"}"#).unwrap();
        assert_eq!(
            action.binding().unwrap(),
            Some(GroupBinding::Template("Home".into()))
        );

        let action: BulkGroupAction = serde_json::from_str(r#"{"action":"delete"}"#).unwrap();
        assert_eq!(action, BulkGroupAction::Delete);
        assert_eq!(action.binding().unwrap(), None);
    }

    #[test]
    fn bulk_content_type_cannot_smuggle_template() {
        let action = BulkGroupAction::ApplyContentType {
            recipient: "Template".into(),
        };
        assert!(action.binding().is_err());
    }
}
