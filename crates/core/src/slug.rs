//! Slug generation and validation for field groups and field definitions.
//!
//! Group slugs key the top level of the rendered field tree and field slugs
//! key the values inside each group, so both must be stable and URL-safe.

use crate::error::CoreError;

/// Maximum length of a generated or supplied slug.
pub const MAX_SLUG_LEN: usize = 120;

/// Generate a URL-safe slug from a human-readable name.
///
/// Lowercases, replaces every non-alphanumeric character with a hyphen,
/// collapses hyphen runs and trims hyphens from both ends.
pub fn slugify(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut prev_hyphen = false;

    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen {
            result.push('-');
            prev_hyphen = true;
        }
    }

    let trimmed = result.trim_matches('-');
    trimmed.chars().take(MAX_SLUG_LEN).collect::<String>().trim_end_matches('-').to_string()
}

/// Use `explicit` when it is present and non-blank, otherwise derive the slug
/// from `fallback`. Either way the result is passed through [`slugify`].
pub fn slug_or_derive(explicit: Option<&str>, fallback: &str) -> Result<String, CoreError> {
    let source = match explicit {
        Some(s) if !s.trim().is_empty() => s,
        _ => fallback,
    };
    let slug = slugify(source);
    validate_slug(&slug)?;
    Ok(slug)
}

/// Validate a slug (non-empty, only lowercase alphanumeric + hyphens).
pub fn validate_slug(slug: &str) -> Result<(), CoreError> {
    if slug.is_empty() {
        return Err(CoreError::Validation(
            "Slug must not be empty; provide a name containing letters or digits".into(),
        ));
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(CoreError::Validation(format!(
            "Slug must be at most {MAX_SLUG_LEN} characters"
        )));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(CoreError::Validation(
            "Slug must contain only lowercase alphanumeric characters and hyphens".into(),
        ));
    }
    Ok(())
}
