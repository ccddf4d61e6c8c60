//! Call-type classification
//!
//! Matches a raw call-type description against category patterns.
//! First match wins: categories are tried in the order given, and the store
//! supplies them sorted by their persisted priority, so the outcome for
//! overlapping patterns is fully determined by that order.

use tracing::debug;

use crate::models::Category;

/// Classify a raw call-type string against active categories
///
/// The input is normalized (uppercase, trimmed) and each category's patterns
/// are matched as substrings. Returns the first matching category, or `None`
/// when nothing matches or the input is blank. Inactive categories are
/// skipped.
pub fn classify<'a>(call_type: &str, categories: &'a [Category]) -> Option<&'a Category> {
    let normalized = call_type.trim().to_uppercase();
    if normalized.is_empty() {
        return None;
    }

    let matched = categories
        .iter()
        .filter(|c| c.is_active)
        .find(|c| c.matches_call_type(&normalized));

    match matched {
        Some(category) => {
            debug!(call_type = %normalized, category = %category.name, "call type classified");
        }
        None => {
            debug!(call_type = %normalized, "call type did not match any category");
        }
    }

    matched
}
