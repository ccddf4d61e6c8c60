//! Pricing category model
//!
//! A category bundles a per-minute price, a markup policy and a set of
//! substring patterns used to classify raw call-type descriptions.
//! Categories are plain values: construction goes through [`Category::new`]
//! which validates the draft and computes the cached final price, and every
//! later mutation re-runs [`Category::refresh_pricing`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::services::pricing;
use crate::EngineResult;

/// Inclusive lower bound for markup percents
pub const MARKUP_MIN_PERCENT: i32 = -100;

/// Inclusive upper bound for markup percents
pub const MARKUP_MAX_PERCENT: i32 = 1000;

/// A named pricing/classification rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Unique name, normalized uppercase
    pub name: String,

    /// Human-readable name
    pub display_name: String,

    /// Per-minute price before markup
    pub base_price_per_minute: Decimal,

    /// Currency code (e.g. "EUR")
    pub currency: String,

    /// Substring patterns matched against raw call-type descriptions
    pub patterns: Vec<String>,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Inactive categories are ignored by classification
    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Classification order: lower values are tried first, ties resolved
    /// by name ascending. Persisted and user-adjustable.
    #[serde(default)]
    pub priority: i32,

    /// Category-specific markup percent; `None` inherits the global markup
    #[serde(default)]
    pub custom_markup_percent: Option<Decimal>,

    /// Cached per-minute price after markup
    pub price_with_markup: Decimal,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// Input for creating a category
#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    pub name: String,
    pub display_name: String,
    pub base_price_per_minute: Decimal,
    pub patterns: Vec<String>,
    /// Defaults to the engine's configured currency when `None`
    pub currency: Option<String>,
    pub description: String,
    pub custom_markup_percent: Option<Decimal>,
    /// Defaults to the end of the current classification order when `None`
    pub priority: Option<i32>,
}

/// Partial update for an existing category
///
/// Each supplied field is validated before any field is applied; an invalid
/// value rejects the whole update.
#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub display_name: Option<String>,
    pub base_price_per_minute: Option<Decimal>,
    pub patterns: Option<Vec<String>>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub priority: Option<i32>,
    /// `Some(None)` clears the custom markup back to the global one
    pub custom_markup_percent: Option<Option<Decimal>>,
}

impl CategoryUpdate {
    /// True when no field is supplied
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.base_price_per_minute.is_none()
            && self.patterns.is_none()
            && self.currency.is_none()
            && self.description.is_none()
            && self.is_active.is_none()
            && self.priority.is_none()
            && self.custom_markup_percent.is_none()
    }
}

impl Category {
    /// Build a validated category from a draft
    ///
    /// Normalizes the name to uppercase, trims patterns, checks price and
    /// markup ranges and computes the cached `price_with_markup` under the
    /// given global markup.
    pub fn new(
        draft: NewCategory,
        global_markup: Decimal,
        default_currency: &str,
        fallback_priority: i32,
    ) -> EngineResult<Self> {
        let name = normalize_name(&draft.name);
        if name.is_empty() {
            return Err(EngineError::Validation(
                "category name is required".to_string(),
            ));
        }

        validate_price(draft.base_price_per_minute)?;
        if let Some(markup) = draft.custom_markup_percent {
            validate_markup(markup)?;
        }
        let patterns = clean_patterns(&draft.patterns)?;

        let now = Utc::now();
        let mut category = Category {
            name,
            display_name: draft.display_name.trim().to_string(),
            base_price_per_minute: draft.base_price_per_minute,
            currency: draft
                .currency
                .unwrap_or_else(|| default_currency.to_string()),
            patterns,
            description: draft.description.trim().to_string(),
            is_active: true,
            priority: draft.priority.unwrap_or(fallback_priority),
            custom_markup_percent: draft.custom_markup_percent,
            price_with_markup: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        category.refresh_pricing(global_markup);

        Ok(category)
    }

    /// Recompute the cached final price under the given global markup
    pub fn refresh_pricing(&mut self, global_markup: Decimal) {
        self.price_with_markup = pricing::price_with_markup(
            self.base_price_per_minute,
            self.custom_markup_percent,
            global_markup,
        );
    }

    /// True if any pattern is a substring of the normalized call type
    pub fn matches_call_type(&self, call_type: &str) -> bool {
        let normalized = call_type.trim().to_uppercase();
        if normalized.is_empty() {
            return false;
        }

        self.patterns.iter().any(|pattern| {
            let pattern = pattern.trim().to_uppercase();
            !pattern.is_empty() && normalized.contains(&pattern)
        })
    }

    /// Patterns normalized for comparison (uppercase, trimmed)
    pub fn normalized_patterns(&self) -> Vec<String> {
        self.patterns
            .iter()
            .map(|p| p.trim().to_uppercase())
            .filter(|p| !p.is_empty())
            .collect()
    }
}

/// Normalize a category name: trimmed, uppercase
pub fn normalize_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Reject negative prices
pub fn validate_price(price: Decimal) -> EngineResult<()> {
    if price < Decimal::ZERO {
        return Err(EngineError::NegativePrice(price));
    }
    Ok(())
}

/// Reject markup percents outside [-100, 1000]
pub fn validate_markup(markup: Decimal) -> EngineResult<()> {
    if markup < Decimal::from(MARKUP_MIN_PERCENT) || markup > Decimal::from(MARKUP_MAX_PERCENT) {
        return Err(EngineError::MarkupOutOfRange(markup));
    }
    Ok(())
}

/// Trim patterns, drop empties, require at least one survivor
pub fn clean_patterns(patterns: &[String]) -> EngineResult<Vec<String>> {
    let cleaned: Vec<String> = patterns
        .iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    if cleaned.is_empty() {
        return Err(EngineError::EmptyPatterns);
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn draft(name: &str, price: Decimal, patterns: &[&str]) -> NewCategory {
        NewCategory {
            name: name.to_string(),
            display_name: format!("{name} calls"),
            base_price_per_minute: price,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_normalizes_and_prices() {
        let category = Category::new(
            draft("  mobili ", dec!(0.15), &["CELLULARE", " MOBILE "]),
            dec!(10),
            "EUR",
            0,
        )
        .unwrap();

        assert_eq!(category.name, "MOBILI");
        assert_eq!(category.currency, "EUR");
        assert_eq!(category.patterns, vec!["CELLULARE", "MOBILE"]);
        assert_eq!(category.price_with_markup, dec!(0.165));
        assert!(category.is_active);
    }

    #[test]
    fn test_new_rejects_bad_input() {
        let err = Category::new(draft("", dec!(0.1), &["X"]), dec!(0), "EUR", 0).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = Category::new(draft("A", dec!(-0.1), &["X"]), dec!(0), "EUR", 0).unwrap_err();
        assert!(matches!(err, EngineError::NegativePrice(_)));

        let err = Category::new(draft("A", dec!(0.1), &["  ", ""]), dec!(0), "EUR", 0).unwrap_err();
        assert!(matches!(err, EngineError::EmptyPatterns));

        let mut bad_markup = draft("A", dec!(0.1), &["X"]);
        bad_markup.custom_markup_percent = Some(dec!(1001));
        let err = Category::new(bad_markup, dec!(0), "EUR", 0).unwrap_err();
        assert!(matches!(err, EngineError::MarkupOutOfRange(_)));
    }

    #[test]
    fn test_custom_markup_wins_over_global() {
        let mut premium = draft("PREMIUM", dec!(1.00), &["899"]);
        premium.custom_markup_percent = Some(dec!(50));
        let mut category = Category::new(premium, dec!(10), "EUR", 0).unwrap();
        assert_eq!(category.price_with_markup, dec!(1.50));

        // global markup changes leave custom-markup categories untouched
        category.refresh_pricing(dec!(25));
        assert_eq!(category.price_with_markup, dec!(1.50));
    }

    #[test]
    fn test_matches_call_type() {
        let category =
            Category::new(draft("MOBILI", dec!(0.15), &["CELLULARE", "MOBILE"]), dec!(0), "EUR", 0)
                .unwrap();

        assert!(category.matches_call_type("CELLULARE VODAFONE"));
        assert!(category.matches_call_type("  cellulare tim  "));
        assert!(!category.matches_call_type("RETE FISSA"));
        assert!(!category.matches_call_type(""));
    }

    #[test]
    fn test_update_is_empty() {
        assert!(CategoryUpdate::default().is_empty());
        let update = CategoryUpdate {
            is_active: Some(false),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
