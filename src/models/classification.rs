//! Classification and costing result model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::services::pricing::MarkupSource;

/// Category name reported for calls no active category matched
pub const UNKNOWN_CATEGORY_NAME: &str = "UNKNOWN";

/// Display name reported for unmatched calls
pub const UNKNOWN_CATEGORY_DISPLAY_NAME: &str = "Unknown";

/// Billing unit for cost computation
///
/// Both units bill `price_per_minute * minutes`; the unit only changes how
/// the billed duration is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingUnit {
    PerMinute,
    PerSecond,
}

/// Result of classifying and costing one call
///
/// Ephemeral: consumed immediately by the caller, never persisted by the
/// engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Matched category name, or the UNKNOWN sentinel
    pub category_name: String,

    /// Matched category display name
    pub category_display_name: String,

    /// False when the UNKNOWN sentinel was synthesized
    pub matched: bool,

    /// Call type as received, before normalization
    pub original_call_type: String,

    /// Category price before markup
    pub price_per_minute_base: Decimal,

    /// Category price after markup
    pub price_per_minute_with_markup: Decimal,

    /// Price actually billed (base or with markup)
    pub price_per_minute_used: Decimal,

    /// Markup percent in effect for the billed price
    pub markup_percent_applied: Decimal,

    /// Where the markup came from
    pub markup_source: MarkupSource,

    /// Unit the billed duration is expressed in
    pub billing_unit: BillingUnit,

    /// Billed duration in the requested unit, rounded to four decimals
    pub duration_billed: Decimal,

    /// Computed cost, rounded to four decimals
    pub cost_calculated: Decimal,

    /// Currency of the billed price
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billing_unit_serde() {
        assert_eq!(
            serde_json::to_string(&BillingUnit::PerMinute).unwrap(),
            "\"per_minute\""
        );
        assert_eq!(
            serde_json::from_str::<BillingUnit>("\"per_second\"").unwrap(),
            BillingUnit::PerSecond
        );
    }
}
