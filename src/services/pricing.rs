//! Markup and final price calculation
//!
//! Pure functions shared by the category store, the cost calculator and
//! reporting. A category either carries its own markup percent or inherits
//! the store-wide global markup; the final per-minute price is always
//! `base * (1 + markup / 100)` rounded to four decimal places.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Scale used for every monetary value produced by the engine
pub const MONEY_SCALE: u32 = 4;

/// Where the markup applied to a price came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupSource {
    /// Category-specific markup
    Custom,
    /// Store-wide global markup
    Global,
    /// No markup applied (unmatched calls)
    None,
}

/// Detailed view of how a final price was obtained
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingBreakdown {
    /// Price before markup
    pub base_price: Decimal,

    /// Markup percent actually applied
    pub markup_percent: Decimal,

    /// Whether the markup is category-specific or global
    pub markup_source: MarkupSource,

    /// Absolute surcharge, `final_price - base_price`
    pub markup_amount: Decimal,

    /// Price after markup, rounded to four decimals
    pub final_price: Decimal,
}

/// Resolve the markup percent in effect for a category
#[inline]
pub fn effective_markup(
    custom_markup: Option<Decimal>,
    global_markup: Decimal,
) -> (Decimal, MarkupSource) {
    match custom_markup {
        Some(percent) => (percent, MarkupSource::Custom),
        None => (global_markup, MarkupSource::Global),
    }
}

/// Final per-minute price for a base price under the given markups
#[inline]
pub fn price_with_markup(
    base_price: Decimal,
    custom_markup: Option<Decimal>,
    global_markup: Decimal,
) -> Decimal {
    let (markup, _) = effective_markup(custom_markup, global_markup);
    apply_markup(base_price, markup)
}

/// Apply a markup percent to a base price
#[inline]
pub fn apply_markup(base_price: Decimal, markup_percent: Decimal) -> Decimal {
    let multiplier = Decimal::ONE + markup_percent / Decimal::ONE_HUNDRED;
    (base_price * multiplier).round_dp(MONEY_SCALE)
}

/// Full pricing breakdown for reporting
pub fn pricing_breakdown(
    base_price: Decimal,
    custom_markup: Option<Decimal>,
    global_markup: Decimal,
) -> PricingBreakdown {
    let (markup_percent, markup_source) = effective_markup(custom_markup, global_markup);
    let final_price = apply_markup(base_price, markup_percent);

    PricingBreakdown {
        base_price,
        markup_percent,
        markup_source,
        markup_amount: (final_price - base_price).round_dp(MONEY_SCALE),
        final_price,
    }
}
