//! Call cost computation
//!
//! Turns a classification outcome and a call duration into a
//! [`ClassificationResult`]. Both billing units ultimately bill
//! `price_per_minute * minutes`; per-second billing only reports the billed
//! duration in seconds instead of minutes. Monetary values are rounded to
//! four decimals here, at the point of computation.

use rust_decimal::Decimal;

use crate::models::classification::{
    BillingUnit, ClassificationResult, UNKNOWN_CATEGORY_DISPLAY_NAME, UNKNOWN_CATEGORY_NAME,
};
use crate::models::Category;
use crate::services::pricing::{self, MarkupSource, MONEY_SCALE};

/// Cost one call under the given category match
///
/// `category = None` synthesizes the UNKNOWN result: zero price, zero
/// markup, zero cost, in the engine's default currency.
pub fn cost_call(
    category: Option<&Category>,
    raw_call_type: &str,
    duration_seconds: i32,
    unit: BillingUnit,
    use_markup: bool,
    global_markup: Decimal,
    default_currency: &str,
) -> ClassificationResult {
    let minutes = Decimal::from(duration_seconds) / Decimal::from(60);
    let duration_billed = match unit {
        BillingUnit::PerMinute => minutes.round_dp(MONEY_SCALE),
        BillingUnit::PerSecond => Decimal::from(duration_seconds),
    };

    match category {
        Some(category) => {
            let (markup_percent, markup_source) =
                pricing::effective_markup(category.custom_markup_percent, global_markup);
            let price_used = if use_markup {
                category.price_with_markup
            } else {
                category.base_price_per_minute
            };

            ClassificationResult {
                category_name: category.name.clone(),
                category_display_name: category.display_name.clone(),
                matched: true,
                original_call_type: raw_call_type.to_string(),
                price_per_minute_base: category.base_price_per_minute,
                price_per_minute_with_markup: category.price_with_markup,
                price_per_minute_used: price_used,
                markup_percent_applied: if use_markup {
                    markup_percent
                } else {
                    Decimal::ZERO
                },
                markup_source: if use_markup {
                    markup_source
                } else {
                    MarkupSource::None
                },
                billing_unit: unit,
                duration_billed,
                cost_calculated: (price_used * minutes).round_dp(MONEY_SCALE),
                currency: category.currency.clone(),
            }
        }
        None => ClassificationResult {
            category_name: UNKNOWN_CATEGORY_NAME.to_string(),
            category_display_name: UNKNOWN_CATEGORY_DISPLAY_NAME.to_string(),
            matched: false,
            original_call_type: raw_call_type.to_string(),
            price_per_minute_base: Decimal::ZERO,
            price_per_minute_with_markup: Decimal::ZERO,
            price_per_minute_used: Decimal::ZERO,
            markup_percent_applied: Decimal::ZERO,
            markup_source: MarkupSource::None,
            billing_unit: unit,
            duration_billed,
            cost_calculated: Decimal::ZERO,
            currency: default_currency.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::category::NewCategory;
    use rust_decimal_macros::dec;

    fn mobili(global_markup: Decimal) -> Category {
        Category::new(
            NewCategory {
                name: "MOBILI".to_string(),
                display_name: "Mobile calls".to_string(),
                base_price_per_minute: dec!(0.15),
                patterns: vec!["CELLULARE".to_string()],
                ..Default::default()
            },
            global_markup,
            "EUR",
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_per_minute_billing_with_markup() {
        let category = mobili(dec!(10));
        let result = cost_call(
            Some(&category),
            "CELLULARE VODAFONE",
            300,
            BillingUnit::PerMinute,
            true,
            dec!(10),
            "EUR",
        );

        assert!(result.matched);
        assert_eq!(result.price_per_minute_used, dec!(0.165));
        assert_eq!(result.duration_billed, dec!(5));
        assert_eq!(result.cost_calculated, dec!(0.825));
        assert_eq!(result.markup_source, MarkupSource::Global);
        assert_eq!(result.markup_percent_applied, dec!(10));
    }

    #[test]
    fn test_per_second_billing_same_cost() {
        let category = mobili(dec!(0));
        let result = cost_call(
            Some(&category),
            "CELLULARE TIM",
            90,
            BillingUnit::PerSecond,
            false,
            dec!(0),
            "EUR",
        );

        // billed duration is in seconds, cost is still price * minutes
        assert_eq!(result.duration_billed, dec!(90));
        assert_eq!(result.cost_calculated, dec!(0.225));
        assert_eq!(result.markup_source, MarkupSource::None);
    }

    #[test]
    fn test_base_price_when_markup_disabled() {
        let category = mobili(dec!(10));
        let result = cost_call(
            Some(&category),
            "CELLULARE",
            60,
            BillingUnit::PerMinute,
            false,
            dec!(10),
            "EUR",
        );

        assert_eq!(result.price_per_minute_used, dec!(0.15));
        assert_eq!(result.cost_calculated, dec!(0.15));
        assert_eq!(result.markup_percent_applied, dec!(0));
    }

    #[test]
    fn test_unknown_fallback() {
        let result = cost_call(
            None,
            "CHIAMATA SCONOSCIUTA",
            300,
            BillingUnit::PerMinute,
            true,
            dec!(10),
            "EUR",
        );

        assert!(!result.matched);
        assert_eq!(result.category_name, UNKNOWN_CATEGORY_NAME);
        assert_eq!(result.cost_calculated, dec!(0));
        assert_eq!(result.price_per_minute_used, dec!(0));
        assert_eq!(result.duration_billed, dec!(5));
        assert_eq!(result.currency, "EUR");
    }
}
