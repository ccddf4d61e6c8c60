//! Factory for the default category set
//!
//! Invoked only on first-run bootstrap and by `reset_to_defaults`; there is
//! no ambient default state anywhere else.

use chrono::Utc;
use rust_decimal::Decimal;

use crate::models::Category;

/// Build the default category list under the given global markup
///
/// Priorities are spaced by ten so operators can slot custom categories in
/// between without renumbering.
pub fn default_categories(global_markup: Decimal, currency: &str) -> Vec<Category> {
    vec![
        category(
            "FISSI",
            "Chiamate Fisso",
            Decimal::new(2, 2),
            &[
                "INTERRURBANE URBANE",
                "INTERURBANE URBANE",
                "URBANE",
                "FISSO",
                "RETE FISSA",
                "TELEFONIA FISSA",
                "LOCALE",
                "DISTRETTUALE",
            ],
            "Chiamate verso numeri fissi nazionali",
            10,
            global_markup,
            currency,
        ),
        category(
            "MOBILI",
            "Chiamate Mobile",
            Decimal::new(15, 2),
            &[
                "CELLULARE",
                "MOBILE",
                "RETE MOBILE",
                "TELEFONIA MOBILE",
                "GSM",
                "UMTS",
                "LTE",
                "WIND",
                "TIM",
                "VODAFONE",
                "ILIAD",
            ],
            "Chiamate verso numeri mobili",
            20,
            global_markup,
            currency,
        ),
        category(
            "FAX",
            "Servizi Fax",
            Decimal::new(2, 2),
            &["FAX", "TELEFAX", "FACSIMILE"],
            "Servizi di fax",
            30,
            global_markup,
            currency,
        ),
        category(
            "NUMERI_VERDI",
            "Numeri Verdi",
            Decimal::ZERO,
            &["NUMERO VERDE", "VERDE", "800", "GRATUITO", "TOLL FREE"],
            "Numeri verdi e gratuiti",
            40,
            global_markup,
            currency,
        ),
        category(
            "INTERNAZIONALI",
            "Chiamate Internazionali",
            Decimal::new(25, 2),
            &[
                "INTERNAZIONALE",
                "INTERNATIONAL",
                "ESTERO",
                "UE",
                "EUROPA",
                "MONDO",
                "ROAMING",
                "EXTRA UE",
            ],
            "Chiamate internazionali",
            50,
            global_markup,
            currency,
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn category(
    name: &str,
    display_name: &str,
    base_price: Decimal,
    patterns: &[&str],
    description: &str,
    priority: i32,
    global_markup: Decimal,
    currency: &str,
) -> Category {
    let now = Utc::now();
    let mut category = Category {
        name: name.to_string(),
        display_name: display_name.to_string(),
        base_price_per_minute: base_price,
        currency: currency.to_string(),
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
        description: description.to_string(),
        is_active: true,
        priority,
        custom_markup_percent: None,
        price_with_markup: Decimal::ZERO,
        created_at: now,
        updated_at: now,
    };
    category.refresh_pricing(global_markup);
    category
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_set() {
        let categories = default_categories(Decimal::ZERO, "EUR");
        assert_eq!(categories.len(), 5);

        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["FISSI", "MOBILI", "FAX", "NUMERI_VERDI", "INTERNAZIONALI"]
        );
        assert!(categories.iter().all(|c| c.is_active));
        assert!(categories.iter().all(|c| !c.patterns.is_empty()));
    }

    #[test]
    fn test_defaults_priced_under_global_markup() {
        let categories = default_categories(dec!(10), "EUR");
        let mobili = categories.iter().find(|c| c.name == "MOBILI").unwrap();
        assert_eq!(mobili.base_price_per_minute, dec!(0.15));
        assert_eq!(mobili.price_with_markup, dec!(0.165));
    }
}
