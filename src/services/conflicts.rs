//! Pattern conflict detection
//!
//! Two active categories sharing a pattern classify differently depending on
//! their priority order; this module surfaces those overlaps so operators
//! can fix the rule set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::Category;

/// How serious a pattern overlap is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    /// Exactly one shared pattern
    Medium,
    /// More than one shared pattern
    High,
}

/// A pattern overlap between two active categories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConflict {
    pub category1: String,
    pub category2: String,
    /// Shared normalized patterns, sorted
    pub common_patterns: Vec<String>,
    pub severity: ConflictSeverity,
}

/// Pairwise-compare active categories and report shared patterns
///
/// Each unordered pair is reported once; the common-pattern set is symmetric
/// by construction. O(n²) over active categories, which stay in the tens.
pub fn find_conflicts(categories: &[Category]) -> Vec<PatternConflict> {
    let active: Vec<&Category> = categories.iter().filter(|c| c.is_active).collect();
    let pattern_sets: Vec<BTreeSet<String>> = active
        .iter()
        .map(|c| c.normalized_patterns().into_iter().collect())
        .collect();

    let mut conflicts = Vec::new();
    for i in 0..active.len() {
        for j in (i + 1)..active.len() {
            let common: Vec<String> = pattern_sets[i]
                .intersection(&pattern_sets[j])
                .cloned()
                .collect();
            if common.is_empty() {
                continue;
            }

            let severity = if common.len() > 1 {
                ConflictSeverity::High
            } else {
                ConflictSeverity::Medium
            };
            conflicts.push(PatternConflict {
                category1: active[i].name.clone(),
                category2: active[j].name.clone(),
                common_patterns: common,
                severity,
            });
        }
    }

    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::category::NewCategory;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn category(name: &str, patterns: &[&str], active: bool) -> Category {
        let mut category = Category::new(
            NewCategory {
                name: name.to_string(),
                display_name: name.to_string(),
                base_price_per_minute: dec!(0.02),
                patterns: patterns.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            },
            Decimal::ZERO,
            "EUR",
            0,
        )
        .unwrap();
        category.is_active = active;
        category
    }

    #[test]
    fn test_single_shared_pattern_is_medium() {
        let categories = vec![
            category("A", &["FAX"], true),
            category("B", &["FAX", "TELEFAX"], true),
        ];

        let conflicts = find_conflicts(&categories);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].category1, "A");
        assert_eq!(conflicts[0].category2, "B");
        assert_eq!(conflicts[0].common_patterns, vec!["FAX"]);
        assert_eq!(conflicts[0].severity, ConflictSeverity::Medium);
    }

    #[test]
    fn test_multiple_shared_patterns_is_high() {
        let categories = vec![
            category("A", &["FAX", "telefax ", "EXTRA"], true),
            category("B", &["TELEFAX", "FAX"], true),
        ];

        let conflicts = find_conflicts(&categories);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].common_patterns, vec!["FAX", "TELEFAX"]);
        assert_eq!(conflicts[0].severity, ConflictSeverity::High);
    }

    #[test]
    fn test_symmetry() {
        let a = category("A", &["FAX", "VERDE"], true);
        let b = category("B", &["VERDE", "FAX", "800"], true);

        let forward = find_conflicts(&[a.clone(), b.clone()]);
        let reverse = find_conflicts(&[b, a]);
        assert_eq!(forward[0].common_patterns, reverse[0].common_patterns);
        assert_eq!(forward[0].severity, reverse[0].severity);
    }

    #[test]
    fn test_inactive_categories_ignored() {
        let categories = vec![
            category("A", &["FAX"], true),
            category("B", &["FAX"], false),
        ];
        assert!(find_conflicts(&categories).is_empty());
    }

    #[test]
    fn test_disjoint_patterns_no_conflict() {
        let categories = vec![
            category("A", &["FISSO"], true),
            category("B", &["CELLULARE"], true),
        ];
        assert!(find_conflicts(&categories).is_empty());
    }
}
