//! Category store
//!
//! Owns the category set and the global markup percent. The in-memory state
//! is the source of truth; the JSON configuration file is a durable mirror
//! written through [`persistence`]. Every operation that mutates state runs
//! as a critical section behind one internal lock: validate, apply to
//! memory, persist, and roll the memory back if persisting fails, so the
//! observable state always matches the last successfully persisted state.

pub mod defaults;
mod export;
mod persistence;

pub use self::export::{ImportReport, RowError};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::category::{clean_patterns, normalize_name, validate_markup, validate_price};
use crate::models::{BillingUnit, Category, CategoryUpdate, ClassificationResult, NewCategory};
use crate::services::conflicts::{self, PatternConflict};
use crate::services::pricing::{self, PricingBreakdown};
use crate::services::{classifier, costing};
use crate::EngineResult;

use self::persistence::CategoryFile;

/// Categories protected from deletion by business policy
pub const ESSENTIAL_CATEGORIES: &[&str] = &["FISSI", "MOBILI"];

/// Gap between auto-assigned priorities
const PRIORITY_STEP: i32 = 10;

/// Aggregate statistics over the category set
#[derive(Debug, Clone, serde::Serialize)]
pub struct CategoryStatistics {
    pub total_categories: usize,
    pub active_categories: usize,
    pub inactive_categories: usize,
    pub total_patterns: usize,
    pub price_range: PriceRange,
    /// Distinct currency codes in use, sorted
    pub currencies: Vec<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Min/max/average over base prices
#[derive(Debug, Clone, serde::Serialize)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
    pub average: Decimal,
}

#[derive(Debug, Clone)]
struct StoreInner {
    categories: BTreeMap<String, Category>,
    global_markup_percent: Decimal,
}

/// Persistent store of pricing categories
pub struct CategoryStore {
    path: PathBuf,
    default_currency: String,
    backup_retention: usize,
    inner: Mutex<StoreInner>,
}

impl CategoryStore {
    /// Open the store at the configured path
    ///
    /// Loads the persisted category set when the file exists; otherwise
    /// bootstraps the default set under the configured global markup and
    /// persists it.
    pub fn open(config: &EngineConfig) -> EngineResult<Self> {
        let path = config.categories_path();
        let default_markup = Decimal::try_from(config.default_global_markup_percent)
            .map_err(|e| EngineError::Config(format!("invalid default global markup: {e}")))?;

        let inner = if path.exists() {
            let file = persistence::load_file(&path)?;
            StoreInner {
                categories: file.categories,
                global_markup_percent: file.global_markup_percent,
            }
        } else {
            info!(path = %path.display(), "category configuration missing, bootstrapping defaults");
            let categories = defaults::default_categories(default_markup, &config.default_currency)
                .into_iter()
                .map(|c| (c.name.clone(), c))
                .collect();
            let inner = StoreInner {
                categories,
                global_markup_percent: default_markup,
            };
            persistence::save_file(
                &path,
                &CategoryFile {
                    global_markup_percent: inner.global_markup_percent,
                    categories: inner.categories.clone(),
                },
                config.backup_retention,
            )?;
            inner
        };

        Ok(Self {
            path,
            default_currency: config.default_currency.clone(),
            backup_retention: config.backup_retention,
            inner: Mutex::new(inner),
        })
    }

    /// Path of the persisted configuration file
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ==================== CRUD ====================

    /// Add a new category
    pub fn add(&self, draft: NewCategory) -> EngineResult<Category> {
        let mut inner = self.lock()?;

        let fallback_priority = next_priority(&inner.categories);
        let category = Category::new(
            draft,
            inner.global_markup_percent,
            &self.default_currency,
            fallback_priority,
        )?;

        if inner.categories.contains_key(&category.name) {
            return Err(EngineError::DuplicateCategory(category.name));
        }

        let snapshot = inner.clone();
        inner
            .categories
            .insert(category.name.clone(), category.clone());
        self.persist_or_rollback(&mut inner, snapshot)?;

        info!(category = %category.name, "category added");
        Ok(category)
    }

    /// Apply a partial update to an existing category
    ///
    /// Every supplied field is validated before any field is applied; an
    /// invalid value rejects the whole update and leaves the store unchanged.
    pub fn update(&self, name: &str, update: CategoryUpdate) -> EngineResult<Category> {
        let mut inner = self.lock()?;
        let name = normalize_name(name);

        let current = inner
            .categories
            .get(&name)
            .ok_or_else(|| EngineError::NotFound(name.clone()))?;

        // validate everything up front
        if let Some(price) = update.base_price_per_minute {
            validate_price(price)?;
        }
        let cleaned_patterns = match &update.patterns {
            Some(patterns) => Some(clean_patterns(patterns)?),
            None => None,
        };
        if let Some(Some(markup)) = update.custom_markup_percent {
            validate_markup(markup)?;
        }

        let mut updated = current.clone();
        if let Some(display_name) = update.display_name {
            updated.display_name = display_name.trim().to_string();
        }
        if let Some(price) = update.base_price_per_minute {
            updated.base_price_per_minute = price;
        }
        if let Some(patterns) = cleaned_patterns {
            updated.patterns = patterns;
        }
        if let Some(currency) = update.currency {
            updated.currency = currency;
        }
        if let Some(description) = update.description {
            updated.description = description.trim().to_string();
        }
        if let Some(is_active) = update.is_active {
            updated.is_active = is_active;
        }
        if let Some(priority) = update.priority {
            updated.priority = priority;
        }
        if let Some(markup) = update.custom_markup_percent {
            updated.custom_markup_percent = markup;
        }

        updated.refresh_pricing(inner.global_markup_percent);
        updated.updated_at = Utc::now();

        let snapshot = inner.clone();
        inner.categories.insert(name.clone(), updated.clone());
        self.persist_or_rollback(&mut inner, snapshot)?;

        info!(category = %name, "category updated");
        Ok(updated)
    }

    /// Delete a category; essential categories are protected
    pub fn delete(&self, name: &str) -> EngineResult<()> {
        let mut inner = self.lock()?;
        let name = normalize_name(name);

        if !inner.categories.contains_key(&name) {
            return Err(EngineError::NotFound(name));
        }
        if ESSENTIAL_CATEGORIES.contains(&name.as_str()) {
            return Err(EngineError::Protected(name));
        }

        let snapshot = inner.clone();
        inner.categories.remove(&name);
        self.persist_or_rollback(&mut inner, snapshot)?;

        info!(category = %name, "category deleted");
        Ok(())
    }

    /// Fetch one category by name
    pub fn get(&self, name: &str) -> EngineResult<Option<Category>> {
        let inner = self.lock()?;
        Ok(inner.categories.get(&normalize_name(name)).cloned())
    }

    /// All categories in classification order (priority, then name)
    pub fn list_all(&self) -> EngineResult<Vec<Category>> {
        let inner = self.lock()?;
        Ok(ordered(&inner.categories))
    }

    /// Active categories in classification order
    pub fn list_active(&self) -> EngineResult<Vec<Category>> {
        let inner = self.lock()?;
        Ok(ordered(&inner.categories)
            .into_iter()
            .filter(|c| c.is_active)
            .collect())
    }

    // ==================== markup ====================

    /// Current global markup percent
    pub fn global_markup(&self) -> EngineResult<Decimal> {
        let inner = self.lock()?;
        Ok(inner.global_markup_percent)
    }

    /// Change the global markup and recompute dependent prices
    ///
    /// Every category without a custom markup gets its cached price
    /// recomputed; categories with a custom markup are untouched. Returns
    /// the number of recomputed categories.
    pub fn set_global_markup(&self, percent: Decimal) -> EngineResult<usize> {
        validate_markup(percent)?;
        let mut inner = self.lock()?;

        let snapshot = inner.clone();
        inner.global_markup_percent = percent;

        let now = Utc::now();
        let mut affected = 0;
        for category in inner.categories.values_mut() {
            if category.custom_markup_percent.is_none() {
                category.refresh_pricing(percent);
                category.updated_at = now;
                affected += 1;
            }
        }

        self.persist_or_rollback(&mut inner, snapshot)?;

        info!(global_markup = %percent, affected, "global markup updated");
        Ok(affected)
    }

    /// Pricing breakdown for one category under the current global markup
    pub fn pricing_breakdown(&self, name: &str) -> EngineResult<PricingBreakdown> {
        let inner = self.lock()?;
        let name = normalize_name(name);
        let category = inner
            .categories
            .get(&name)
            .ok_or(EngineError::NotFound(name))?;

        Ok(pricing::pricing_breakdown(
            category.base_price_per_minute,
            category.custom_markup_percent,
            inner.global_markup_percent,
        ))
    }

    // ==================== classification ====================

    /// Classify a call type and compute its cost in one step
    ///
    /// Categories are tried in persisted priority order; the first match
    /// wins. Unmatched call types produce the UNKNOWN result with zero
    /// price.
    pub fn classify_and_cost(
        &self,
        call_type: &str,
        duration_seconds: i32,
        unit: BillingUnit,
        use_markup: bool,
    ) -> EngineResult<ClassificationResult> {
        let inner = self.lock()?;
        let active: Vec<Category> = ordered(&inner.categories)
            .into_iter()
            .filter(|c| c.is_active)
            .collect();

        let matched = classifier::classify(call_type, &active);
        if matched.is_none() {
            warn!(call_type, "unclassified call type, billing at zero");
        }

        Ok(costing::cost_call(
            matched,
            call_type,
            duration_seconds,
            unit,
            use_markup,
            inner.global_markup_percent,
            &self.default_currency,
        ))
    }

    /// Report pattern overlaps between active categories
    pub fn find_conflicts(&self) -> EngineResult<Vec<PatternConflict>> {
        let inner = self.lock()?;
        Ok(conflicts::find_conflicts(&ordered(&inner.categories)))
    }

    // ==================== maintenance ====================

    /// Aggregate statistics over the category set
    pub fn statistics(&self) -> EngineResult<CategoryStatistics> {
        let inner = self.lock()?;
        let categories: Vec<&Category> = inner.categories.values().collect();

        let active = categories.iter().filter(|c| c.is_active).count();
        let prices: Vec<Decimal> = categories
            .iter()
            .map(|c| c.base_price_per_minute)
            .collect();
        let average = if prices.is_empty() {
            Decimal::ZERO
        } else {
            (prices.iter().sum::<Decimal>() / Decimal::from(prices.len() as u64)).round_dp(4)
        };

        let mut currencies: Vec<String> = categories.iter().map(|c| c.currency.clone()).collect();
        currencies.sort();
        currencies.dedup();

        Ok(CategoryStatistics {
            total_categories: categories.len(),
            active_categories: active,
            inactive_categories: categories.len() - active,
            total_patterns: categories.iter().map(|c| c.patterns.len()).sum(),
            price_range: PriceRange {
                min: prices.iter().min().copied().unwrap_or_default(),
                max: prices.iter().max().copied().unwrap_or_default(),
                average,
            },
            currencies,
            last_modified: categories.iter().map(|c| c.updated_at).max(),
        })
    }

    /// Replace the category set with the default one and persist it
    pub fn reset_to_defaults(&self) -> EngineResult<usize> {
        let mut inner = self.lock()?;

        let snapshot = inner.clone();
        inner.categories =
            defaults::default_categories(inner.global_markup_percent, &self.default_currency)
                .into_iter()
                .map(|c| (c.name.clone(), c))
                .collect();
        let count = inner.categories.len();

        self.persist_or_rollback(&mut inner, snapshot)?;

        info!(count, "categories reset to defaults");
        Ok(count)
    }

    // ==================== internals ====================

    fn lock(&self) -> EngineResult<MutexGuard<'_, StoreInner>> {
        self.inner
            .lock()
            .map_err(|_| EngineError::Internal("category store lock poisoned".to_string()))
    }

    /// Persist the working state; restore the snapshot if persisting fails
    fn persist_or_rollback(
        &self,
        inner: &mut MutexGuard<'_, StoreInner>,
        snapshot: StoreInner,
    ) -> EngineResult<()> {
        let file = CategoryFile {
            global_markup_percent: inner.global_markup_percent,
            categories: inner.categories.clone(),
        };
        if let Err(e) = persistence::save_file(&self.path, &file, self.backup_retention) {
            warn!(error = %e, "save failed, rolling back in-memory state");
            **inner = snapshot;
            return Err(e);
        }
        Ok(())
    }
}

/// Categories sorted by (priority, name)
fn ordered(categories: &BTreeMap<String, Category>) -> Vec<Category> {
    let mut list: Vec<Category> = categories.values().cloned().collect();
    list.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
    list
}

/// Next free auto-assigned priority
fn next_priority(categories: &BTreeMap<String, Category>) -> i32 {
    categories
        .values()
        .map(|c| c.priority)
        .max()
        .map(|max| max.saturating_add(PRIORITY_STEP))
        .unwrap_or(PRIORITY_STEP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn store() -> (TempDir, CategoryStore) {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig {
            config_directory: dir.path().to_string_lossy().to_string(),
            ..Default::default()
        };
        let store = CategoryStore::open(&config).unwrap();
        (dir, store)
    }

    fn draft(name: &str, price: Decimal, patterns: &[&str]) -> NewCategory {
        NewCategory {
            name: name.to_string(),
            display_name: name.to_string(),
            base_price_per_minute: price,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_bootstrap_creates_defaults() {
        let (_dir, store) = store();
        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 5);
        assert!(store.path().exists());
        // classification order follows priority
        assert_eq!(all[0].name, "FISSI");
        assert_eq!(all[1].name, "MOBILI");
    }

    #[test]
    fn test_add_duplicate_rejected() {
        let (_dir, store) = store();
        store.add(draft("PREMIUM", dec!(1), &["899"])).unwrap();

        let err = store
            .add(draft("premium ", dec!(2), &["892"]))
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateCategory(_)));
        // first add still in place
        let premium = store.get("PREMIUM").unwrap().unwrap();
        assert_eq!(premium.base_price_per_minute, dec!(1));
    }

    #[test]
    fn test_update_all_or_nothing() {
        let (_dir, store) = store();
        let before = store.get("FAX").unwrap().unwrap();

        // valid display name + invalid price: nothing must change
        let err = store
            .update(
                "FAX",
                CategoryUpdate {
                    display_name: Some("Fax services".to_string()),
                    base_price_per_minute: Some(dec!(-1)),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::NegativePrice(_)));

        let after = store.get("FAX").unwrap().unwrap();
        assert_eq!(after.display_name, before.display_name);
        assert_eq!(after.base_price_per_minute, before.base_price_per_minute);
    }

    #[test]
    fn test_update_recomputes_price() {
        let (_dir, store) = store();
        store.set_global_markup(dec!(10)).unwrap();

        let updated = store
            .update(
                "MOBILI",
                CategoryUpdate {
                    base_price_per_minute: Some(dec!(0.20)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.price_with_markup, dec!(0.22));
        assert!(updated.updated_at >= updated.created_at);
    }

    #[test]
    fn test_clear_custom_markup_returns_to_global() {
        let (_dir, store) = store();
        store.set_global_markup(dec!(20)).unwrap();

        let with_custom = store
            .update(
                "FAX",
                CategoryUpdate {
                    custom_markup_percent: Some(Some(dec!(100))),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(with_custom.price_with_markup, dec!(0.04));

        let cleared = store
            .update(
                "FAX",
                CategoryUpdate {
                    custom_markup_percent: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.price_with_markup, dec!(0.024));
    }

    #[test]
    fn test_delete_essential_protected() {
        let (_dir, store) = store();
        let err = store.delete("FISSI").unwrap_err();
        assert!(matches!(err, EngineError::Protected(_)));
        assert!(store.get("FISSI").unwrap().is_some());

        store.delete("FAX").unwrap();
        assert!(store.get("FAX").unwrap().is_none());
    }

    #[test]
    fn test_delete_unknown() {
        let (_dir, store) = store();
        let err = store.delete("NOPE").unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn test_set_global_markup_scope() {
        let (_dir, store) = store();

        let mut premium = draft("PREMIUM", dec!(1.00), &["899"]);
        premium.custom_markup_percent = Some(dec!(50));
        store.add(premium).unwrap();

        // five defaults inherit the global markup, PREMIUM does not
        let affected = store.set_global_markup(dec!(25)).unwrap();
        assert_eq!(affected, 5);

        assert_eq!(
            store.get("PREMIUM").unwrap().unwrap().price_with_markup,
            dec!(1.50)
        );
        assert_eq!(
            store.get("MOBILI").unwrap().unwrap().price_with_markup,
            dec!(0.1875)
        );
    }

    #[test]
    fn test_set_global_markup_out_of_range() {
        let (_dir, store) = store();
        assert!(matches!(
            store.set_global_markup(dec!(1001)).unwrap_err(),
            EngineError::MarkupOutOfRange(_)
        ));
        assert!(matches!(
            store.set_global_markup(dec!(-101)).unwrap_err(),
            EngineError::MarkupOutOfRange(_)
        ));
    }

    #[test]
    fn test_reopen_round_trip() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig {
            config_directory: dir.path().to_string_lossy().to_string(),
            ..Default::default()
        };

        {
            let store = CategoryStore::open(&config).unwrap();
            store.add(draft("PREMIUM", dec!(1), &["899"])).unwrap();
            store.set_global_markup(dec!(10)).unwrap();
        }

        let reopened = CategoryStore::open(&config).unwrap();
        assert_eq!(reopened.list_all().unwrap().len(), 6);
        assert_eq!(reopened.global_markup().unwrap(), dec!(10));
        let premium = reopened.get("PREMIUM").unwrap().unwrap();
        assert_eq!(premium.base_price_per_minute, dec!(1));
        assert_eq!(premium.price_with_markup, dec!(1.10));
    }

    #[test]
    fn test_classify_and_cost_priority_order() {
        let (_dir, store) = store();

        // overlaps MOBILI's "TIM" pattern but runs first
        let mut vip = draft("VIP", dec!(0.50), &["TIM"]);
        vip.priority = Some(1);
        store.add(vip).unwrap();

        let result = store
            .classify_and_cost("CELLULARE TIM", 60, BillingUnit::PerMinute, true)
            .unwrap();
        assert_eq!(result.category_name, "VIP");
    }

    #[test]
    fn test_statistics() {
        let (_dir, store) = store();
        store
            .update(
                "FAX",
                CategoryUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();

        let stats = store.statistics().unwrap();
        assert_eq!(stats.total_categories, 5);
        assert_eq!(stats.active_categories, 4);
        assert_eq!(stats.inactive_categories, 1);
        assert_eq!(stats.price_range.min, dec!(0));
        assert_eq!(stats.price_range.max, dec!(0.25));
        assert_eq!(stats.currencies, vec!["EUR".to_string()]);
        assert!(stats.last_modified.is_some());
    }

    #[test]
    fn test_reset_to_defaults() {
        let (_dir, store) = store();
        store.add(draft("PREMIUM", dec!(1), &["899"])).unwrap();
        store.delete("FAX").unwrap();

        let count = store.reset_to_defaults().unwrap();
        assert_eq!(count, 5);
        assert!(store.get("PREMIUM").unwrap().is_none());
        assert!(store.get("FAX").unwrap().is_some());
    }

    #[test]
    fn test_save_failure_rolls_back() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig {
            config_directory: dir.path().to_string_lossy().to_string(),
            ..Default::default()
        };
        let store = CategoryStore::open(&config).unwrap();

        // replace the config file with a directory so the save cannot land
        std::fs::remove_file(store.path()).unwrap();
        std::fs::create_dir(store.path()).unwrap();

        let err = store.add(draft("PREMIUM", dec!(1), &["899"])).unwrap_err();
        assert!(matches!(err, EngineError::Persistence(_)));
        // the failed add is not observable
        assert!(store.get("PREMIUM").unwrap().is_none());
        assert_eq!(store.list_all().unwrap().len(), 5);
    }
}
