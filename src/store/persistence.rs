//! Durable mirror of the category configuration
//!
//! The on-disk format is a JSON object keyed by uppercase category name with
//! the scalar `global_markup_percent` as a sibling key at the same level.
//! Saves are transactional: the previous file is first copied to a
//! timestamped backup, the new content is written to a temporary file and
//! atomically renamed over the original. Backups accumulate up to the
//! configured retention count.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::models::Category;
use crate::EngineResult;

/// Serialized shape of the category configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CategoryFile {
    /// Markup applied to categories without a custom markup
    pub global_markup_percent: Decimal,

    /// Categories keyed by normalized name
    #[serde(flatten)]
    pub categories: BTreeMap<String, Category>,
}

/// Read and parse the configuration file
pub(crate) fn load_file(path: &Path) -> EngineResult<CategoryFile> {
    let data = fs::read_to_string(path).map_err(|e| {
        EngineError::Persistence(format!("cannot read {}: {e}", path.display()))
    })?;
    let file: CategoryFile = serde_json::from_str(&data)?;

    info!(
        path = %path.display(),
        categories = file.categories.len(),
        "category configuration loaded"
    );
    Ok(file)
}

/// Persist the configuration file with backup-on-write
pub(crate) fn save_file(
    path: &Path,
    file: &CategoryFile,
    backup_retention: usize,
) -> EngineResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    if path.exists() {
        let backup = backup_path(path);
        fs::copy(path, &backup).map_err(|e| {
            EngineError::Persistence(format!("cannot back up {}: {e}", path.display()))
        })?;
        info!(backup = %backup.display(), "category configuration backed up");

        if backup_retention > 0 {
            if let Err(e) = prune_backups(path, backup_retention) {
                warn!(error = %e, "failed to prune old category backups");
            }
        }
    }

    let json = serde_json::to_string_pretty(file)?;
    let tmp = sibling(path, |name| format!("{name}.tmp"));
    fs::write(&tmp, json).map_err(|e| {
        EngineError::Persistence(format!("cannot write {}: {e}", tmp.display()))
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        EngineError::Persistence(format!("cannot replace {}: {e}", path.display()))
    })?;

    debug!(path = %path.display(), "category configuration saved");
    Ok(())
}

fn backup_path(path: &Path) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    sibling(path, |name| format!("{name}.backup.{stamp}"))
}

fn sibling(path: &Path, rename: impl Fn(&str) -> String) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(rename(&name))
}

/// Delete the oldest backups beyond `keep`
///
/// Backup names embed a `%Y%m%d_%H%M%S` stamp, so lexicographic order is
/// chronological order.
fn prune_backups(path: &Path, keep: usize) -> EngineResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let prefix = format!(
        "{}.backup.",
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    );

    let mut backups: Vec<PathBuf> = fs::read_dir(&parent)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with(&prefix))
                .unwrap_or(false)
        })
        .collect();

    if backups.len() <= keep {
        return Ok(());
    }

    backups.sort();
    let excess = backups.len() - keep;
    for old in backups.into_iter().take(excess) {
        fs::remove_file(&old)?;
        debug!(backup = %old.display(), "old category backup pruned");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::defaults::default_categories;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn sample_file() -> CategoryFile {
        let categories = default_categories(dec!(10), "EUR")
            .into_iter()
            .map(|c| (c.name.clone(), c))
            .collect();
        CategoryFile {
            global_markup_percent: dec!(10),
            categories,
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cdr_categories.json");
        let file = sample_file();

        save_file(&path, &file, 0).unwrap();
        let loaded = load_file(&path).unwrap();

        assert_eq!(loaded.global_markup_percent, dec!(10));
        assert_eq!(loaded.categories.len(), file.categories.len());
        let mobili = &loaded.categories["MOBILI"];
        assert_eq!(mobili.base_price_per_minute, dec!(0.15));
        assert_eq!(mobili.price_with_markup, dec!(0.165));
        assert_eq!(mobili.patterns, file.categories["MOBILI"].patterns);
    }

    #[test]
    fn test_sibling_global_markup_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cdr_categories.json");
        save_file(&path, &sample_file(), 0).unwrap();

        // the markup scalar sits next to the category names, not nested
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get("global_markup_percent").is_some());
        assert!(raw.get("FISSI").is_some());
        assert!(raw["FISSI"].get("patterns").is_some());
    }

    #[test]
    fn test_backup_created_on_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cdr_categories.json");

        save_file(&path, &sample_file(), 0).unwrap();
        save_file(&path, &sample_file(), 0).unwrap();

        let backups: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".backup."))
            .collect();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn test_backup_pruning() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cdr_categories.json");
        let file = sample_file();

        save_file(&path, &file, 2).unwrap();
        for i in 0..5 {
            // distinct names so same-second saves do not collapse backups
            let stamped = sibling(&path, |name| format!("{name}.backup.20240101_00000{i}"));
            fs::write(&stamped, "{}").unwrap();
        }
        save_file(&path, &file, 2).unwrap();

        let backups: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".backup."))
            .collect();
        assert_eq!(backups.len(), 2);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, EngineError::Persistence(_)));
    }

    #[test]
    fn test_load_corrupt_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.json");
        fs::write(&path, "not json").unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, EngineError::Serialization(_)));
    }
}
