//! Engine configuration
//!
//! Centralized configuration using the `config` crate. Values are resolved
//! from built-in defaults, an optional `config/default` file and `CDR_`
//! prefixed environment variables, in that order.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Engine configuration
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Directory holding the persisted category configuration
    #[serde(default = "default_config_directory")]
    pub config_directory: String,

    /// File name of the persisted category configuration
    #[serde(default = "default_categories_file")]
    pub categories_file: String,

    /// Currency assigned to categories that do not specify one
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Global markup percent used on first-run bootstrap
    #[serde(default)]
    pub default_global_markup_percent: f64,

    /// Number of backup copies kept next to the category file; 0 keeps all
    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,
}

fn default_config_directory() -> String {
    "config".to_string()
}

fn default_categories_file() -> String {
    "cdr_categories.json".to_string()
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_backup_retention() -> usize {
    10
}

impl EngineConfig {
    /// Load configuration from defaults, optional config file and environment
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("config_directory", "config")?
            .set_default("categories_file", "cdr_categories.json")?
            .set_default("default_currency", "EUR")?
            .set_default("default_global_markup_percent", 0.0)?
            .set_default("backup_retention", 10)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(Environment::with_prefix("CDR").try_parsing(true))
            .build()?;

        config.try_deserialize()
    }

    /// Full path of the persisted category configuration file
    pub fn categories_path(&self) -> PathBuf {
        PathBuf::from(&self.config_directory).join(&self.categories_file)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            config_directory: default_config_directory(),
            categories_file: default_categories_file(),
            default_currency: default_currency(),
            default_global_markup_percent: 0.0,
            backup_retention: default_backup_retention(),
        }
    }
}
