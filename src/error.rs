//! Unified error handling for the pricing engine
//!
//! Every fallible operation in the crate returns [`EngineError`] so callers
//! can branch on a single taxonomy. Stable machine-readable codes are
//! exposed through [`EngineError::error_code`] for API consumers.

use rust_decimal::Decimal;
use thiserror::Error;

/// Main engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Category already exists: {0}")]
    DuplicateCategory(String),

    #[error("Price must not be negative: {0}")]
    NegativePrice(Decimal),

    #[error("Markup percent out of range [-100, 1000]: {0}")]
    MarkupOutOfRange(Decimal),

    #[error("At least one non-empty pattern is required")]
    EmptyPatterns,

    // ==================== Resource Errors ====================
    #[error("Category not found: {0}")]
    NotFound(String),

    #[error("Category is essential and cannot be deleted: {0}")]
    Protected(String),

    // ==================== Persistence Errors ====================
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ==================== Internal Errors ====================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Returns the stable error code for this error
    ///
    /// Callers (a web layer, an invoicing job) branch on these strings
    /// rather than on display messages.
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation_error",
            EngineError::DuplicateCategory(_) => "duplicate_category",
            EngineError::NegativePrice(_) => "negative_price",
            EngineError::MarkupOutOfRange(_) => "markup_out_of_range",
            EngineError::EmptyPatterns => "empty_patterns",
            EngineError::NotFound(_) => "category_not_found",
            EngineError::Protected(_) => "category_protected",
            EngineError::Persistence(_) => "persistence_error",
            EngineError::Serialization(_) => "serialization_error",
            EngineError::Config(_) => "config_error",
            EngineError::Internal(_) => "internal_error",
        }
    }

    /// True for errors raised by input validation before any mutation
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::Validation(_)
                | EngineError::DuplicateCategory(_)
                | EngineError::NegativePrice(_)
                | EngineError::MarkupOutOfRange(_)
                | EngineError::EmptyPatterns
        )
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Persistence(err.to_string())
    }
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            EngineError::NotFound("FAX".to_string()).error_code(),
            "category_not_found"
        );
        assert_eq!(
            EngineError::MarkupOutOfRange(dec!(2000)).error_code(),
            "markup_out_of_range"
        );
        assert_eq!(
            EngineError::Protected("FISSI".to_string()).error_code(),
            "category_protected"
        );
    }

    #[test]
    fn test_is_validation() {
        assert!(EngineError::EmptyPatterns.is_validation());
        assert!(EngineError::NegativePrice(dec!(-1)).is_validation());
        assert!(!EngineError::NotFound("X".to_string()).is_validation());
        assert!(!EngineError::Persistence("io".to_string()).is_validation());
    }
}
