//! CDR classification, pricing and aggregation engine
//!
//! The core of a telephony billing pipeline:
//!
//! - A persistent [`CategoryStore`] mapping raw call-type descriptions to
//!   priced categories through substring patterns, with per-category or
//!   global markup and pattern-conflict detection
//! - A classification/cost API ([`CategoryStore::classify_and_cost`])
//! - A per-contract aggregation engine ([`services::aggregate`]) and a
//!   cross-contract summarizer ([`services::summarize`])
//!
//! The engine performs no network I/O: it consumes already-parsed
//! [`CallRecord`] batches and produces plain serializable reports that
//! collaborators persist or transmit. The only file the engine touches is
//! the category configuration, mirrored to disk with backup-on-write.
//!
//! Classification is first-match-wins over the categories' persisted
//! priority order, so overlapping patterns resolve deterministically;
//! [`CategoryStore::find_conflicts`] surfaces such overlaps.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use config::EngineConfig;
pub use error::EngineError;
pub use models::{
    AnalyticsReport, BillingUnit, CallRecord, Category, CategoryUpdate, ClassificationResult,
    ContractAggregate, GlobalSummary, NewCategory,
};
pub use services::{analyze, MarkupSource};
pub use store::{CategoryStore, ImportReport};

/// Result type alias using EngineError
pub type EngineResult<T> = Result<T, EngineError>;
