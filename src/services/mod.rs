//! Engine services: pricing, classification, costing, conflict detection
//! and analytics

pub mod aggregator;
pub mod classifier;
pub mod conflicts;
pub mod costing;
pub mod pricing;
pub mod summarizer;

pub use aggregator::aggregate;
pub use classifier::classify;
pub use conflicts::{find_conflicts, ConflictSeverity, PatternConflict};
pub use costing::cost_call;
pub use pricing::{pricing_breakdown, MarkupSource, PricingBreakdown};
pub use summarizer::{analyze, summarize};
