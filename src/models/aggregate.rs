//! Per-contract aggregate report model
//!
//! A [`ContractAggregate`] is built once per aggregation run and never
//! mutated afterwards. It keeps the full contributing record set for
//! traceability next to the derived metrics, the breakdown tables and the
//! top-N rankings. All structures are plain serializable values consumed by
//! the reporting/invoicing collaborator.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::call_record::CallRecord;

/// A value together with how many times it occurred
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counted<T> {
    pub value: T,
    pub count: u64,
}

/// Identity and coverage of one contract's record set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractInfo {
    /// Billing contract code
    pub contract_code: i64,

    /// Number of contributing records
    pub total_records: u64,

    /// Distinct caller numbers
    pub unique_calling_numbers: u64,

    /// Distinct called numbers
    pub unique_called_numbers: u64,

    /// Distinct service codes
    pub unique_service_codes: u64,

    /// Timestamp of the earliest contributing call
    pub first_call: DateTime<Utc>,

    /// Timestamp of the latest contributing call
    pub last_call: DateTime<Utc>,
}

/// Derived totals and averages for one contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractMetrics {
    pub total_calls: u64,
    pub total_duration_seconds: i64,
    pub total_duration_minutes: Decimal,
    pub total_duration_hours: Decimal,
    pub total_cost: Decimal,
    pub average_call_duration_seconds: Decimal,
    pub average_call_cost: Decimal,
    /// Zero when the contract has no billed duration
    pub cost_per_minute: Decimal,
}

/// Per call-type statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallTypeStats {
    pub count: u64,
    /// Share of the contract's calls, percent with two decimals
    pub percentage: Decimal,
    pub total_cost: Decimal,
    pub total_duration_seconds: i64,
    pub average_cost: Decimal,
    pub average_duration_seconds: Decimal,
}

/// Per operator statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorStats {
    pub count: u64,
    pub percentage: Decimal,
    pub total_cost: Decimal,
    pub average_cost_per_call: Decimal,
}

/// Operator distribution plus top operators by call count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorBreakdown {
    pub distribution: BTreeMap<String, OperatorStats>,
    pub top_operators: Vec<Counted<String>>,
}

/// Frequency table over one string-valued dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencyTable {
    pub distinct: u64,
    pub distribution: BTreeMap<String, u64>,
    pub top: Vec<Counted<String>>,
}

/// City and prefix distributions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeographicBreakdown {
    pub cities: FrequencyTable,
    pub prefixes: FrequencyTable,
}

/// Hour-of-day, day-of-week and calendar-date distributions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalBreakdown {
    pub by_hour: BTreeMap<u32, u64>,
    pub peak_hours: Vec<Counted<u32>>,
    pub busiest_hour: Option<Counted<u32>>,
    pub by_day_of_week: BTreeMap<String, u64>,
    pub busiest_day: Option<Counted<String>>,
    pub calls_per_date: BTreeMap<NaiveDate, u64>,
    pub busiest_dates: Vec<Counted<NaiveDate>>,
}

/// Basic statistics over per-call costs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostStats {
    pub min: Decimal,
    pub max: Decimal,
    pub total: Decimal,
    pub average: Decimal,
    pub median: Decimal,
    /// Sample standard deviation; zero with fewer than two records
    pub std_dev: Decimal,
}

/// Call counts per cost range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostBuckets {
    /// cost == 0
    pub free: u64,
    /// 0 < cost <= 0.05
    pub low: u64,
    /// 0.05 < cost <= 0.15
    pub medium: u64,
    /// cost > 0.15
    pub high: u64,
}

/// Cost statistics and range buckets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub stats: CostStats,
    pub buckets: CostBuckets,
}

/// Basic statistics over per-call durations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationStats {
    pub min_seconds: i32,
    pub max_seconds: i32,
    pub total_seconds: i64,
    pub average_seconds: Decimal,
    pub median_seconds: Decimal,
    /// Sample standard deviation; zero with fewer than two records
    pub std_dev_seconds: Decimal,
}

/// Call counts per duration range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationBuckets {
    /// duration <= 30s
    pub very_short: u64,
    /// 30s < duration <= 120s
    pub short: u64,
    /// 120s < duration <= 600s
    pub medium: u64,
    /// duration > 600s
    pub long: u64,
}

/// Duration statistics and range buckets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationBreakdown {
    pub stats: DurationStats,
    pub buckets: DurationBuckets,
}

/// Per service-code statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStats {
    pub count: u64,
    pub total_cost: Decimal,
    pub average_cost: Decimal,
}

/// Service-code distribution plus top services by call count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceBreakdown {
    pub distribution: BTreeMap<i32, ServiceStats>,
    pub top_services: Vec<Counted<i32>>,
}

/// Top-N record rankings for one contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopRecords {
    pub most_expensive_calls: Vec<CallRecord>,
    pub longest_calls: Vec<CallRecord>,
    pub most_frequent_destinations: Vec<Counted<String>>,
    pub most_frequent_callers: Vec<Counted<String>>,
}

/// Complete aggregate report for one billing contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractAggregate {
    pub contract_info: ContractInfo,
    pub metrics: ContractMetrics,
    pub call_types: BTreeMap<String, CallTypeStats>,
    pub operators: OperatorBreakdown,
    pub geography: GeographicBreakdown,
    pub temporal: TemporalBreakdown,
    pub costs: CostBreakdown,
    pub durations: DurationBreakdown,
    pub services: ServiceBreakdown,
    pub top_records: TopRecords,
    /// Full contributing record set, kept for traceability
    pub records: Vec<CallRecord>,
}
