//! Per-contract aggregation
//!
//! Groups a batch of call records by contract code and computes the full
//! [`ContractAggregate`] for each group in a single pass: totals, averages,
//! the six breakdown tables and the top-N record rankings. Aggregation is a
//! pure computation over owned inputs; results are read-only once built.

use chrono::Timelike;
use rust_decimal::{Decimal, MathematicalOps};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use crate::models::aggregate::{
    CallTypeStats, ContractAggregate, ContractInfo, ContractMetrics, CostBreakdown, CostBuckets,
    CostStats, Counted, DurationBreakdown, DurationBuckets, DurationStats, FrequencyTable,
    GeographicBreakdown, OperatorBreakdown, OperatorStats, ServiceBreakdown, ServiceStats,
    TemporalBreakdown, TopRecords,
};
use crate::models::CallRecord;
use crate::services::pricing::MONEY_SCALE;

/// Entries kept in each top-N record ranking
pub const TOP_RECORDS_LIMIT: usize = 10;

const TOP_OPERATORS_LIMIT: usize = 5;
const PEAK_HOURS_LIMIT: usize = 5;
const BUSIEST_DATES_LIMIT: usize = 10;

const DURATION_SCALE: u32 = 2;

/// Group records by contract code and aggregate each group
pub fn aggregate(records: Vec<CallRecord>) -> BTreeMap<i64, ContractAggregate> {
    let total_records = records.len();
    let mut groups: BTreeMap<i64, Vec<CallRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.contract_code).or_default().push(record);
    }

    info!(
        records = total_records,
        contracts = groups.len(),
        "aggregating call records by contract"
    );

    groups
        .into_iter()
        .map(|(code, group)| (code, aggregate_contract(code, group)))
        .collect()
}

/// Aggregate one contract's records; `records` must not be empty
fn aggregate_contract(contract_code: i64, records: Vec<CallRecord>) -> ContractAggregate {
    ContractAggregate {
        contract_info: contract_info(contract_code, &records),
        metrics: contract_metrics(&records),
        call_types: call_type_breakdown(&records),
        operators: operator_breakdown(&records),
        geography: geographic_breakdown(&records),
        temporal: temporal_breakdown(&records),
        costs: cost_breakdown(&records),
        durations: duration_breakdown(&records),
        services: service_breakdown(&records),
        top_records: top_records(&records),
        records,
    }
}

fn contract_info(contract_code: i64, records: &[CallRecord]) -> ContractInfo {
    let callers: BTreeSet<&str> = records.iter().map(|r| r.caller_number.as_str()).collect();
    let called: BTreeSet<&str> = records.iter().map(|r| r.called_number.as_str()).collect();
    let services: BTreeSet<i32> = records.iter().map(|r| r.service_code).collect();

    // groups are only created from at least one record
    let first_call = records.iter().map(|r| r.timestamp).min().unwrap_or_default();
    let last_call = records.iter().map(|r| r.timestamp).max().unwrap_or_default();

    ContractInfo {
        contract_code,
        total_records: records.len() as u64,
        unique_calling_numbers: callers.len() as u64,
        unique_called_numbers: called.len() as u64,
        unique_service_codes: services.len() as u64,
        first_call,
        last_call,
    }
}

fn contract_metrics(records: &[CallRecord]) -> ContractMetrics {
    let total_calls = records.len() as u64;
    let total_duration_seconds: i64 = records.iter().map(|r| r.duration_seconds as i64).sum();
    let total_cost: Decimal = records.iter().map(|r| r.cost).sum();

    let duration = Decimal::from(total_duration_seconds);
    let calls = Decimal::from(total_calls);

    let cost_per_minute = if total_duration_seconds > 0 {
        (total_cost * Decimal::from(60) / duration).round_dp(MONEY_SCALE)
    } else {
        Decimal::ZERO
    };

    ContractMetrics {
        total_calls,
        total_duration_seconds,
        total_duration_minutes: (duration / Decimal::from(60)).round_dp(DURATION_SCALE),
        total_duration_hours: (duration / Decimal::from(3600)).round_dp(DURATION_SCALE),
        total_cost: total_cost.round_dp(MONEY_SCALE),
        average_call_duration_seconds: (duration / calls).round_dp(DURATION_SCALE),
        average_call_cost: (total_cost / calls).round_dp(MONEY_SCALE),
        cost_per_minute,
    }
}

fn call_type_breakdown(records: &[CallRecord]) -> BTreeMap<String, CallTypeStats> {
    let total = records.len() as u64;
    let mut grouped: BTreeMap<String, Vec<&CallRecord>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.normalized_call_type())
            .or_default()
            .push(record);
    }

    grouped
        .into_iter()
        .map(|(call_type, group)| {
            let count = group.len() as u64;
            let total_cost: Decimal = group.iter().map(|r| r.cost).sum();
            let total_duration: i64 = group.iter().map(|r| r.duration_seconds as i64).sum();

            let stats = CallTypeStats {
                count,
                percentage: percentage(count, total),
                total_cost: total_cost.round_dp(MONEY_SCALE),
                total_duration_seconds: total_duration,
                average_cost: (total_cost / Decimal::from(count)).round_dp(MONEY_SCALE),
                average_duration_seconds: (Decimal::from(total_duration)
                    / Decimal::from(count))
                .round_dp(DURATION_SCALE),
            };
            (call_type, stats)
        })
        .collect()
}

fn operator_breakdown(records: &[CallRecord]) -> OperatorBreakdown {
    let total = records.len() as u64;
    let mut grouped: BTreeMap<String, Vec<&CallRecord>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.operator.clone())
            .or_default()
            .push(record);
    }

    let counts: BTreeMap<String, u64> = grouped
        .iter()
        .map(|(op, group)| (op.clone(), group.len() as u64))
        .collect();

    let distribution = grouped
        .into_iter()
        .map(|(operator, group)| {
            let count = group.len() as u64;
            let total_cost: Decimal = group.iter().map(|r| r.cost).sum();

            let stats = OperatorStats {
                count,
                percentage: percentage(count, total),
                total_cost: total_cost.round_dp(MONEY_SCALE),
                average_cost_per_call: (total_cost / Decimal::from(count)).round_dp(MONEY_SCALE),
            };
            (operator, stats)
        })
        .collect();

    OperatorBreakdown {
        distribution,
        top_operators: top_counted(&counts, TOP_OPERATORS_LIMIT),
    }
}

fn geographic_breakdown(records: &[CallRecord]) -> GeographicBreakdown {
    let cities = count_values(records.iter().map(|r| r.destination_city.clone()));
    let prefixes = count_values(records.iter().map(|r| r.dialed_prefix.clone()));

    GeographicBreakdown {
        cities: frequency_table(cities),
        prefixes: frequency_table(prefixes),
    }
}

fn temporal_breakdown(records: &[CallRecord]) -> TemporalBreakdown {
    let mut by_hour: BTreeMap<u32, u64> = BTreeMap::new();
    let mut by_day_of_week: BTreeMap<String, u64> = BTreeMap::new();
    let mut calls_per_date = BTreeMap::new();

    for record in records {
        *by_hour.entry(record.timestamp.hour()).or_default() += 1;
        *by_day_of_week
            .entry(record.timestamp.format("%A").to_string())
            .or_default() += 1;
        *calls_per_date
            .entry(record.timestamp.date_naive())
            .or_default() += 1;
    }

    TemporalBreakdown {
        peak_hours: top_counted(&by_hour, PEAK_HOURS_LIMIT),
        busiest_hour: top_counted(&by_hour, 1).into_iter().next(),
        busiest_day: top_counted(&by_day_of_week, 1).into_iter().next(),
        busiest_dates: top_counted(&calls_per_date, BUSIEST_DATES_LIMIT),
        by_hour,
        by_day_of_week,
        calls_per_date,
    }
}

fn cost_breakdown(records: &[CallRecord]) -> CostBreakdown {
    let costs: Vec<Decimal> = records.iter().map(|r| r.cost).collect();
    let total: Decimal = costs.iter().sum();
    let count = Decimal::from(costs.len());
    let mean = total / count;

    let low_limit = Decimal::new(5, 2); // 0.05
    let high_limit = Decimal::new(15, 2); // 0.15

    let buckets = CostBuckets {
        free: costs.iter().filter(|c| c.is_zero()).count() as u64,
        low: costs
            .iter()
            .filter(|c| **c > Decimal::ZERO && **c <= low_limit)
            .count() as u64,
        medium: costs
            .iter()
            .filter(|c| **c > low_limit && **c <= high_limit)
            .count() as u64,
        high: costs.iter().filter(|c| **c > high_limit).count() as u64,
    };

    let stats = CostStats {
        min: costs.iter().min().copied().unwrap_or_default(),
        max: costs.iter().max().copied().unwrap_or_default(),
        total: total.round_dp(MONEY_SCALE),
        average: mean.round_dp(MONEY_SCALE),
        median: median(&costs).round_dp(MONEY_SCALE),
        std_dev: std_dev(&costs, mean).round_dp(MONEY_SCALE),
    };

    CostBreakdown { stats, buckets }
}

fn duration_breakdown(records: &[CallRecord]) -> DurationBreakdown {
    let durations: Vec<i32> = records.iter().map(|r| r.duration_seconds).collect();
    let decimals: Vec<Decimal> = durations.iter().map(|d| Decimal::from(*d)).collect();
    let total: i64 = durations.iter().map(|d| *d as i64).sum();
    let mean = Decimal::from(total) / Decimal::from(durations.len());

    let buckets = DurationBuckets {
        very_short: durations.iter().filter(|d| **d <= 30).count() as u64,
        short: durations.iter().filter(|d| **d > 30 && **d <= 120).count() as u64,
        medium: durations.iter().filter(|d| **d > 120 && **d <= 600).count() as u64,
        long: durations.iter().filter(|d| **d > 600).count() as u64,
    };

    let stats = DurationStats {
        min_seconds: durations.iter().min().copied().unwrap_or_default(),
        max_seconds: durations.iter().max().copied().unwrap_or_default(),
        total_seconds: total,
        average_seconds: mean.round_dp(DURATION_SCALE),
        median_seconds: median(&decimals).round_dp(DURATION_SCALE),
        std_dev_seconds: std_dev(&decimals, mean).round_dp(DURATION_SCALE),
    };

    DurationBreakdown { stats, buckets }
}

fn service_breakdown(records: &[CallRecord]) -> ServiceBreakdown {
    let mut grouped: BTreeMap<i32, Vec<&CallRecord>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.service_code).or_default().push(record);
    }

    let counts: BTreeMap<i32, u64> = grouped
        .iter()
        .map(|(code, group)| (*code, group.len() as u64))
        .collect();

    let distribution = grouped
        .into_iter()
        .map(|(service_code, group)| {
            let count = group.len() as u64;
            let total_cost: Decimal = group.iter().map(|r| r.cost).sum();

            let stats = ServiceStats {
                count,
                total_cost: total_cost.round_dp(MONEY_SCALE),
                average_cost: (total_cost / Decimal::from(count)).round_dp(MONEY_SCALE),
            };
            (service_code, stats)
        })
        .collect();

    ServiceBreakdown {
        distribution,
        top_services: top_counted(&counts, TOP_RECORDS_LIMIT),
    }
}

fn top_records(records: &[CallRecord]) -> TopRecords {
    // stable sorts keep original record order for equal keys
    let mut by_cost = records.to_vec();
    by_cost.sort_by(|a, b| b.cost.cmp(&a.cost));
    by_cost.truncate(TOP_RECORDS_LIMIT);

    let mut by_duration = records.to_vec();
    by_duration.sort_by(|a, b| b.duration_seconds.cmp(&a.duration_seconds));
    by_duration.truncate(TOP_RECORDS_LIMIT);

    let destinations = count_values(records.iter().map(|r| r.called_number.clone()));
    let callers = count_values(records.iter().map(|r| r.caller_number.clone()));

    TopRecords {
        most_expensive_calls: by_cost,
        longest_calls: by_duration,
        most_frequent_destinations: top_counted(&destinations, TOP_RECORDS_LIMIT),
        most_frequent_callers: top_counted(&callers, TOP_RECORDS_LIMIT),
    }
}

// ==================== shared helpers ====================

fn count_values<I: Iterator<Item = String>>(values: I) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    counts
}

fn frequency_table(distribution: BTreeMap<String, u64>) -> FrequencyTable {
    FrequencyTable {
        distinct: distribution.len() as u64,
        top: top_counted(&distribution, TOP_RECORDS_LIMIT),
        distribution,
    }
}

/// Top entries by count descending, value ascending on ties
fn top_counted<K: Ord + Clone>(counts: &BTreeMap<K, u64>, limit: usize) -> Vec<Counted<K>> {
    let mut entries: Vec<Counted<K>> = counts
        .iter()
        .map(|(value, count)| Counted {
            value: value.clone(),
            count: *count,
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    entries.truncate(limit);
    entries
}

fn percentage(count: u64, total: u64) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(count) * Decimal::ONE_HUNDRED / Decimal::from(total)).round_dp(2)
}

fn median(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let mut sorted = values.to_vec();
    sorted.sort();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / Decimal::TWO
    }
}

/// Sample standard deviation; zero with fewer than two values
fn std_dev(values: &[Decimal], mean: Decimal) -> Decimal {
    if values.len() < 2 {
        return Decimal::ZERO;
    }
    let variance: Decimal = values
        .iter()
        .map(|v| (*v - mean) * (*v - mean))
        .sum::<Decimal>()
        / Decimal::from(values.len() as u64 - 1);
    variance.sqrt().unwrap_or_default()
}
