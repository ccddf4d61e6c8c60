//! Cross-contract summarization
//!
//! Combines per-contract aggregates into a [`GlobalSummary`]: overview
//! totals, top-10 contract rankings and global call-type/operator
//! distributions. Rankings are descending with ties broken by contract code
//! ascending so reports are deterministic.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::info;

use crate::models::aggregate::ContractAggregate;
use crate::models::summary::{
    AnalyticsReport, ContractRanking, GlobalDistributions, GlobalOverview, GlobalSummary,
    TopContracts,
};
use crate::models::CallRecord;
use crate::services::aggregator;
use crate::services::pricing::MONEY_SCALE;

/// Contracts kept in each ranking
pub const TOP_CONTRACTS_LIMIT: usize = 10;

/// Build the cross-contract summary for a set of aggregates
pub fn summarize(aggregates: &BTreeMap<i64, ContractAggregate>) -> GlobalSummary {
    let total_contracts = aggregates.len() as u64;
    let total_calls: u64 = aggregates.values().map(|a| a.metrics.total_calls).sum();
    let total_cost: Decimal = aggregates.values().map(|a| a.metrics.total_cost).sum();
    let total_duration_seconds: i64 = aggregates
        .values()
        .map(|a| a.metrics.total_duration_seconds)
        .sum();

    let overview = GlobalOverview {
        total_contracts,
        total_calls,
        total_cost: total_cost.round_dp(MONEY_SCALE),
        total_duration_hours: (Decimal::from(total_duration_seconds) / Decimal::from(3600))
            .round_dp(2),
        average_calls_per_contract: safe_div(Decimal::from(total_calls), total_contracts, 2),
        average_cost_per_contract: safe_div(total_cost, total_contracts, MONEY_SCALE),
        average_cost_per_call: safe_div(total_cost, total_calls, MONEY_SCALE),
    };

    info!(
        contracts = total_contracts,
        calls = total_calls,
        "building global summary"
    );

    GlobalSummary {
        overview,
        top_contracts: top_contracts(aggregates),
        global_distributions: global_distributions(aggregates),
    }
}

/// Aggregate a record batch and summarize it in one step
pub fn analyze(records: Vec<CallRecord>) -> AnalyticsReport {
    let contracts = aggregator::aggregate(records);
    let global_summary = summarize(&contracts);
    AnalyticsReport {
        contracts,
        global_summary,
    }
}

fn top_contracts(aggregates: &BTreeMap<i64, ContractAggregate>) -> TopContracts {
    let rankings: Vec<ContractRanking> = aggregates
        .iter()
        .map(|(code, aggregate)| ContractRanking {
            contract_code: *code,
            total_calls: aggregate.metrics.total_calls,
            total_cost: aggregate.metrics.total_cost,
            average_call_cost: aggregate.metrics.average_call_cost,
        })
        .collect();

    TopContracts {
        most_active: ranked_by(&rankings, |r| Decimal::from(r.total_calls)),
        most_expensive: ranked_by(&rankings, |r| r.total_cost),
        highest_average_cost: ranked_by(&rankings, |r| r.average_call_cost),
    }
}

/// Descending by key, ties by contract code ascending, sliced to the limit
fn ranked_by<F>(rankings: &[ContractRanking], key: F) -> Vec<ContractRanking>
where
    F: Fn(&ContractRanking) -> Decimal,
{
    let mut sorted = rankings.to_vec();
    sorted.sort_by(|a, b| {
        key(b)
            .cmp(&key(a))
            .then_with(|| a.contract_code.cmp(&b.contract_code))
    });
    sorted.truncate(TOP_CONTRACTS_LIMIT);
    sorted
}

fn global_distributions(aggregates: &BTreeMap<i64, ContractAggregate>) -> GlobalDistributions {
    let mut call_types: BTreeMap<String, u64> = BTreeMap::new();
    let mut operators: BTreeMap<String, u64> = BTreeMap::new();

    for aggregate in aggregates.values() {
        for (call_type, stats) in &aggregate.call_types {
            *call_types.entry(call_type.clone()).or_default() += stats.count;
        }
        for (operator, stats) in &aggregate.operators.distribution {
            *operators.entry(operator.clone()).or_default() += stats.count;
        }
    }

    GlobalDistributions {
        call_types,
        operators,
    }
}

fn safe_div(numerator: Decimal, denominator: u64, scale: u32) -> Decimal {
    if denominator == 0 {
        return Decimal::ZERO;
    }
    (numerator / Decimal::from(denominator)).round_dp(scale)
}
