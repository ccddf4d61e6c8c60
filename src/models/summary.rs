//! Cross-contract summary report model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::aggregate::ContractAggregate;

/// Totals and averages across every contract in a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalOverview {
    pub total_contracts: u64,
    pub total_calls: u64,
    pub total_cost: Decimal,
    pub total_duration_hours: Decimal,
    pub average_calls_per_contract: Decimal,
    pub average_cost_per_contract: Decimal,
    pub average_cost_per_call: Decimal,
}

/// One contract's position in a ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRanking {
    pub contract_code: i64,
    pub total_calls: u64,
    pub total_cost: Decimal,
    pub average_call_cost: Decimal,
}

/// Top-10 contract rankings, each descending with ties broken by contract
/// code ascending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopContracts {
    /// By total calls
    pub most_active: Vec<ContractRanking>,
    /// By total cost
    pub most_expensive: Vec<ContractRanking>,
    /// By average cost per call
    pub highest_average_cost: Vec<ContractRanking>,
}

/// Call-type and operator counts merged across all contracts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalDistributions {
    pub call_types: BTreeMap<String, u64>,
    pub operators: BTreeMap<String, u64>,
}

/// Cross-contract summary report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSummary {
    pub overview: GlobalOverview,
    pub top_contracts: TopContracts,
    pub global_distributions: GlobalDistributions,
}

/// Complete analytics output: one aggregate per contract plus the summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub contracts: BTreeMap<i64, ContractAggregate>,
    pub global_summary: GlobalSummary,
}
