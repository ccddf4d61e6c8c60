//! Call detail record model
//!
//! One row describing a single telephone call, already type-converted by the
//! file-conversion collaborator. Records are immutable once constructed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single call detail record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Call timestamp
    pub timestamp: DateTime<Utc>,

    /// Caller number
    pub caller_number: String,

    /// Called number
    pub called_number: String,

    /// Call duration in seconds
    pub duration_seconds: i32,

    /// Raw call-type description as delivered by the provider
    pub call_type: String,

    /// Carrier/operator name
    pub operator: String,

    /// Provider-stated cost of the call
    pub cost: Decimal,

    /// Billing contract the call is attributed to
    pub contract_code: i64,

    /// Provider service code
    pub service_code: i32,

    /// Destination city
    pub destination_city: String,

    /// Dialed prefix
    pub dialed_prefix: String,
}

impl CallRecord {
    /// Raw call type normalized for classification and grouping
    pub fn normalized_call_type(&self) -> String {
        self.call_type.trim().to_uppercase()
    }

    /// Duration expressed in minutes
    pub fn duration_minutes(&self) -> Decimal {
        Decimal::from(self.duration_seconds) / Decimal::from(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn record() -> CallRecord {
        CallRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 6, 5, 14, 16, 27).unwrap(),
            caller_number: "0721123456".to_string(),
            called_number: "3331234567".to_string(),
            duration_seconds: 90,
            call_type: "  cellulare tim ".to_string(),
            operator: "TIM".to_string(),
            cost: dec!(0.12),
            contract_code: 63,
            service_code: 1,
            destination_city: "PESARO".to_string(),
            dialed_prefix: "333".to_string(),
        }
    }

    #[test]
    fn test_normalized_call_type() {
        assert_eq!(record().normalized_call_type(), "CELLULARE TIM");
    }

    #[test]
    fn test_duration_minutes() {
        assert_eq!(record().duration_minutes(), dec!(1.5));
    }
}
