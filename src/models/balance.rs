use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of the balance table: a PM's balance at a minute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceObservation {
    pub timestamp: DateTime<Utc>,
    pub pm: String,
    #[serde(default)]
    pub balance: Option<Decimal>,
}

impl BalanceObservation {
    pub fn new(pm: impl Into<String>, timestamp: DateTime<Utc>, balance: Decimal) -> Self {
        Self {
            timestamp,
            pm: pm.into(),
            balance: Some(balance),
        }
    }

    pub fn null(pm: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            pm: pm.into(),
            balance: None,
        }
    }
}

/// A balance row after validation, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnhancedBalanceRow {
    pub timestamp: DateTime<Utc>,
    pub pm: String,
    pub balance: Option<Decimal>,
    /// Set only for rows substituted by the fallback resolver.
    pub is_fallback: bool,
    pub is_inactive: bool,
}

impl EnhancedBalanceRow {
    pub fn current(observation: BalanceObservation, is_inactive: bool) -> Self {
        Self {
            timestamp: observation.timestamp,
            pm: observation.pm,
            balance: observation.balance,
            is_fallback: false,
            is_inactive,
        }
    }

    /// A fallback row is re-stamped with the run's reference timestamp so it
    /// aggregates alongside current data.
    pub fn fallback(observation: BalanceObservation, reference: DateTime<Utc>) -> Self {
        Self {
            timestamp: reference,
            pm: observation.pm,
            balance: observation.balance,
            is_fallback: true,
            is_inactive: false,
        }
    }

    pub fn balance_or_zero(&self) -> Decimal {
        self.balance.unwrap_or(Decimal::ZERO)
    }
}

/// Keep only the newest observation per PM. Ties keep the first seen.
pub fn latest_per_pm(observations: Vec<BalanceObservation>) -> Vec<BalanceObservation> {
    let mut latest: BTreeMap<String, BalanceObservation> = BTreeMap::new();
    for obs in observations {
        match latest.get(&obs.pm) {
            Some(existing) if existing.timestamp >= obs.timestamp => {}
            _ => {
                latest.insert(obs.pm.clone(), obs);
            }
        }
    }
    latest.into_values().collect()
}
