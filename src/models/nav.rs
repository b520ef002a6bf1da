use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// NAV per share. Zero when shares are missing or zero.
pub fn compute_nav(balance: Decimal, shares: Option<Decimal>) -> Decimal {
    match shares {
        Some(shares) if !shares.is_zero() => balance.checked_div(shares).unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

/// A rolled-up balance for a PM group, group or fund code, joined to shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregationRow {
    pub timestamp: DateTime<Utc>,
    pub pm: String,
    pub balance: Decimal,
    /// True if any constituent was a fallback row.
    pub is_fallback: bool,
    /// True if any constituent belongs to an inactive PM.
    pub is_inactive: bool,
    pub shares: Option<Decimal>,
    pub nav: Decimal,
}

impl AggregationRow {
    pub fn to_record(&self) -> NavRecord {
        NavRecord {
            timestamp: self.timestamp,
            pm: self.pm.clone(),
            balance: self.balance,
            shares: self.shares,
            nav: self.nav,
            is_fallback: self.is_fallback,
        }
    }
}

/// The persisted shape of a NAV result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavRecord {
    pub timestamp: DateTime<Utc>,
    pub pm: String,
    pub balance: Decimal,
    pub shares: Option<Decimal>,
    pub nav: Decimal,
    pub is_fallback: bool,
}
