use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Shares outstanding for a PM, group or fund code as of a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharesRecord {
    pub timestamp: DateTime<Utc>,
    pub pm: String,
    #[serde(default)]
    pub shares: Option<Decimal>,
}

impl SharesRecord {
    pub fn new(pm: impl Into<String>, timestamp: DateTime<Utc>, shares: Decimal) -> Self {
        Self {
            timestamp,
            pm: pm.into(),
            shares: Some(shares),
        }
    }
}
