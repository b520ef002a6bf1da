//! Read and write seams for the NAV pipeline.
//!
//! The balance table, the shares table and the results tables live behind
//! these traits so the pipeline can run against files in production and
//! against memory in tests.

mod jsonl;
mod memory;

pub use jsonl::JsonlStorage;
pub use memory::MemoryStorage;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::models::{
    BalanceObservation, NavRecord, PmConfigEntry, SharesRecord, TableName, ValidationReport,
};

/// Time-series balance table.
#[async_trait::async_trait]
pub trait BalanceSource: Send + Sync {
    /// All observations stamped exactly at one of `timestamps`.
    async fn balances_at(&self, timestamps: &[DateTime<Utc>]) -> Result<Vec<BalanceObservation>>;

    /// The newest non-null observation for `pm` within `[start, end]`.
    async fn latest_balance_in_window(
        &self,
        pm: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<BalanceObservation>>;
}

/// Shares outstanding history.
#[async_trait::async_trait]
pub trait SharesSource: Send + Sync {
    async fn list_shares(&self) -> Result<Vec<SharesRecord>>;
}

/// Static PM topology.
#[async_trait::async_trait]
pub trait PmConfigSource: Send + Sync {
    async fn list_pm_config(&self) -> Result<Vec<PmConfigEntry>>;
}

/// Output tables. Every write replaces the table's previous contents.
#[async_trait::async_trait]
pub trait NavSink: Send + Sync {
    async fn replace_nav_table(&self, table: &TableName, rows: &[NavRecord]) -> Result<()>;

    async fn replace_report_table(&self, table: &TableName, report: &ValidationReport)
        -> Result<()>;
}

/// PM topology taken from the `[[pms]]` section of the config file.
#[derive(Debug, Clone, Default)]
pub struct StaticPmConfig {
    entries: Vec<PmConfigEntry>,
}

impl StaticPmConfig {
    pub fn new(entries: Vec<PmConfigEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait::async_trait]
impl PmConfigSource for StaticPmConfig {
    async fn list_pm_config(&self) -> Result<Vec<PmConfigEntry>> {
        Ok(self.entries.clone())
    }
}

/// Filter shared by the adapters for the fallback window query.
pub(crate) fn newest_in_window<'a>(
    observations: impl IntoIterator<Item = &'a BalanceObservation>,
    pm: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<BalanceObservation> {
    observations
        .into_iter()
        .filter(|obs| obs.pm == pm && obs.balance.is_some())
        .filter(|obs| obs.timestamp >= start && obs.timestamp <= end)
        .fold(None::<&BalanceObservation>, |best, obs| match best {
            Some(b) if b.timestamp >= obs.timestamp => Some(b),
            _ => Some(obs),
        })
        .cloned()
}
