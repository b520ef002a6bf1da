//! In-memory storage implementation for testing.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::models::{
    BalanceObservation, NavRecord, PmConfigEntry, SharesRecord, TableName, ValidationReport,
};

use super::{newest_in_window, BalanceSource, NavSink, PmConfigSource, SharesSource};

/// In-memory storage for testing purposes.
///
/// Failures can be injected per table to exercise the pipeline's abort paths,
/// and every fallback window query is recorded.
#[derive(Default)]
pub struct MemoryStorage {
    balances: Mutex<Vec<BalanceObservation>>,
    shares: Mutex<Vec<SharesRecord>>,
    pm_config: Mutex<Vec<PmConfigEntry>>,
    nav_tables: Mutex<HashMap<TableName, Vec<NavRecord>>>,
    report_tables: Mutex<HashMap<TableName, ValidationReport>>,
    window_queries: Mutex<Vec<String>>,
    fail_balances: bool,
    fail_window_for: Vec<String>,
    fail_shares: bool,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_balance_reads(mut self) -> Self {
        self.fail_balances = true;
        self
    }

    /// Make the fallback window query error for one PM.
    pub fn fail_window_query_for(mut self, pm: impl Into<String>) -> Self {
        self.fail_window_for.push(pm.into());
        self
    }

    pub fn fail_shares_reads(mut self) -> Self {
        self.fail_shares = true;
        self
    }

    pub fn fail_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub async fn push_balances(&self, rows: impl IntoIterator<Item = BalanceObservation>) {
        self.balances.lock().await.extend(rows);
    }

    pub async fn push_shares(&self, rows: impl IntoIterator<Item = SharesRecord>) {
        self.shares.lock().await.extend(rows);
    }

    pub async fn set_pm_config(&self, entries: Vec<PmConfigEntry>) {
        *self.pm_config.lock().await = entries;
    }

    pub async fn nav_table(&self, table: &TableName) -> Option<Vec<NavRecord>> {
        self.nav_tables.lock().await.get(table).cloned()
    }

    pub async fn report_table(&self, table: &TableName) -> Option<ValidationReport> {
        self.report_tables.lock().await.get(table).cloned()
    }

    /// PMs the fallback window query was asked about, in call order.
    pub async fn window_queries(&self) -> Vec<String> {
        self.window_queries.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl BalanceSource for MemoryStorage {
    async fn balances_at(&self, timestamps: &[DateTime<Utc>]) -> Result<Vec<BalanceObservation>> {
        if self.fail_balances {
            anyhow::bail!("balance table unavailable");
        }
        let balances = self.balances.lock().await;
        Ok(balances
            .iter()
            .filter(|obs| timestamps.contains(&obs.timestamp))
            .cloned()
            .collect())
    }

    async fn latest_balance_in_window(
        &self,
        pm: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<BalanceObservation>> {
        self.window_queries.lock().await.push(pm.to_string());
        if self.fail_balances || self.fail_window_for.iter().any(|p| p == pm) {
            anyhow::bail!("balance window query failed for {pm}");
        }
        let balances = self.balances.lock().await;
        Ok(newest_in_window(balances.iter(), pm, start, end))
    }
}

#[async_trait::async_trait]
impl SharesSource for MemoryStorage {
    async fn list_shares(&self) -> Result<Vec<SharesRecord>> {
        if self.fail_shares {
            anyhow::bail!("shares table unavailable");
        }
        Ok(self.shares.lock().await.clone())
    }
}

#[async_trait::async_trait]
impl PmConfigSource for MemoryStorage {
    async fn list_pm_config(&self) -> Result<Vec<PmConfigEntry>> {
        Ok(self.pm_config.lock().await.clone())
    }
}

#[async_trait::async_trait]
impl NavSink for MemoryStorage {
    async fn replace_nav_table(&self, table: &TableName, rows: &[NavRecord]) -> Result<()> {
        if self.fail_writes {
            anyhow::bail!("write to {table} rejected");
        }
        self.nav_tables
            .lock()
            .await
            .insert(table.clone(), rows.to_vec());
        Ok(())
    }

    async fn replace_report_table(
        &self,
        table: &TableName,
        report: &ValidationReport,
    ) -> Result<()> {
        if self.fail_writes {
            anyhow::bail!("write to {table} rejected");
        }
        self.report_tables
            .lock()
            .await
            .insert(table.clone(), report.clone());
        Ok(())
    }
}
