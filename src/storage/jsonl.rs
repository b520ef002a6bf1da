use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::models::{BalanceObservation, NavRecord, SharesRecord, TableName, ValidationReport};

use super::{newest_in_window, BalanceSource, NavSink, SharesSource};

/// JSON Lines file storage.
///
/// Directory structure:
/// ```text
/// data/
///   balances.jsonl        one BalanceObservation per line, append-only
///   shares.jsonl          one SharesRecord per line
///   tables/
///     {table}.jsonl       replaced in full on every write
/// ```
#[derive(Debug, Clone)]
pub struct JsonlStorage {
    base_path: PathBuf,
}

impl JsonlStorage {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn balances_file(&self) -> PathBuf {
        self.base_path.join("balances.jsonl")
    }

    fn shares_file(&self) -> PathBuf {
        self.base_path.join("shares.jsonl")
    }

    pub fn table_file(&self, table: &TableName) -> PathBuf {
        self.base_path
            .join("tables")
            .join(format!("{}.jsonl", table.as_str()))
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory")?;
        }
        Ok(())
    }

    async fn read_jsonl<T: for<'de> serde::Deserialize<'de>>(&self, path: &Path) -> Result<Vec<T>> {
        let file = match fs::File::open(path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", path.display()))
            }
        };

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut items = Vec::new();
        let mut line_no = 0usize;

        while let Some(line) = lines.next_line().await.context("Failed to read line")? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let item: T = serde_json::from_str(&line).with_context(|| {
                format!("Failed to parse {} line {line_no}", path.display())
            })?;
            items.push(item);
        }

        Ok(items)
    }

    /// Write all items to a sibling temp file, then rename it over `path`.
    async fn replace_jsonl<T: serde::Serialize>(&self, path: &Path, items: &[T]) -> Result<()> {
        self.ensure_dir(path).await?;

        let mut buf = Vec::new();
        for item in items {
            serde_json::to_writer(&mut buf, item).context("Failed to serialize row")?;
            buf.push(b'\n');
        }

        let tmp = path.with_extension("jsonl.tmp");
        let mut file = fs::File::create(&tmp)
            .await
            .with_context(|| format!("Failed to create {}", tmp.display()))?;
        file.write_all(&buf).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    pub async fn append_balances(&self, rows: &[BalanceObservation]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let path = self.balances_file();
        self.ensure_dir(&path).await?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .context("Failed to open balances for append")?;

        for row in rows {
            let line = serde_json::to_string(row).context("Failed to serialize balance")?;
            file.write_all(line.as_bytes()).await?;
            file.write_all(b"\n").await?;
        }

        Ok(())
    }

    pub async fn replace_shares(&self, rows: &[SharesRecord]) -> Result<()> {
        self.replace_jsonl(&self.shares_file(), rows).await
    }

    pub async fn read_nav_table(&self, table: &TableName) -> Result<Vec<NavRecord>> {
        self.read_jsonl(&self.table_file(table)).await
    }

    pub async fn read_report_table(&self, table: &TableName) -> Result<Vec<ValidationReport>> {
        self.read_jsonl(&self.table_file(table)).await
    }
}

#[async_trait::async_trait]
impl BalanceSource for JsonlStorage {
    async fn balances_at(&self, timestamps: &[DateTime<Utc>]) -> Result<Vec<BalanceObservation>> {
        let rows: Vec<BalanceObservation> = self.read_jsonl(&self.balances_file()).await?;
        Ok(rows
            .into_iter()
            .filter(|obs| timestamps.contains(&obs.timestamp))
            .collect())
    }

    async fn latest_balance_in_window(
        &self,
        pm: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<BalanceObservation>> {
        let rows: Vec<BalanceObservation> = self.read_jsonl(&self.balances_file()).await?;
        Ok(newest_in_window(rows.iter(), pm, start, end))
    }
}

#[async_trait::async_trait]
impl SharesSource for JsonlStorage {
    async fn list_shares(&self) -> Result<Vec<SharesRecord>> {
        self.read_jsonl(&self.shares_file()).await
    }
}

#[async_trait::async_trait]
impl NavSink for JsonlStorage {
    async fn replace_nav_table(&self, table: &TableName, rows: &[NavRecord]) -> Result<()> {
        self.replace_jsonl(&self.table_file(table), rows).await
    }

    async fn replace_report_table(
        &self,
        table: &TableName,
        report: &ValidationReport,
    ) -> Result<()> {
        self.replace_jsonl(&self.table_file(table), std::slice::from_ref(report))
            .await
    }
}
