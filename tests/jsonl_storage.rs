mod support;

use std::io::Write;

use anyhow::Result;
use chrono::TimeDelta;
use fundnav::config::ResolvedConfig;
use fundnav::models::NavRecord;
use fundnav::pipeline::NavPipeline;
use fundnav::storage::{BalanceSource, JsonlStorage, NavSink, SharesSource};
use support::{at, balance, dec, shares, table};
use tempfile::TempDir;

fn record(pm: &str, nav: i64) -> NavRecord {
    NavRecord {
        timestamp: at(10, 30),
        pm: pm.to_string(),
        balance: dec(nav),
        shares: Some(dec(1)),
        nav: dec(nav),
        is_fallback: false,
    }
}

#[tokio::test]
async fn replace_nav_table_overwrites_previous_contents() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = JsonlStorage::new(dir.path());
    let nav_table = table("nav_table");

    storage
        .replace_nav_table(&nav_table, &[record("a", 1), record("b", 2)])
        .await?;
    storage.replace_nav_table(&nav_table, &[record("c", 3)]).await?;

    let rows = storage.read_nav_table(&nav_table).await?;
    assert_eq!(rows, vec![record("c", 3)]);
    assert!(storage.table_file(&nav_table).exists());
    assert!(!storage
        .table_file(&nav_table)
        .with_extension("jsonl.tmp")
        .exists());

    Ok(())
}

#[tokio::test]
async fn missing_files_read_as_empty() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = JsonlStorage::new(dir.path());

    assert!(storage.balances_at(&[at(10, 30)]).await?.is_empty());
    assert!(storage.list_shares().await?.is_empty());
    assert!(storage.read_nav_table(&table("nav_table")).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn window_query_reads_appended_balances() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = JsonlStorage::new(dir.path());
    storage
        .append_balances(&[balance("a", at(9, 0), 1), balance("a", at(9, 45), 2)])
        .await?;
    storage.append_balances(&[balance("a", at(10, 40), 3)]).await?;

    let found = storage
        .latest_balance_in_window("a", at(8, 30), at(10, 30))
        .await?
        .expect("balance in window");
    assert_eq!(found.timestamp, at(9, 45));
    assert_eq!(found.balance, Some(dec(2)));

    Ok(())
}

#[tokio::test]
async fn corrupt_balance_line_is_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    std::fs::write(dir.path().join("balances.jsonl"), "{not json}\n")?;
    let storage = JsonlStorage::new(dir.path());

    let err = storage
        .balances_at(&[at(10, 30)])
        .await
        .expect_err("corrupt line should fail");
    assert!(format!("{err:#}").contains("line 1"));

    Ok(())
}

#[tokio::test]
async fn configured_pipeline_runs_against_files() -> Result<()> {
    let dir = TempDir::new()?;
    let config_path = dir.path().join("fundnav.toml");
    let mut file = std::fs::File::create(&config_path)?;
    writeln!(file, "data_dir = \"data\"")?;
    writeln!(file, "[output]")?;
    writeln!(file, "audit_table = \"nav_validation_log\"")?;
    writeln!(file, "[alerts]")?;
    writeln!(file, "bot_token_env = \"FUNDNAV_TEST_TOKEN_NEVER_SET\"")?;
    writeln!(file, "[[pms]]")?;
    writeln!(file, "pm = \"a\"")?;
    writeln!(file, "group = \"g1\"")?;
    writeln!(file, "fund = \"f1\"")?;
    writeln!(file, "[[pms]]")?;
    writeln!(file, "pm = \"b\"")?;
    writeln!(file, "group = \"g1\"")?;
    writeln!(file, "fund = \"f1\"")?;
    drop(file);

    let config = ResolvedConfig::load(&config_path)?;
    let storage = JsonlStorage::new(&config.data_dir);
    let reference = at(10, 30);
    storage
        .append_balances(&[
            balance("a", reference, 700),
            balance("b", reference - TimeDelta::minutes(45), 300),
        ])
        .await?;
    storage
        .replace_shares(&[shares("g1", 50), shares("f1", 20)])
        .await?;

    let outcome = NavPipeline::from_config(&config).run_for(reference).await?;
    assert_eq!(outcome.rows_written(), 2);

    let rows = storage.read_nav_table(&table("nav_table")).await?;
    let codes: Vec<&str> = rows.iter().map(|r| r.pm.as_str()).collect();
    assert_eq!(codes, vec!["f1", "g1"]);
    assert_eq!(rows[0].nav, dec(50));
    assert_eq!(rows[1].nav, dec(20));
    assert!(rows.iter().all(|r| r.is_fallback));

    let reports = storage.read_report_table(&table("nav_validation_log")).await?;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].active_pms.using_fallback_data[0].pm, "b");

    Ok(())
}
