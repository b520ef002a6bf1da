mod support;

use std::sync::Arc;

use anyhow::Result;
use chrono::TimeDelta;
use fundnav::storage::MemoryStorage;
use fundnav::NavError;
use support::{
    at, balance, dec, dispatcher, pm, pipeline, shares, table, RecordingChannel, ROUTINE_CHAT,
};

async fn seeded(storage: MemoryStorage) -> Arc<MemoryStorage> {
    let storage = Arc::new(storage);
    storage.set_pm_config(vec![pm("a", "g1", "f1")]).await;
    storage.push_balances([balance("a", at(10, 30), 10)]).await;
    storage.push_shares([shares("a", 2)]).await;
    storage
}

#[tokio::test]
async fn unreadable_balance_table_aborts_before_writing() -> Result<()> {
    let storage = seeded(MemoryStorage::new().fail_balance_reads()).await;
    let channel = Arc::new(RecordingChannel::new());

    let err = pipeline(&storage, &channel, at(10, 30))
        .run_once()
        .await
        .expect_err("run should fail");

    assert!(matches!(
        err,
        NavError::SourceUnavailable { source_name: "balance table", .. }
    ));
    assert!(storage.nav_table(&table("nav_table")).await.is_none());
    assert!(channel.sent().is_empty());

    Ok(())
}

#[tokio::test]
async fn unreadable_shares_table_aborts_before_writing() -> Result<()> {
    let storage = seeded(MemoryStorage::new().fail_shares_reads()).await;
    let channel = Arc::new(RecordingChannel::new());

    let err = pipeline(&storage, &channel, at(10, 30))
        .run_once()
        .await
        .expect_err("run should fail");

    assert!(matches!(
        err,
        NavError::SourceUnavailable { source_name: "shares table", .. }
    ));
    assert!(storage.nav_table(&table("nav_table")).await.is_none());

    Ok(())
}

#[tokio::test]
async fn sink_failure_is_reported_and_skips_alerts() -> Result<()> {
    let storage = seeded(MemoryStorage::new().fail_writes()).await;
    // A missing active PM would normally raise an alert.
    storage.set_pm_config(vec![pm("a", "g1", "f1"), pm("b", "g1", "f1")]).await;
    let channel = Arc::new(RecordingChannel::new());

    let err = pipeline(&storage, &channel, at(10, 30))
        .run_once()
        .await
        .expect_err("run should fail");

    match err {
        NavError::SinkWrite { table, .. } => assert_eq!(table.as_str(), "nav_table"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(channel.sent().is_empty());

    Ok(())
}

#[tokio::test]
async fn run_failure_notice_goes_to_routine_destination() -> Result<()> {
    let storage = seeded(MemoryStorage::new().fail_shares_reads()).await;
    let channel = Arc::new(RecordingChannel::new());

    let result = pipeline(&storage, &channel, at(10, 30))
        .with_alerts(dispatcher(channel.clone()).with_run_failure_notices(true))
        .run_once()
        .await;
    assert!(result.is_err());

    let sent = channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, ROUTINE_CHAT);
    assert!(sent[0].1.starts_with("NAV run for 2024-03-01 10:30 UTC failed"));
    assert!(sent[0].1.contains("shares table unavailable"));

    Ok(())
}

#[tokio::test]
async fn alert_delivery_failure_does_not_fail_the_run() -> Result<()> {
    let storage = seeded(MemoryStorage::new()).await;
    storage.set_pm_config(vec![pm("a", "g1", "f1"), pm("b", "g1", "f1")]).await;
    let channel = Arc::new(RecordingChannel::failing());

    let outcome = pipeline(&storage, &channel, at(10, 30)).run_once().await?;

    assert_eq!(channel.sent().len(), 1);
    assert_eq!(outcome.report.active_pms.completely_missing, vec!["b"]);
    let rows = storage.nav_table(&table("nav_table")).await.unwrap_or_default();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].nav, dec(5));

    Ok(())
}

#[tokio::test]
async fn failed_fallback_lookup_counts_as_missing() -> Result<()> {
    let storage = Arc::new(MemoryStorage::new().fail_window_query_for("b"));
    storage
        .set_pm_config(vec![pm("a", "g1", "f1"), pm("b", "g1", "f1"), pm("c", "g1", "f1")])
        .await;
    storage
        .push_balances([
            balance("a", at(10, 30), 10),
            balance("b", at(10, 10), 20),
            balance("c", at(10, 10), 30),
        ])
        .await;
    storage.push_shares([shares("g1", 1)]).await;
    let channel = Arc::new(RecordingChannel::new());

    let outcome = pipeline(&storage, &channel, at(10, 30)).run_once().await?;

    assert_eq!(storage.window_queries().await, vec!["b", "c"]);
    assert_eq!(outcome.report.active_pms.completely_missing, vec!["b"]);
    let fallbacks = &outcome.report.active_pms.using_fallback_data;
    assert_eq!(fallbacks.len(), 1);
    assert_eq!(fallbacks[0].pm, "c");
    assert_eq!(fallbacks[0].fallback_timestamp, at(10, 30) - TimeDelta::minutes(20));

    let group = &outcome.rows[0];
    assert_eq!(group.pm, "g1");
    assert_eq!(group.balance, dec(40));
    assert!(group.is_fallback);

    Ok(())
}
