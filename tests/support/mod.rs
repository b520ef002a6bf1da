#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use fundnav::alerts::{AlertChannel, AlertDispatcher, AlertRoutes};
use fundnav::clock::FixedClock;
use fundnav::models::{BalanceObservation, PmConfigEntry, SharesRecord, TableName};
use fundnav::pipeline::NavPipeline;
use fundnav::storage::MemoryStorage;
use rust_decimal::Decimal;

pub const PIPELINE_CHAT: &str = "pipeline-chat";
pub const ROUTINE_CHAT: &str = "routine-chat";

/// 2024-03-01 at `hour:minute` UTC.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap()
}

pub fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

pub fn balance(pm: &str, timestamp: DateTime<Utc>, value: i64) -> BalanceObservation {
    BalanceObservation::new(pm, timestamp, dec(value))
}

pub fn shares(code: &str, value: i64) -> SharesRecord {
    SharesRecord::new(code, at(0, 0), dec(value))
}

pub fn pm(code: &str, group: &str, fund: &str) -> PmConfigEntry {
    PmConfigEntry::new(code, group, fund)
}

pub fn table(name: &str) -> TableName {
    TableName::new(name).unwrap()
}

/// Alert channel that keeps every `(destination, text)` pair it is handed.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send returns a transport error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertChannel for RecordingChannel {
    async fn send(&self, text: &str, destination: &str) -> Result<bool> {
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), text.to_string()));
        if self.fail {
            anyhow::bail!("channel offline");
        }
        Ok(true)
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub fn dispatcher(channel: Arc<RecordingChannel>) -> AlertDispatcher {
    AlertDispatcher::new(channel).with_routes(AlertRoutes {
        pipeline: PIPELINE_CHAT.to_string(),
        routine: ROUTINE_CHAT.to_string(),
    })
}

/// A clock whose reference minute is exactly `reference`.
pub fn clock_for(reference: DateTime<Utc>) -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        reference + TimeDelta::minutes(1) + TimeDelta::seconds(7),
    ))
}

/// Pipeline reading and writing one memory store, with alerts recorded and
/// the clock pinned so the run reports on `reference`.
pub fn pipeline(
    storage: &Arc<MemoryStorage>,
    channel: &Arc<RecordingChannel>,
    reference: DateTime<Utc>,
) -> NavPipeline {
    NavPipeline::new(
        storage.clone(),
        storage.clone(),
        storage.clone(),
        storage.clone(),
    )
    .with_alerts(dispatcher(channel.clone()))
    .with_clock(clock_for(reference))
}
