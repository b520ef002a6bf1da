//! Human-readable alerts for stale or missing PM data.

pub mod telegram;

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::duration::format_duration;
use crate::models::ValidationReport;

pub use telegram::TelegramChannel;

/// Somewhere a text message can be posted.
#[async_trait::async_trait]
pub trait AlertChannel: Send + Sync {
    /// Post `text` to `destination`. `Ok(false)` means the channel answered but
    /// refused the message.
    async fn send(&self, text: &str, destination: &str) -> Result<bool>;

    fn name(&self) -> &str;
}

/// Channel used when no bot token is configured: messages go to the log only.
#[derive(Debug, Clone, Default)]
pub struct LogChannel;

#[async_trait::async_trait]
impl AlertChannel for LogChannel {
    async fn send(&self, text: &str, destination: &str) -> Result<bool> {
        info!(destination = %destination, message = %text, "alert (log only)");
        Ok(true)
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Destinations per alert class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRoutes {
    /// Data pipeline warnings.
    pub pipeline: String,
    /// Routine notices such as run failures.
    pub routine: String,
}

impl Default for AlertRoutes {
    fn default() -> Self {
        Self {
            pipeline: "pipeline".to_string(),
            routine: "routine".to_string(),
        }
    }
}

/// What a dispatch attempted and how much got through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub attempted: usize,
    pub delivered: usize,
}

pub fn fallback_message(report: &ValidationReport) -> Option<String> {
    let used = &report.active_pms.using_fallback_data;
    if used.is_empty() {
        return None;
    }

    let mut msg = String::from("⚠️ NAV AGGREGATION ALERT ⚠️\n\n");
    msg.push_str(&format!("{} active PMs using fallback data:\n", used.len()));
    for fallback in used {
        let age = format_duration(report.timestamp - fallback.fallback_timestamp);
        msg.push_str(&format!(
            "• {}: from {} ({age} old)\n",
            fallback.pm,
            fallback.fallback_timestamp.format("%Y-%m-%d %H:%M UTC")
        ));
    }
    msg.push_str("\n⚠️ Check data pipeline immediately!");
    Some(msg)
}

pub fn missing_message(report: &ValidationReport) -> Option<String> {
    let missing = &report.active_pms.completely_missing;
    if missing.is_empty() {
        return None;
    }

    let mut msg = String::from("🚨 CRITICAL NAV AGGREGATION ALERT 🚨\n\n");
    msg.push_str(&format!("{} active PMs have NO DATA:\n", missing.len()));
    for pm in missing {
        msg.push_str(&format!("• {pm}\n"));
    }
    msg.push_str("\n🚨 URGENT: These PMs have no current or fallback data!");
    Some(msg)
}

pub fn run_failure_message(reference: DateTime<Utc>, err: &dyn std::fmt::Display) -> String {
    format!(
        "NAV run for {} failed: {err}",
        reference.format("%Y-%m-%d %H:%M UTC")
    )
}

/// Sends validation alerts without ever failing the caller.
#[derive(Clone)]
pub struct AlertDispatcher {
    channel: Arc<dyn AlertChannel>,
    routes: AlertRoutes,
    notify_run_failure: bool,
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new(Arc::new(LogChannel))
    }
}

impl AlertDispatcher {
    pub fn new(channel: Arc<dyn AlertChannel>) -> Self {
        Self {
            channel,
            routes: AlertRoutes::default(),
            notify_run_failure: false,
        }
    }

    pub fn with_routes(mut self, routes: AlertRoutes) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_run_failure_notices(mut self, enabled: bool) -> Self {
        self.notify_run_failure = enabled;
        self
    }

    /// Warn about fallback use and missing PMs. Nothing is sent when every
    /// active PM reported current data.
    pub async fn dispatch(&self, report: &ValidationReport) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        if let Some(msg) = fallback_message(report) {
            outcome.attempted += 1;
            if self.deliver(&msg, &self.routes.pipeline, "fallback").await {
                outcome.delivered += 1;
            }
        }

        if let Some(msg) = missing_message(report) {
            outcome.attempted += 1;
            if self.deliver(&msg, &self.routes.pipeline, "missing").await {
                outcome.delivered += 1;
            }
        }

        outcome
    }

    /// Tell the routine destination that a run failed, when enabled.
    pub async fn notify_run_failure(&self, reference: DateTime<Utc>, err: &dyn std::fmt::Display) {
        if !self.notify_run_failure {
            return;
        }
        let msg = run_failure_message(reference, err);
        self.deliver(&msg, &self.routes.routine, "run_failure").await;
    }

    async fn deliver(&self, text: &str, destination: &str, kind: &str) -> bool {
        match self.channel.send(text, destination).await {
            Ok(true) => {
                info!(channel = self.channel.name(), kind, "alert sent");
                true
            }
            Ok(false) => {
                warn!(channel = self.channel.name(), kind, "alert not accepted by channel");
                false
            }
            Err(err) => {
                error!(
                    channel = self.channel.name(),
                    kind,
                    error = %format!("{err:#}"),
                    "failed to send alert"
                );
                false
            }
        }
    }
}
