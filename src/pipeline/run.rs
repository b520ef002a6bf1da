//! One NAV run: read, validate, aggregate, persist, alert.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::alerts::{AlertDispatcher, AlertRoutes, LogChannel, TelegramChannel};
use crate::clock::{floor_to_hour, Clock, SystemClock};
use crate::config::{FilterConfig, OutputConfig, ResolvedConfig};
use crate::error::{NavError, NavResult};
use crate::models::{latest_per_pm, AggregationRow, NavRecord, ValidationReport};
use crate::storage::{
    BalanceSource, JsonlStorage, NavSink, PmConfigSource, SharesSource, StaticPmConfig,
};

use super::aggregator::aggregate;
use super::fallback::{FallbackResolver, WindowFallbackResolver};
use super::validator::validate;

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub reference_timestamp: DateTime<Utc>,
    pub report: ValidationReport,
    pub rows: Vec<AggregationRow>,
}

impl RunOutcome {
    pub fn rows_written(&self) -> usize {
        self.rows.len()
    }
}

/// Wires the sources, resolver, sink and alerting together.
pub struct NavPipeline {
    balances: Arc<dyn BalanceSource>,
    shares: Arc<dyn SharesSource>,
    pm_config: Arc<dyn PmConfigSource>,
    sink: Arc<dyn NavSink>,
    resolver: Arc<dyn FallbackResolver>,
    alerts: AlertDispatcher,
    filters: FilterConfig,
    output: OutputConfig,
    clock: Arc<dyn Clock>,
}

impl NavPipeline {
    /// A pipeline with default filters and output tables, resolving fallbacks
    /// against `balances` with the default lookback and logging alerts only.
    pub fn new(
        balances: Arc<dyn BalanceSource>,
        shares: Arc<dyn SharesSource>,
        pm_config: Arc<dyn PmConfigSource>,
        sink: Arc<dyn NavSink>,
    ) -> Self {
        let lookback = crate::config::NavConfig::default().fallback_lookback;
        Self {
            resolver: Arc::new(WindowFallbackResolver::new(balances.clone(), lookback)),
            balances,
            shares,
            pm_config,
            sink,
            alerts: AlertDispatcher::default(),
            filters: FilterConfig::default(),
            output: OutputConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Build the production pipeline from a loaded config: JSONL tables under
    /// the data directory, PM topology from `[[pms]]`, Telegram alerts when a
    /// bot token and pipeline chat are configured.
    pub fn from_config(config: &ResolvedConfig) -> Self {
        let storage = Arc::new(JsonlStorage::new(&config.data_dir));
        let resolver = WindowFallbackResolver::new(storage.clone(), config.nav.fallback_lookback);

        Self::new(
            storage.clone(),
            storage.clone(),
            Arc::new(StaticPmConfig::new(config.pms.clone())),
            storage,
        )
        .with_resolver(Arc::new(resolver))
        .with_alerts(alert_dispatcher(config))
        .with_filters(config.filters.clone())
        .with_output(config.output.clone())
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn FallbackResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_alerts(mut self, alerts: AlertDispatcher) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_filters(mut self, filters: FilterConfig) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn reference_timestamp(&self) -> DateTime<Utc> {
        self.clock.reference_minute()
    }

    /// Run for the last elapsed minute. On failure the routine alert
    /// destination is told, if enabled, and the error is returned.
    pub async fn run_once(&self) -> NavResult<RunOutcome> {
        let reference = self.reference_timestamp();
        match self.run_for(reference).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.alerts.notify_run_failure(reference, &err).await;
                Err(err)
            }
        }
    }

    /// Run for an explicit reference minute.
    pub async fn run_for(&self, reference: DateTime<Utc>) -> NavResult<RunOutcome> {
        let hour = floor_to_hour(reference);
        info!(%reference, %hour, "starting NAV run");

        let shares = self
            .shares
            .list_shares()
            .await
            .map_err(NavError::source_unavailable("shares table"))?;
        let pm_config = self
            .pm_config
            .list_pm_config()
            .await
            .map_err(NavError::source_unavailable("PM configuration"))?;

        let mut candidates = vec![hour];
        if reference != hour {
            candidates.push(reference);
        }
        let current = self
            .balances
            .balances_at(&candidates)
            .await
            .map_err(NavError::source_unavailable("balance table"))?;
        let current = latest_per_pm(current);
        info!(
            shares = shares.len(),
            pms_configured = pm_config.len(),
            pms_reporting = current.len(),
            "inputs loaded"
        );

        let validated = validate(current, reference, &pm_config, self.resolver.as_ref()).await;
        let rows = aggregate(
            &validated.rows,
            &pm_config,
            &shares,
            reference,
            &self.filters,
        );

        if let Some(audit) = &self.output.audit_table {
            self.sink
                .replace_report_table(audit, &validated.report)
                .await
                .map_err(NavError::sink_write(audit))?;
        }

        let table = &self.output.results_table;
        let records: Vec<NavRecord> = rows.iter().map(AggregationRow::to_record).collect();
        self.sink
            .replace_nav_table(table, &records)
            .await
            .map_err(NavError::sink_write(table))?;
        info!(table = %table, rows = records.len(), "NAV table replaced");

        self.alerts.dispatch(&validated.report).await;
        log_summary(&validated.report);

        Ok(RunOutcome {
            reference_timestamp: reference,
            report: validated.report,
            rows,
        })
    }
}

fn alert_dispatcher(config: &ResolvedConfig) -> AlertDispatcher {
    let alerts = &config.alerts;
    let mut routes = AlertRoutes::default();
    if let Some(chat) = &alerts.pipeline_chat_id {
        routes.pipeline = chat.clone();
    }
    routes.routine = alerts
        .routine_chat_id
        .clone()
        .unwrap_or_else(|| routes.pipeline.clone());

    let dispatcher = match (alerts.bot_token(), &alerts.pipeline_chat_id) {
        (Some(token), Some(_)) => AlertDispatcher::new(Arc::new(
            TelegramChannel::new(token).with_base_url(alerts.telegram_base_url.clone()),
        )),
        (Some(_), None) => {
            warn!("bot token set but no pipeline_chat_id configured, alerts will only be logged");
            AlertDispatcher::new(Arc::new(LogChannel))
        }
        (None, _) => AlertDispatcher::new(Arc::new(LogChannel)),
    };

    dispatcher
        .with_routes(routes)
        .with_run_failure_notices(alerts.notify_run_failure)
}

fn log_summary(report: &ValidationReport) {
    let active = &report.active_pms;
    let inactive = &report.inactive_pms;
    let quality = if report.needs_attention() {
        "NEEDS ATTENTION"
    } else {
        "GOOD"
    };

    info!(
        active_expected = active.expected_count,
        active_current = active.with_current_data.len(),
        active_fallback = active.using_fallback_data.len(),
        active_missing = active.completely_missing.len(),
        inactive_expected = inactive.expected_count,
        inactive_current = inactive.with_current_data.len(),
        inactive_missing = inactive.missing_data.len(),
        processed = report.total_processed(),
        expected = report.summary.total_expected_pms,
        quality,
        "validation summary"
    );

    if report.has_fallbacks() {
        warn!(
            count = active.using_fallback_data.len(),
            "active PMs using fallback data, check data pipeline"
        );
    }
    if report.needs_attention() {
        warn!(
            count = active.completely_missing.len(),
            pms = ?active.completely_missing,
            "active PMs have no data available"
        );
    }
}
