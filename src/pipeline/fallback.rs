//! Bounded lookback for a PM whose current balance is missing.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::models::BalanceObservation;
use crate::storage::BalanceSource;

#[async_trait::async_trait]
pub trait FallbackResolver: Send + Sync {
    /// The most recent non-null balance for `pm` at or before `reference`,
    /// or `None` when nothing usable exists inside the lookback window.
    async fn resolve(
        &self,
        pm: &str,
        reference: DateTime<Utc>,
    ) -> Result<Option<BalanceObservation>>;
}

/// Resolves fallbacks against a balance source within a fixed lookback.
///
/// Values older than the window never satisfy a lookup, so a long outage
/// surfaces as a missing PM rather than a silently stale NAV.
pub struct WindowFallbackResolver {
    source: Arc<dyn BalanceSource>,
    lookback: TimeDelta,
}

impl WindowFallbackResolver {
    pub fn new(source: Arc<dyn BalanceSource>, lookback: TimeDelta) -> Self {
        Self { source, lookback }
    }

    pub fn lookback(&self) -> TimeDelta {
        self.lookback
    }
}

#[async_trait::async_trait]
impl FallbackResolver for WindowFallbackResolver {
    async fn resolve(
        &self,
        pm: &str,
        reference: DateTime<Utc>,
    ) -> Result<Option<BalanceObservation>> {
        let start = reference - self.lookback;
        debug!(pm = %pm, %start, end = %reference, "looking up fallback balance");
        let found = self
            .source
            .latest_balance_in_window(pm, start, reference)
            .await?;
        // Enforce the window even if the source over-returns.
        Ok(found.filter(|obs| {
            obs.pm == pm
                && obs.balance.is_some()
                && obs.timestamp >= start
                && obs.timestamp <= reference
        }))
    }
}
