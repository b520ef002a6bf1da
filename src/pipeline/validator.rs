//! Classify configured PMs by data availability and fill gaps for active PMs.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::models::{
    BalanceObservation, EnhancedBalanceRow, FallbackUse, PmConfigEntry, ValidationReport,
};

use super::fallback::FallbackResolver;

/// Rows ready for aggregation plus the report describing how they were found.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub rows: Vec<EnhancedBalanceRow>,
    pub report: ValidationReport,
}

/// Active flag per configured PM. The first entry for a PM wins.
fn activity_by_pm(pm_config: &[PmConfigEntry]) -> BTreeMap<&str, bool> {
    let mut by_pm = BTreeMap::new();
    for entry in pm_config {
        if by_pm.contains_key(entry.pm.as_str()) {
            warn!(pm = %entry.pm, "duplicate PM configuration entry ignored");
            continue;
        }
        by_pm.insert(entry.pm.as_str(), entry.active);
    }
    by_pm
}

/// Validate the current balance snapshot against the PM configuration.
///
/// Active PMs without a current observation are looked up through `resolver`
/// (in PM order); a hit becomes a fallback row stamped with `reference`, a
/// miss or a resolver error lands in `completely_missing`. Inactive PMs are
/// never looked up. Observations for PMs outside the configuration pass
/// through untouched.
pub async fn validate(
    current: Vec<BalanceObservation>,
    reference: DateTime<Utc>,
    pm_config: &[PmConfigEntry],
    resolver: &dyn FallbackResolver,
) -> ValidationOutcome {
    let activity = activity_by_pm(pm_config);
    let active: BTreeSet<&str> = activity
        .iter()
        .filter(|(_, active)| **active)
        .map(|(pm, _)| *pm)
        .collect();
    let inactive: BTreeSet<&str> = activity
        .iter()
        .filter(|(_, active)| !**active)
        .map(|(pm, _)| *pm)
        .collect();

    let reporting: BTreeSet<String> = current.iter().map(|obs| obs.pm.clone()).collect();

    let mut report = ValidationReport::builder(reference)
        .expected(active.len(), inactive.len())
        .total_with_data(reporting.len());

    for pm in &active {
        if reporting.contains(*pm) {
            report.active_current(*pm);
        }
    }
    for pm in &inactive {
        if reporting.contains(*pm) {
            report.inactive_current(*pm);
        } else {
            debug!(pm = %pm, "inactive PM missing data, no fallback attempted");
            report.inactive_missing(*pm);
        }
    }

    let mut rows: Vec<EnhancedBalanceRow> = current
        .into_iter()
        .map(|obs| {
            let is_inactive = inactive.contains(obs.pm.as_str());
            EnhancedBalanceRow::current(obs, is_inactive)
        })
        .collect();

    for pm in active.iter().filter(|pm| !reporting.contains(**pm)) {
        info!(pm = %pm, "active PM missing current data, attempting fallback");
        match resolver.resolve(pm, reference).await {
            Ok(Some(found)) => {
                info!(
                    pm = %pm,
                    fallback_timestamp = %found.timestamp,
                    "using fallback balance"
                );
                report.fallback(FallbackUse {
                    pm: pm.to_string(),
                    fallback_timestamp: found.timestamp,
                    balance: found.balance,
                });
                rows.push(EnhancedBalanceRow::fallback(found, reference));
            }
            Ok(None) => {
                warn!(pm = %pm, "no fallback balance found for active PM");
                report.missing(*pm);
            }
            Err(err) => {
                warn!(pm = %pm, error = %format!("{err:#}"), "fallback lookup failed");
                report.missing(*pm);
            }
        }
    }

    ValidationOutcome {
        rows,
        report: report.build(),
    }
}
