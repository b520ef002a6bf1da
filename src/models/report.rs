//! Per-run validation report describing which PMs reported, which were filled
//! from fallback data, and which are missing.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A fallback balance that stood in for a missing current observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackUse {
    pub pm: String,
    /// Timestamp of the observation actually used, before re-stamping.
    pub fallback_timestamp: DateTime<Utc>,
    pub balance: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePmStatus {
    pub expected_count: usize,
    pub with_current_data: Vec<String>,
    pub using_fallback_data: Vec<FallbackUse>,
    pub completely_missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InactivePmStatus {
    pub expected_count: usize,
    pub with_current_data: Vec<String>,
    pub missing_data: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_expected_pms: usize,
    /// Distinct PMs with a current observation, configured or not.
    pub total_with_data: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub timestamp: DateTime<Utc>,
    pub active_pms: ActivePmStatus,
    pub inactive_pms: InactivePmStatus,
    pub summary: ReportSummary,
}

impl ValidationReport {
    pub fn builder(timestamp: DateTime<Utc>) -> ValidationReportBuilder {
        ValidationReportBuilder::new(timestamp)
    }

    /// PMs that ended up with a usable row: current data or fallback.
    pub fn total_processed(&self) -> usize {
        self.active_pms.with_current_data.len()
            + self.active_pms.using_fallback_data.len()
            + self.inactive_pms.with_current_data.len()
    }

    pub fn needs_attention(&self) -> bool {
        !self.active_pms.completely_missing.is_empty()
    }

    pub fn has_fallbacks(&self) -> bool {
        !self.active_pms.using_fallback_data.is_empty()
    }
}

/// Accumulates classifications during validation; `build` freezes them into
/// one report with every list sorted by PM code.
#[derive(Debug, Clone)]
pub struct ValidationReportBuilder {
    timestamp: DateTime<Utc>,
    active_expected: usize,
    inactive_expected: usize,
    total_with_data: usize,
    active_current: BTreeSet<String>,
    fallbacks: Vec<FallbackUse>,
    missing: BTreeSet<String>,
    inactive_current: BTreeSet<String>,
    inactive_missing: BTreeSet<String>,
}

impl ValidationReportBuilder {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            active_expected: 0,
            inactive_expected: 0,
            total_with_data: 0,
            active_current: BTreeSet::new(),
            fallbacks: Vec::new(),
            missing: BTreeSet::new(),
            inactive_current: BTreeSet::new(),
            inactive_missing: BTreeSet::new(),
        }
    }

    pub fn expected(mut self, active: usize, inactive: usize) -> Self {
        self.active_expected = active;
        self.inactive_expected = inactive;
        self
    }

    pub fn total_with_data(mut self, count: usize) -> Self {
        self.total_with_data = count;
        self
    }

    pub fn active_current(&mut self, pm: impl Into<String>) {
        self.active_current.insert(pm.into());
    }

    pub fn fallback(&mut self, fallback: FallbackUse) {
        self.fallbacks.push(fallback);
    }

    pub fn missing(&mut self, pm: impl Into<String>) {
        self.missing.insert(pm.into());
    }

    pub fn inactive_current(&mut self, pm: impl Into<String>) {
        self.inactive_current.insert(pm.into());
    }

    pub fn inactive_missing(&mut self, pm: impl Into<String>) {
        self.inactive_missing.insert(pm.into());
    }

    pub fn build(self) -> ValidationReport {
        let mut fallbacks = self.fallbacks;
        fallbacks.sort_by(|a, b| a.pm.cmp(&b.pm));
        fallbacks.dedup_by(|a, b| a.pm == b.pm);

        ValidationReport {
            timestamp: self.timestamp,
            active_pms: ActivePmStatus {
                expected_count: self.active_expected,
                with_current_data: self.active_current.into_iter().collect(),
                using_fallback_data: fallbacks,
                completely_missing: self.missing.into_iter().collect(),
            },
            inactive_pms: InactivePmStatus {
                expected_count: self.inactive_expected,
                with_current_data: self.inactive_current.into_iter().collect(),
                missing_data: self.inactive_missing.into_iter().collect(),
            },
            summary: ReportSummary {
                total_expected_pms: self.active_expected + self.inactive_expected,
                total_with_data: self.total_with_data,
            },
        }
    }
}
