//! Static denylists applied to the aggregated rows before publishing.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::clock::is_top_of_hour;
use crate::config::FilterConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Suppressed,
    HourlyOnly,
    Intermediate,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DropReason::Suppressed => "suppressed",
            DropReason::HourlyOnly => "hourly_only",
            DropReason::Intermediate => "intermediate",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutputFilter {
    suppressed: HashSet<String>,
    hourly_only: HashSet<String>,
    intermediate: HashSet<String>,
}

impl OutputFilter {
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            suppressed: config.suppressed.iter().cloned().collect(),
            hourly_only: config.hourly_only.iter().cloned().collect(),
            intermediate: config.intermediate.iter().cloned().collect(),
        }
    }

    /// Why `code` must not be published for a run at `reference`, if at all.
    pub fn drop_reason(&self, code: &str, reference: DateTime<Utc>) -> Option<DropReason> {
        if self.suppressed.contains(code) {
            Some(DropReason::Suppressed)
        } else if !is_top_of_hour(reference) && self.hourly_only.contains(code) {
            Some(DropReason::HourlyOnly)
        } else if self.intermediate.contains(code) {
            Some(DropReason::Intermediate)
        } else {
            None
        }
    }
}
