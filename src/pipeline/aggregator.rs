//! Roll validated PM balances up to PM groups, groups and funds, join shares
//! and compute NAV.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::FilterConfig;
use crate::models::{compute_nav, AggregationRow, EnhancedBalanceRow, PmConfigEntry, SharesRecord};

use super::filters::OutputFilter;
use super::shares::latest_shares;

/// Running total for one roll-up key.
#[derive(Debug, Clone, Copy)]
struct Rollup {
    timestamp: DateTime<Utc>,
    balance: Decimal,
    is_fallback: bool,
    is_inactive: bool,
}

impl Rollup {
    fn start(row: &EnhancedBalanceRow) -> Self {
        Self {
            timestamp: row.timestamp,
            balance: row.balance_or_zero(),
            is_fallback: row.is_fallback,
            is_inactive: row.is_inactive,
        }
    }

    fn absorb(&mut self, row: &EnhancedBalanceRow) {
        self.timestamp = self.timestamp.max(row.timestamp);
        self.balance += row.balance_or_zero();
        self.is_fallback |= row.is_fallback;
        self.is_inactive |= row.is_inactive;
    }
}

fn add(rollups: &mut BTreeMap<(DateTime<Utc>, String), Rollup>, key: &str, row: &EnhancedBalanceRow) {
    rollups
        .entry((row.timestamp, key.to_string()))
        .and_modify(|r| r.absorb(row))
        .or_insert_with(|| Rollup::start(row));
}

/// Balance roll-ups before the shares join, keyed by published code.
#[derive(Debug, Clone, Default)]
struct Rollups {
    /// (timestamp, code) -> total, for PM groups and groups.
    timed: Vec<(String, Rollup)>,
    /// Fund totals, stamped with the newest constituent timestamp.
    funds: BTreeMap<String, Rollup>,
}

fn roll_up(rows: &[EnhancedBalanceRow], pm_config: &[PmConfigEntry]) -> Rollups {
    let mut by_pm: HashMap<&str, &PmConfigEntry> = HashMap::new();
    for entry in pm_config {
        by_pm.entry(entry.pm.as_str()).or_insert(entry);
    }

    let mut pm_groups = BTreeMap::new();
    let mut groups = BTreeMap::new();
    let mut funds: BTreeMap<String, Rollup> = BTreeMap::new();

    for row in rows {
        let Some(entry) = by_pm.get(row.pm.as_str()) else {
            debug!(pm = %row.pm, "balance for unconfigured PM left out of roll-ups");
            continue;
        };
        add(&mut pm_groups, entry.pm_group(), row);
        add(&mut groups, &entry.group, row);
        funds
            .entry(entry.fund.clone())
            .and_modify(|r| r.absorb(row))
            .or_insert_with(|| Rollup::start(row));
    }

    let timed = pm_groups
        .into_iter()
        .chain(groups)
        .map(|((_, code), rollup)| (code, rollup))
        .collect();

    Rollups { timed, funds }
}

/// Aggregate validated rows into the publishable NAV row set.
///
/// Rows for codes without a shares history are dropped, as are codes on the
/// configured denylists. The result is sorted by code, then timestamp.
pub fn aggregate(
    rows: &[EnhancedBalanceRow],
    pm_config: &[PmConfigEntry],
    shares: &[SharesRecord],
    reference: DateTime<Utc>,
    filters: &FilterConfig,
) -> Vec<AggregationRow> {
    let Rollups { timed, funds } = roll_up(rows, pm_config);

    let gross = filters.gross_funds.iter().filter_map(|fund| {
        funds
            .get(fund)
            .map(|rollup| (format!("{fund}-gross"), *rollup))
    });
    let gross: Vec<(String, Rollup)> = gross.collect();

    let combined = timed.into_iter().chain(funds).chain(gross);

    let shares_by_code = latest_shares(shares);
    let output_filter = OutputFilter::from_config(filters);

    let mut out: Vec<AggregationRow> = Vec::new();
    for (code, rollup) in combined {
        let Some(shares) = shares_by_code.get(&code).copied() else {
            debug!(pm = %code, "no shares history, row dropped");
            continue;
        };
        if let Some(reason) = output_filter.drop_reason(&code, reference) {
            debug!(pm = %code, %reason, "row filtered from output");
            continue;
        }
        out.push(AggregationRow {
            timestamp: rollup.timestamp,
            nav: compute_nav(rollup.balance, shares),
            pm: code,
            balance: rollup.balance,
            is_fallback: rollup.is_fallback,
            is_inactive: rollup.is_inactive,
            shares,
        });
    }

    out.sort_by(|a, b| a.pm.cmp(&b.pm).then(a.timestamp.cmp(&b.timestamp)));
    out
}
