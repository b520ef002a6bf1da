use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::models::SharesRecord;

/// Latest shares per code: newest timestamp wins, ties go to the record that
/// appears first in `records`.
///
/// A code present in the result maps to `None` when its latest record carries
/// no share count; a code absent from the result has no shares history at all.
pub fn latest_shares(records: &[SharesRecord]) -> HashMap<String, Option<Decimal>> {
    let mut ordered: Vec<&SharesRecord> = records.iter().collect();
    // Stable, so equal timestamps keep source order.
    ordered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut latest = HashMap::new();
    for record in ordered {
        latest.entry(record.pm.clone()).or_insert(record.shares);
    }
    latest
}
