//! Human-readable durations such as "2h" or "90m" for lookback windows.

use anyhow::{bail, Context, Result};
use chrono::TimeDelta;
use serde::{de, Deserialize, Deserializer};

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;

fn unit_seconds(unit: char) -> Option<i64> {
    match unit {
        'd' => Some(SECS_PER_DAY),
        'h' => Some(SECS_PER_HOUR),
        'm' => Some(SECS_PER_MINUTE),
        's' => Some(1),
        _ => None,
    }
}

/// Parse a duration string like "2h", "90m", "1d" or "30s".
///
/// Case-insensitive, surrounding whitespace ignored, non-negative integers only.
///
/// ```
/// use fundnav::duration::parse_duration;
/// use chrono::TimeDelta;
///
/// assert_eq!(parse_duration("2h").unwrap(), TimeDelta::hours(2));
/// assert_eq!(parse_duration("90m").unwrap(), TimeDelta::minutes(90));
/// ```
pub fn parse_duration(s: &str) -> Result<TimeDelta> {
    let s = s.trim().to_lowercase();
    let Some(unit) = s.chars().last() else {
        bail!("Duration is empty");
    };
    let Some(multiplier) = unit_seconds(unit) else {
        bail!("Duration must end with d, h, m, or s");
    };

    let digits = &s[..s.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        bail!("Invalid number in duration: {s:?}");
    }
    let num: i64 = digits
        .parse()
        .with_context(|| format!("Invalid number in duration: {s:?}"))?;

    let secs = num
        .checked_mul(multiplier)
        .context("Duration is too large")?;
    TimeDelta::try_seconds(secs).context("Duration is too large")
}

/// Format a duration using the largest unit that divides it evenly.
///
/// ```
/// use fundnav::duration::format_duration;
/// use chrono::TimeDelta;
///
/// assert_eq!(format_duration(TimeDelta::hours(2)), "2h");
/// assert_eq!(format_duration(TimeDelta::minutes(90)), "90m");
/// ```
pub fn format_duration(d: TimeDelta) -> String {
    let secs = d.num_seconds();
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.abs();

    for (unit, size) in [("d", SECS_PER_DAY), ("h", SECS_PER_HOUR), ("m", SECS_PER_MINUTE)] {
        if secs >= size && secs % size == 0 {
            return format!("{sign}{}{unit}", secs / size);
        }
    }
    format!("{sign}{secs}s")
}

/// Serde deserializer for duration strings.
///
/// Use with `#[serde(deserialize_with = "deserialize_duration")]`.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<TimeDelta, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(de::Error::custom)
}

/// Serde serializer matching [`deserialize_duration`].
pub fn serialize_duration<S>(d: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format_duration(*d))
}
