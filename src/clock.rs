use chrono::{DateTime, DurationRound, TimeDelta, Timelike, Utc};

/// Abstraction over "current time" to make runs deterministic in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The last fully elapsed minute: `now` floored to the minute, minus one.
    ///
    /// A run started at 10:31:07 reports on 10:30.
    fn reference_minute(&self) -> DateTime<Utc> {
        floor_to_minute(self.now()) - TimeDelta::minutes(1)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

pub fn floor_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(TimeDelta::minutes(1)).unwrap_or(ts)
}

pub fn floor_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(TimeDelta::hours(1)).unwrap_or(ts)
}

/// True when `ts` sits exactly on an hour boundary.
pub fn is_top_of_hour(ts: DateTime<Utc>) -> bool {
    ts.minute() == 0 && ts.second() == 0 && ts.nanosecond() == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reference_minute_is_previous_whole_minute() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 10, 31, 7).unwrap());
        assert_eq!(
            clock.reference_minute(),
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn reference_minute_crosses_hour_boundary() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 45).unwrap());
        let reference = clock.reference_minute();
        assert_eq!(reference, Utc.with_ymd_and_hms(2024, 3, 1, 10, 59, 0).unwrap());
        assert_eq!(
            floor_to_hour(reference),
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn top_of_hour_detection() {
        assert!(is_top_of_hour(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()));
        assert!(!is_top_of_hour(Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap()));
    }
}
