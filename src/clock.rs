//! Source of the reference date for a run.

use chrono::{FixedOffset, NaiveDate, Utc};

pub trait Clock: Send + Sync {
    /// The current calendar date. Rainfall windows end the day before.
    fn today(&self) -> NaiveDate;
}

/// Wall-clock date at a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        SystemClock { offset }
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}

/// Always reports the same date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_fixed_clock_is_fixed() {
        // ---
        let date = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        assert_eq!(FixedClock(date).today(), date);
    }

    #[test]
    fn test_system_clock_respects_offset() {
        // ---
        let east = SystemClock::new(FixedOffset::east_opt(14 * 3600).unwrap()).today();
        let west = SystemClock::new(FixedOffset::west_opt(12 * 3600).unwrap()).today();

        // 26 hours apart: always one or two calendar days.
        let gap = (east - west).num_days();
        assert!((1..=2).contains(&gap), "unexpected gap {gap}");
    }
}
