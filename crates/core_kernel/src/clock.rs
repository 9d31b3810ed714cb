//! Clock abstraction for date and time access
//!
//! Date arithmetic in the billing engine is driven by "today", so anything
//! that reads the wall clock goes through this trait. Production code uses
//! `SystemClock`; tests pin time with `FixedClock` to make schedule runs
//! deterministic.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::Mutex;

/// Source of the current date and time
pub trait Clock: Send + Sync {
    /// Returns the current instant in UTC
    fn now(&self) -> DateTime<Utc>;

    /// Returns the current civil date in UTC
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a fixed instant, advanceable from tests
///
/// # Example
///
/// ```rust
/// use core_kernel::{Clock, FixedClock};
/// use chrono::NaiveDate;
///
/// let clock = FixedClock::from_date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
/// assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
///
/// clock.advance_days(29);
/// assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
/// ```
#[derive(Debug)]
pub struct FixedClock {
    instant: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Creates a clock pinned to the given instant
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant: Mutex::new(instant),
        }
    }

    /// Creates a clock pinned to midnight UTC on the given date
    pub fn from_date(date: NaiveDate) -> Self {
        Self::new(date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
    }

    /// Re-pins the clock to a new instant
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.instant.lock().unwrap() = instant;
    }

    /// Re-pins the clock to midnight UTC on a new date
    pub fn set_date(&self, date: NaiveDate) {
        self.set(date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc());
    }

    /// Moves the clock forward by a duration
    pub fn advance(&self, duration: Duration) {
        let mut instant = self.instant.lock().unwrap();
        *instant += duration;
    }

    /// Moves the clock forward by whole days
    pub fn advance_days(&self, days: i64) {
        self.advance(Duration::days(days));
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.instant.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_today_matches_now() {
        let clock = SystemClock;
        assert_eq!(clock.today(), clock.now().date_naive());
    }

    #[test]
    fn test_fixed_clock_is_pinned() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let clock = FixedClock::from_date(date);

        assert_eq!(clock.today(), date);
        assert_eq!(clock.today(), date);
    }

    #[test]
    fn test_fixed_clock_advance_days() {
        let clock = FixedClock::from_date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        clock.advance_days(1);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn test_fixed_clock_set_date() {
        let clock = FixedClock::from_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        clock.set_date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
    }
}
