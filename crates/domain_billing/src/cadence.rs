//! Billing cadence and next-occurrence computation
//!
//! A [`Cadence`] describes how often a recurrence schedule fires: a
//! frequency, an interval multiplier, and optional weekday / day-of-month
//! anchoring. [`Cadence::next_occurrence`] is the pure date function the
//! rest of the engine builds on; it never touches a clock or any state.

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BillingError;

/// How often a schedule recurs
///
/// The set is closed: unknown frequency strings are rejected at parse
/// time rather than silently falling back to monthly behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Every `interval_count` days
    Daily,
    /// Every `interval_count` weeks
    Weekly,
    /// Every 2 × `interval_count` weeks
    Biweekly,
    /// Every `interval_count` months
    Monthly,
    /// Every 3 × `interval_count` months
    Quarterly,
    /// Every 12 × `interval_count` months
    Yearly,
}

impl Frequency {
    /// All frequencies, in ascending period order
    pub const ALL: [Frequency; 6] = [
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Biweekly,
        Frequency::Monthly,
        Frequency::Quarterly,
        Frequency::Yearly,
    ];

    /// Returns the lowercase name used in storage and serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "biweekly" => Ok(Frequency::Biweekly),
            "monthly" => Ok(Frequency::Monthly),
            "quarterly" => Ok(Frequency::Quarterly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(BillingError::invalid_cadence(format!(
                "unknown frequency: {}",
                other
            ))),
        }
    }
}

/// A validated billing cadence
///
/// Constructed through [`Cadence::new`] plus the `with_*` anchoring
/// methods, all of which validate eagerly so that an invalid cadence can
/// never reach the date math.
///
/// # Examples
///
/// ```rust
/// use domain_billing::cadence::{Cadence, Frequency};
/// use chrono::NaiveDate;
///
/// let cadence = Cadence::new(Frequency::Monthly, 1)
///     .unwrap()
///     .with_day_of_month(31)
///     .unwrap();
///
/// let from = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
/// assert_eq!(
///     cadence.next_occurrence(from),
///     NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cadence {
    frequency: Frequency,
    interval_count: u32,
    day_of_week: Option<u8>,
    day_of_month: Option<u8>,
}

impl Cadence {
    /// Creates a cadence with the given frequency and interval multiplier
    ///
    /// # Errors
    ///
    /// Returns `BillingError::InvalidCadence` if `interval_count` is zero.
    pub fn new(frequency: Frequency, interval_count: u32) -> Result<Self, BillingError> {
        if interval_count == 0 {
            return Err(BillingError::invalid_cadence(
                "interval_count must be at least 1",
            ));
        }
        Ok(Self {
            frequency,
            interval_count,
            day_of_week: None,
            day_of_month: None,
        })
    }

    /// Anchors weekly occurrences to a weekday (1 = Monday .. 7 = Sunday)
    ///
    /// # Errors
    ///
    /// Returns `BillingError::InvalidCadence` if `day` is outside 1..=7.
    pub fn with_day_of_week(mut self, day: u8) -> Result<Self, BillingError> {
        if !(1..=7).contains(&day) {
            return Err(BillingError::invalid_cadence(format!(
                "day_of_week must be 1-7, got {}",
                day
            )));
        }
        self.day_of_week = Some(day);
        Ok(self)
    }

    /// Anchors monthly-family occurrences to a day of month (1..=31)
    ///
    /// Days past the end of a target month are clamped to that month's
    /// last day.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::InvalidCadence` if `day` is outside 1..=31.
    pub fn with_day_of_month(mut self, day: u8) -> Result<Self, BillingError> {
        if !(1..=31).contains(&day) {
            return Err(BillingError::invalid_cadence(format!(
                "day_of_month must be 1-31, got {}",
                day
            )));
        }
        self.day_of_month = Some(day);
        Ok(self)
    }

    /// Returns the frequency
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Returns the interval multiplier
    pub fn interval_count(&self) -> u32 {
        self.interval_count
    }

    /// Returns the weekday anchor, if set
    pub fn day_of_week(&self) -> Option<u8> {
        self.day_of_week
    }

    /// Returns the day-of-month anchor, if set
    pub fn day_of_month(&self) -> Option<u8> {
        self.day_of_month
    }

    /// Computes the next occurrence strictly after `from`
    ///
    /// Rules, per frequency:
    ///
    /// - daily: `from` + interval days
    /// - weekly: `from` + interval weeks, then rolled forward to the
    ///   anchored weekday if one is set (wrapping into the following week,
    ///   never earlier than the jumped-forward base)
    /// - biweekly: `from` + 2 × interval weeks
    /// - monthly / quarterly / yearly: `from` + 1 / 3 / 12 × interval
    ///   months with end-of-month clamping, then re-anchored to
    ///   `min(day_of_month, days in target month)` if an anchor is set
    ///
    /// The result is always strictly after `from` because every branch
    /// advances by at least one day before anchoring is applied, and
    /// anchoring never leaves the target week or month.
    pub fn next_occurrence(&self, from: NaiveDate) -> NaiveDate {
        match self.frequency {
            Frequency::Daily => from + Duration::days(i64::from(self.interval_count)),
            Frequency::Weekly => {
                let base = from + Duration::weeks(i64::from(self.interval_count));
                match self.day_of_week {
                    Some(target) => roll_forward_to_weekday(base, target),
                    None => base,
                }
            }
            Frequency::Biweekly => from + Duration::weeks(2 * i64::from(self.interval_count)),
            Frequency::Monthly => self.add_months_anchored(from, self.interval_count),
            Frequency::Quarterly => {
                self.add_months_anchored(from, self.interval_count.saturating_mul(3))
            }
            Frequency::Yearly => {
                self.add_months_anchored(from, self.interval_count.saturating_mul(12))
            }
        }
    }

    /// Advances by whole months with clamping, then applies the
    /// day-of-month anchor
    fn add_months_anchored(&self, from: NaiveDate, months: u32) -> NaiveDate {
        let advanced = from
            .checked_add_months(Months::new(months))
            .unwrap_or(NaiveDate::MAX);
        match self.day_of_month {
            Some(anchor) => {
                let day =
                    u32::from(anchor).min(days_in_month(advanced.year(), advanced.month()));
                advanced.with_day(day).unwrap_or(advanced)
            }
            None => advanced,
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "every {} {}", self.interval_count, self.frequency)
    }
}

/// Rolls `base` forward to the next matching weekday (1 = Monday)
///
/// Returns `base` itself when it already falls on the target weekday.
fn roll_forward_to_weekday(base: NaiveDate, target: u8) -> NaiveDate {
    let current = base.weekday().number_from_monday();
    let delta = (u32::from(target) + 7 - current) % 7;
    base + Duration::days(i64::from(delta))
}

/// Number of days in the given month
fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}
