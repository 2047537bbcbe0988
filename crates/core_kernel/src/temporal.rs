//! Calendar ranges and month keys
//!
//! Listings filter on an inclusive `[start, end]` window of UTC instants, and
//! monthly reports bucket records by calendar month. When a caller omits the
//! window, it defaults to the six months preceding `end` (or now).

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Length of the default listing window, in months
pub const DEFAULT_WINDOW_MONTHS: u32 = 6;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid range: start {start} must not be after end {end}")]
    InvalidRange {
        start: String,
        end: String,
    },

    #[error("Unparseable date: {0}")]
    Unparseable(String),

    #[error("Date arithmetic out of range")]
    OutOfRange,
}

/// Which side of a range a date-only input describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    /// Date-only input resolves to 00:00:00 of that day
    Start,
    /// Date-only input resolves to 23:59:59.999 of that day
    End,
}

/// Parses a query-string boundary: either RFC 3339 or a bare `YYYY-MM-DD`
pub fn parse_boundary(input: &str, bound: RangeBound) -> Result<DateTime<Utc>, TemporalError> {
    let input = input.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Ok(instant.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| TemporalError::Unparseable(input.to_string()))?;
    let time = match bound {
        RangeBound::Start => NaiveTime::MIN,
        RangeBound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
            .ok_or(TemporalError::OutOfRange)?,
    };
    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}

/// An inclusive window of UTC instants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    /// Creates a range; `start` must not be after `end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// The `months` calendar months preceding `end`
    pub fn trailing_months(end: DateTime<Utc>, months: u32) -> Result<Self, TemporalError> {
        let start = end
            .checked_sub_months(Months::new(months))
            .ok_or(TemporalError::OutOfRange)?;
        Self::new(start, end)
    }

    /// Resolves optional caller bounds, applying the default window
    ///
    /// A missing end means `now`; a missing start means six months before the end.
    pub fn resolve(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Self, TemporalError> {
        let end = end.unwrap_or(now);
        match start {
            Some(start) => Self::new(start, end),
            None => Self::trailing_months(end, DEFAULT_WINDOW_MONTHS),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Inclusive on both ends
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// Every calendar month touched by the range, in order
    pub fn months(&self) -> Vec<MonthKey> {
        let last = MonthKey::of(self.end);
        let mut keys = Vec::new();
        let mut current = MonthKey::of(self.start);
        while current <= last {
            keys.push(current);
            current = current.next();
        }
        keys
    }

    /// Number of calendar months touched by the range
    pub fn month_count(&self) -> usize {
        let first = MonthKey::of(self.start);
        let last = MonthKey::of(self.end);
        (last.ordinal() - first.ordinal() + 1) as usize
    }
}

/// A calendar month, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Creates a key; `month` is 1-based
    pub fn new(year: i32, month: u32) -> Result<Self, TemporalError> {
        if !(1..=12).contains(&month) {
            return Err(TemporalError::OutOfRange);
        }
        Ok(Self { year, month })
    }

    /// The month containing the given instant (UTC)
    pub fn of(instant: DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following calendar month
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}
