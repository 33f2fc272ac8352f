//! Clock-time and interval arithmetic on a single implicit calendar.
//!
//! Everything here works on `chrono`'s naive types. Dates arrive as
//! `YYYY-MM-DD`, clock times as `HH:mm`, and nothing is ever routed through a
//! timezone, so the day-of-week of a date cannot shift under an offset.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};

/// A time of day with minute precision, written `HH:mm` (24-hour, zero-padded).
///
/// `24:00` is accepted and denotes the end of the day, so a window can run
/// until midnight. It anchors on the following date's `00:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

const MINUTES_PER_DAY: u16 = 24 * 60;

impl ClockTime {
    /// End of day, `24:00`.
    pub const END_OF_DAY: ClockTime = ClockTime(MINUTES_PER_DAY);

    /// Build a clock time from hour and minute. Returns `None` when out of
    /// range; `24:00` is the only valid time with hour 24.
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if minute >= 60 || hour > 24 || (hour == 24 && minute != 0) {
            return None;
        }
        Some(ClockTime((hour * 60 + minute) as u16))
    }

    /// Minutes elapsed since midnight, `0..=1440`.
    pub fn minutes_since_midnight(&self) -> u32 {
        u32::from(self.0)
    }

    /// Anchor this clock time on a calendar date.
    pub fn on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::MIN) + Duration::minutes(i64::from(self.0))
    }

    /// The clock time of an absolute timestamp, truncated to the minute.
    pub fn of(at: NaiveDateTime) -> Self {
        ClockTime((at.hour() * 60 + at.minute()) as u16)
    }
}

impl FromStr for ClockTime {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 5
            && bytes[2] == b':'
            && bytes[..2].iter().all(u8::is_ascii_digit)
            && bytes[3..].iter().all(u8::is_ascii_digit);
        if !well_formed {
            return Err(SlotError::invalid("time", format!("expected HH:mm, got '{}'", s)));
        }
        let hour: u32 = s[..2].parse().map_err(|_| SlotError::invalid("time", s))?;
        let minute: u32 = s[3..].parse().map_err(|_| SlotError::invalid("time", s))?;
        ClockTime::from_hm(hour, minute)
            .ok_or_else(|| SlotError::invalid("time", format!("'{}' is not a valid time of day", s)))
    }
}

impl TryFrom<String> for ClockTime {
    type Error = SlotError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Parse a calendar date written `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    if s.len() != 10 {
        return Err(SlotError::invalid("date", format!("expected YYYY-MM-DD, got '{}'", s)));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| SlotError::invalid("date", format!("'{}': {}", s, e)))
}

/// Day-of-week index of a date, 0 = Sunday through 6 = Saturday.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// A recurring daily window of availability, `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWindow {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl DailyWindow {
    /// # Errors
    /// Returns `SlotError::Validation` unless `start` is strictly before `end`.
    pub fn new(start: ClockTime, end: ClockTime) -> Result<Self> {
        if start >= end {
            return Err(SlotError::invalid(
                "window",
                format!("start {} must be before end {}", start, end),
            ));
        }
        Ok(DailyWindow { start, end })
    }

    /// The absolute range this window covers on `date`.
    pub fn on(&self, date: NaiveDate) -> TimeRange {
        TimeRange {
            start: self.start.on(date),
            end: self.end.on(date),
        }
    }
}

/// A half-open interval `[start, end)` of absolute timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        TimeRange { start, end }
    }

    /// The one overlap predicate used for listing and for commit.
    ///
    /// Two ranges overlap iff `a.start < b.end && b.start < a.end`; ranges that
    /// only touch at an endpoint do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Widen the range by `before` minutes on the left and `after` on the right.
    pub fn expand(&self, before: u32, after: u32) -> TimeRange {
        TimeRange {
            start: self.start - Duration::minutes(i64::from(before)),
            end: self.end + Duration::minutes(i64::from(after)),
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}
