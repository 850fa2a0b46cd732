//! Permission schedule parsing and matching.
//!
//! A permission row stores its weekday set as a JSON array of numbers
//! (0 = Sunday through 6 = Saturday) and its daily window as `HH:MM`
//! strings. Matching happens here rather than in SQL so the rules are
//! unit-testable and independent of the database's clock.

use chrono::{DateTime, Timelike, Utc};

use crate::error::{Error, Result};

/// Parsed schedule of a permission row: weekday set plus a daily
/// time-of-day window with inclusive bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    days: Vec<u8>,
    start_minute: u16,
    end_minute: u16,
}

impl Schedule {
    /// Parse the stored representation of a schedule.
    ///
    /// `days_json` is a JSON array of weekday numbers, `start`/`end`
    /// are `HH:MM` strings. Returns an error on malformed input; the
    /// caller decides whether to fail closed.
    pub fn parse(days_json: &str, start: &str, end: &str) -> Result<Self> {
        let days: Vec<u8> = serde_json::from_str(days_json)?;
        if days.iter().any(|d| *d > 6) {
            return Err(Error::Schedule(format!("weekday out of range in {days_json}")));
        }
        Ok(Self {
            days,
            start_minute: parse_hhmm(start)?,
            end_minute: parse_hhmm(end)?,
        })
    }

    /// Whether the schedule covers the given weekday (0 = Sunday) and
    /// minute of the day. Both window bounds are inclusive.
    pub fn contains(&self, weekday: u8, minute_of_day: u16) -> bool {
        self.days.contains(&weekday)
            && minute_of_day >= self.start_minute
            && minute_of_day <= self.end_minute
    }

    /// Convenience: match against an instant in UTC.
    pub fn contains_instant(&self, at: DateTime<Utc>) -> bool {
        let weekday = weekday_number(at);
        let minute = minute_of_day(at);
        self.contains(weekday, minute)
    }
}

/// Weekday number of an instant, 0 = Sunday through 6 = Saturday.
#[allow(clippy::cast_possible_truncation)]
pub fn weekday_number(at: DateTime<Utc>) -> u8 {
    chrono::Datelike::weekday(&at).num_days_from_sunday() as u8
}

/// Minute of the day of an instant (0..=1439).
#[allow(clippy::cast_possible_truncation)]
pub fn minute_of_day(at: DateTime<Utc>) -> u16 {
    (at.hour() * 60 + at.minute()) as u16
}

fn parse_hhmm(value: &str) -> Result<u16> {
    let err = || Error::Schedule(format!("invalid time of day: {value}"));
    let (h, m) = value.split_once(':').ok_or_else(err)?;
    let hours: u16 = h.parse().map_err(|_| err())?;
    let minutes: u16 = m.parse().map_err(|_| err())?;
    if hours > 23 || minutes > 59 {
        return Err(err());
    }
    Ok(hours * 60 + minutes)
}
