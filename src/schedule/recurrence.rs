//! Date generation for recurring session series.
//!
//! A [`RecurrenceRule`] is validated up front; generation itself cannot fail
//! and always yields an ascending, bounded list of date-times at
//! [`SESSION_HOUR`]:00.
//!
//! Monthly rules whose `day_of_month` does not exist in a given month (31 in
//! April, 30 in February) land on the last day of that month. The following
//! month goes back to the requested day.

use std::fmt;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hour of day every generated session starts at.
pub const SESSION_HOUR: u32 = 9;

/// Largest series one rule may produce: ten years of weekly sessions.
pub const MAX_SERIES_SESSIONS: u32 = 520;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
}

impl Frequency {
    /// Cap applied when the rule does not name one.
    pub fn default_max_sessions(self) -> u32 {
        match self {
            Frequency::Weekly => 52,
            Frequency::Biweekly => 26,
            Frequency::Monthly => 12,
        }
    }

    pub fn all() -> [Frequency; 3] {
        [Frequency::Weekly, Frequency::Biweekly, Frequency::Monthly]
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::Monthly => "monthly",
        };
        f.write_str(name)
    }
}

/// Caller-supplied description of a series.
///
/// `start_date` is optional so that a missing value is reported as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub max_sessions: Option<u32>,
    /// 1 = Monday ... 7 = Sunday
    #[serde(default)]
    pub day_of_week: Option<u32>,
    /// 1 ..= 31
    #[serde(default)]
    pub day_of_month: Option<u32>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("start date is required")]
    MissingStartDate,
    #[error("day of week is required for {0} sessions")]
    MissingDayOfWeek(Frequency),
    #[error("day of month is required for monthly sessions")]
    MissingDayOfMonth,
    #[error("day of week must be between 1 (Monday) and 7 (Sunday), got {0}")]
    InvalidDayOfWeek(u32),
    #[error("day of month must be between 1 and 31, got {0}")]
    InvalidDayOfMonth(u32),
    #[error("at most {limit} sessions can be scheduled at once, got {max}")]
    TooManySessions { max: u32, limit: u32 },
    #[error("end date {end} must be after start date {start}")]
    EndNotAfterStart { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, Copy)]
enum Anchor {
    /// Days from Monday, 0 ..= 6
    Weekday { offset: u32, period: u64 },
    DayOfMonth(u32),
}

impl RecurrenceRule {
    #[cfg(test)]
    pub fn weekly(start_date: NaiveDate, day_of_week: u32) -> Self {
        Self {
            frequency: Frequency::Weekly,
            start_date: Some(start_date),
            end_date: None,
            max_sessions: None,
            day_of_week: Some(day_of_week),
            day_of_month: None,
        }
    }

    #[cfg(test)]
    pub fn biweekly(start_date: NaiveDate, day_of_week: u32) -> Self {
        Self {
            frequency: Frequency::Biweekly,
            ..Self::weekly(start_date, day_of_week)
        }
    }

    #[cfg(test)]
    pub fn monthly(start_date: NaiveDate, day_of_month: u32) -> Self {
        Self {
            frequency: Frequency::Monthly,
            start_date: Some(start_date),
            end_date: None,
            max_sessions: None,
            day_of_week: None,
            day_of_month: Some(day_of_month),
        }
    }

    #[cfg(test)]
    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    #[cfg(test)]
    pub fn limit(mut self, max_sessions: u32) -> Self {
        self.max_sessions = Some(max_sessions);
        self
    }

    /// The cap actually applied: the explicit one or the frequency default.
    pub fn max_sessions(&self) -> u32 {
        self.max_sessions
            .unwrap_or_else(|| self.frequency.default_max_sessions())
    }

    fn validate(&self) -> Result<(NaiveDate, Anchor), RecurrenceError> {
        let start = self.start_date.ok_or(RecurrenceError::MissingStartDate)?;

        let anchor = match self.frequency {
            Frequency::Weekly | Frequency::Biweekly => {
                let day = self
                    .day_of_week
                    .ok_or(RecurrenceError::MissingDayOfWeek(self.frequency))?;
                if !(1..=7).contains(&day) {
                    return Err(RecurrenceError::InvalidDayOfWeek(day));
                }
                let period = if self.frequency == Frequency::Weekly { 7 } else { 14 };
                Anchor::Weekday {
                    offset: day - 1,
                    period,
                }
            }
            Frequency::Monthly => {
                let day = self
                    .day_of_month
                    .ok_or(RecurrenceError::MissingDayOfMonth)?;
                if !(1..=31).contains(&day) {
                    return Err(RecurrenceError::InvalidDayOfMonth(day));
                }
                Anchor::DayOfMonth(day)
            }
        };

        let max = self.max_sessions();
        if max > MAX_SERIES_SESSIONS {
            return Err(RecurrenceError::TooManySessions {
                max,
                limit: MAX_SERIES_SESSIONS,
            });
        }

        if let Some(end) = self.end_date {
            if end <= start {
                return Err(RecurrenceError::EndNotAfterStart { start, end });
            }
        }

        Ok((start, anchor))
    }
}

/// Generate the dates of a recurring series.
pub fn generate(rule: &RecurrenceRule) -> Result<Vec<NaiveDateTime>, RecurrenceError> {
    let (start, anchor) = rule.validate()?;
    let limit = rule.max_sessions() as usize;
    let end = rule.end_date;
    let time = session_time();

    let dates: Box<dyn Iterator<Item = NaiveDate>> = match anchor {
        Anchor::Weekday { offset, period } => Box::new(weekly_series(start, offset, period)),
        Anchor::DayOfMonth(day) => Box::new(monthly_series(start, day)),
    };

    Ok(dates
        .take_while(|date| end.is_none_or(|end| *date <= end))
        .take(limit)
        .map(|date| date.and_time(time))
        .collect())
}

fn session_time() -> NaiveTime {
    NaiveTime::from_hms_opt(SESSION_HOUR, 0, 0).unwrap_or_default()
}

fn weekly_series(start: NaiveDate, offset: u32, period: u64) -> impl Iterator<Item = NaiveDate> {
    let current = start.weekday().num_days_from_monday();
    let days_ahead = (offset + 7 - current) % 7;
    let first = start.checked_add_days(Days::new(u64::from(days_ahead)));

    std::iter::successors(first, move |date| date.checked_add_days(Days::new(period)))
}

fn monthly_series(start: NaiveDate, day: u32) -> impl Iterator<Item = NaiveDate> {
    let start_index = month_index(start.year(), start.month());
    let skip = match day_in_month(start_index, day) {
        Some(candidate) if candidate < start => 1,
        _ => 0,
    };

    (skip..).map_while(move |offset| day_in_month(start_index + offset, day))
}

/// Months since year 0, so that month arithmetic is plain addition.
fn month_index(year: i32, month: u32) -> i64 {
    i64::from(year) * 12 + i64::from(month) - 1
}

fn day_in_month(index: i64, day: u32) -> Option<NaiveDate> {
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
    NaiveDate::from_ymd_opt(year, month, day.min(days_in_month(year, month)))
}

/// Number of days in the given month of the given year.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(30)
}
