use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use thiserror::Error;

use super::recurrence::{self, RecurrenceError, RecurrenceRule};
use crate::models::{DEFAULT_SESSION_MINUTES, NewSession, SessionStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid time '{0}', expected HH:MM")]
    InvalidTime(String),
    #[error("duration must be positive, got {0}")]
    InvalidDuration(i32),
    #[error(transparent)]
    Recurrence(#[from] RecurrenceError),
}

/// Parse an `HH:MM` (or `HH:MM:SS`) wall-clock time.
pub fn parse_time(value: &str) -> Result<NaiveTime, ScheduleError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| ScheduleError::InvalidTime(value.to_string()))
}

fn check_duration(duration: Option<i32>) -> Result<i32, ScheduleError> {
    match duration {
        None => Ok(DEFAULT_SESSION_MINUTES),
        Some(minutes) if minutes > 0 => Ok(minutes),
        Some(minutes) => Err(ScheduleError::InvalidDuration(minutes)),
    }
}

/// Body of `POST /api/sessions/bulk`: the caller already picked the dates.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSessionRequest {
    pub client_id: i32,
    pub dates: Vec<NaiveDate>,
    pub time: String,
    pub note: Option<String>,
    pub duration: Option<i32>,
    pub workout_template_id: Option<i32>,
}

impl BulkSessionRequest {
    pub fn to_sessions(&self) -> Result<Vec<NewSession>, ScheduleError> {
        let time = parse_time(&self.time)?;
        let timestamps: Vec<NaiveDateTime> =
            self.dates.iter().map(|date| date.and_time(time)).collect();
        expand(
            self.client_id,
            &timestamps,
            self.duration,
            self.note.as_deref(),
            self.workout_template_id,
        )
    }
}

/// Body of `POST /api/sessions/recurring`: the server generates the dates.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringSessionRequest {
    pub client_id: i32,
    #[serde(flatten)]
    pub rule: RecurrenceRule,
    /// Overrides the default start time of generated sessions.
    pub time: Option<String>,
    pub note: Option<String>,
    pub duration: Option<i32>,
    pub workout_template_id: Option<i32>,
}

impl RecurringSessionRequest {
    pub fn to_sessions(&self) -> Result<Vec<NewSession>, ScheduleError> {
        let time = self.time.as_deref().map(parse_time).transpose()?;
        let mut timestamps = recurrence::generate(&self.rule)?;
        if let Some(time) = time {
            for timestamp in &mut timestamps {
                *timestamp = timestamp.date().and_time(time);
            }
        }
        expand(
            self.client_id,
            &timestamps,
            self.duration,
            self.note.as_deref(),
            self.workout_template_id,
        )
    }
}

fn expand(
    client_id: i32,
    timestamps: &[NaiveDateTime],
    duration: Option<i32>,
    note: Option<&str>,
    workout_template_id: Option<i32>,
) -> Result<Vec<NewSession>, ScheduleError> {
    let duration_minutes = check_duration(duration)?;
    Ok(timestamps
        .iter()
        .map(|scheduled_at| NewSession {
            client_id: Some(client_id),
            workout_template_id,
            scheduled_at: *scheduled_at,
            duration_minutes,
            status: SessionStatus::Scheduled,
            note: note.map(str::to_string),
        })
        .collect())
}
