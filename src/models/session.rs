use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::NoShow => "no_show",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(SessionStatus::Scheduled),
            "completed" => Ok(SessionStatus::Completed),
            "cancelled" => Ok(SessionStatus::Cancelled),
            "no_show" => Ok(SessionStatus::NoShow),
            other => Err(format!("unknown session status '{other}'")),
        }
    }
}

/// A workout session on the trainer's calendar.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: i32,
    pub client_id: Option<i32>,
    pub workout_template_id: Option<i32>,
    pub scheduled_at: NaiveDateTime,
    pub duration_minutes: i32,
    pub status: SessionStatus,
    pub note: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub client_id: Option<i32>,
    pub workout_template_id: Option<i32>,
    pub scheduled_at: NaiveDateTime,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    #[serde(default)]
    pub status: SessionStatus,
    pub note: Option<String>,
}

/// Length of a session when the caller does not give one.
pub const DEFAULT_SESSION_MINUTES: i32 = 60;

fn default_duration() -> i32 {
    DEFAULT_SESSION_MINUTES
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
    pub scheduled_at: Option<NaiveDateTime>,
    pub duration_minutes: Option<i32>,
    pub status: Option<SessionStatus>,
    pub note: Option<String>,
    pub workout_template_id: Option<i32>,
}

impl SessionPatch {
    pub fn apply(self, session: &mut Session) {
        if let Some(scheduled_at) = self.scheduled_at {
            session.scheduled_at = scheduled_at;
        }
        if let Some(duration) = self.duration_minutes {
            session.duration_minutes = duration;
        }
        if let Some(status) = self.status {
            session.status = status;
        }
        if let Some(note) = self.note {
            session.note = Some(note);
        }
        if let Some(template_id) = self.workout_template_id {
            session.workout_template_id = Some(template_id);
        }
    }
}

/// Query parameters for listing sessions. `from` is inclusive, `to` exclusive.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionFilter {
    pub client_id: Option<i32>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

impl SessionFilter {
    pub fn matches(&self, session: &Session) -> bool {
        if let Some(client_id) = self.client_id {
            if session.client_id != Some(client_id) {
                return false;
            }
        }
        if let Some(from) = self.from {
            if session.scheduled_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if session.scheduled_at >= to {
                return false;
            }
        }
        true
    }
}
