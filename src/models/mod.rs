mod trainer;
mod client;
mod workout_template;
mod session;
mod measurement;
mod goal;
mod calendar_event;

pub use trainer::{NewTrainer, Trainer};
pub use client::{Client, ClientPatch, NewClient};
pub use workout_template::{NewWorkoutTemplate, WorkoutTemplate, WorkoutTemplatePatch};
pub use session::{DEFAULT_SESSION_MINUTES, NewSession, Session, SessionFilter, SessionPatch, SessionStatus};
pub use measurement::{Measurement, NewMeasurement};
pub use goal::{Goal, GoalPatch, NewGoal};
pub use calendar_event::{CalendarEvent, NewCalendarEvent};
