mod bulk;
pub mod recurrence;

pub use bulk::{BulkSessionRequest, RecurringSessionRequest, ScheduleError};
pub use recurrence::{Frequency, RecurrenceError, RecurrenceRule, generate};
