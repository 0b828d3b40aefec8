use chrono::{NaiveDate, Weekday};
use thiserror::Error;

/// Configuration errors raised by the timetable model and its derivation.
///
/// Every variant signals inconsistent input supplied by the caller. None of
/// them is recoverable inside the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimetableError {
    #[error("day {day_id:?} is not one of the timetable day ids {day_ids:?}")]
    UnknownDay {
        day_id: String,
        day_ids: Vec<String>,
    },

    #[error("timetable day {day_id:?} already belongs to another timetable")]
    DayAlreadyOwned { day_id: String },

    #[error("period {period_id:?} is not one of the day periods {periods:?}")]
    UnknownPeriod {
        period_id: String,
        periods: Vec<String>,
    },

    #[error("timetables have different schemas")]
    SchemaMismatch,

    #[error("replacement event {unique_id:?} is not an exceptional timetable event")]
    NotExceptional { unique_id: String },

    #[error("no day template for {weekday} ({date}) and no default template")]
    MissingTemplate { date: NaiveDate, weekday: Weekday },

    #[error("no day template for day id {day_id:?}")]
    MissingDayTemplate { day_id: String },

    #[error("invalid timetable model: {0}")]
    InvalidModel(String),

    #[error("timetable has no model assigned")]
    MissingModel,

    #[error("unknown timezone {0:?}")]
    UnknownTimezone(String),

    #[error("unknown term {0:?}")]
    UnknownTerm(String),

    #[error("unknown timetable schema {0:?}")]
    UnknownSchema(String),

    #[error("unknown timetable model kind {0:?}")]
    UnknownModelKind(String),
}

pub type TimetableResult<T> = Result<T, TimetableError>;
