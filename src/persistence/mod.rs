//! Writing derived calendars out: CSV and JSON files and iCalendar text.

mod file;
mod ical;

pub use file::{
    CalendarEventRecord, load_event_records_from_csv, save_calendar_to_json, write_calendar_csv,
};
pub use ical::{calendar_to_ical, write_calendar_ical};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type ExportResult<T> = Result<T, ExportError>;
