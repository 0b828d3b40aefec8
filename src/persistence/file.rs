use super::{ExportError, ExportResult};
use crate::event::{Calendar, CalendarEvent};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// One event as a flat row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEventRecord {
    pub uid: String,
    pub date: String,
    pub start: String,
    pub end: String,
    pub duration_minutes: i64,
    pub title: String,
    pub day_id: String,
    pub period_id: String,
    pub owner: String,
    pub resources: String,
    pub location: String,
    pub exceptional: bool,
}

impl From<&CalendarEvent> for CalendarEventRecord {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            uid: event.unique_id().to_string(),
            date: event.dtstart().date_naive().to_string(),
            start: event.dtstart().to_rfc3339_opts(SecondsFormat::Secs, true),
            end: event.dtend().to_rfc3339_opts(SecondsFormat::Secs, true),
            duration_minutes: event.duration().num_minutes(),
            title: event.title().to_string(),
            day_id: event.day_id().unwrap_or_default().to_string(),
            period_id: event.period_id().unwrap_or_default().to_string(),
            owner: event.owner().unwrap_or_default().to_string(),
            resources: event.resources().join(";"),
            location: event.location().unwrap_or_default().to_string(),
            exceptional: event.is_exceptional(),
        }
    }
}

pub fn write_calendar_csv<P: AsRef<Path>>(calendar: &Calendar, path: P) -> ExportResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for event in calendar {
        writer.serialize(CalendarEventRecord::from(event))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_event_records_from_csv<P: AsRef<Path>>(path: P) -> ExportResult<Vec<CalendarEventRecord>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut records = Vec::new();
    for record in reader.deserialize::<CalendarEventRecord>() {
        let record = record?;
        if record.uid.trim().is_empty() {
            return Err(ExportError::InvalidData(format!(
                "event {:?} on {} has no uid",
                record.title, record.date
            )));
        }
        records.push(record);
    }
    Ok(records)
}

pub fn save_calendar_to_json<P: AsRef<Path>>(calendar: &Calendar, path: P) -> ExportResult<()> {
    let records: Vec<CalendarEventRecord> = calendar.iter().map(CalendarEventRecord::from).collect();
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &records)?;
    Ok(())
}
