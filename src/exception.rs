use crate::activity::Activity;
use crate::error::{TimetableError, TimetableResult};
use crate::event::CalendarEvent;
use chrono::NaiveDate;

/// Identifies one scheduled occurrence: an activity in a period on a date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExceptionKey {
    pub date: NaiveDate,
    pub period_id: String,
    pub activity: Activity,
}

/// An override of a single timetable occurrence.
///
/// Without a replacement the occurrence is cancelled. With one, the
/// replacement event is emitted instead of the regular event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableException {
    date: NaiveDate,
    period_id: String,
    activity: Activity,
    replacement: Option<CalendarEvent>,
}

impl TimetableException {
    pub fn new(date: NaiveDate, period_id: impl Into<String>, activity: Activity) -> Self {
        Self {
            date,
            period_id: period_id.into(),
            activity,
            replacement: None,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn period_id(&self) -> &str {
        &self.period_id
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    pub fn key(&self) -> ExceptionKey {
        ExceptionKey {
            date: self.date,
            period_id: self.period_id.clone(),
            activity: self.activity.clone(),
        }
    }

    pub fn replacement(&self) -> Option<&CalendarEvent> {
        self.replacement.as_ref()
    }

    /// Sets or clears the replacement. Only exceptional events are accepted.
    pub fn set_replacement(&mut self, replacement: Option<CalendarEvent>) -> TimetableResult<()> {
        if let Some(event) = &replacement {
            if !event.is_exceptional() {
                return Err(TimetableError::NotExceptional {
                    unique_id: event.unique_id().to_string(),
                });
            }
        }
        self.replacement = replacement;
        Ok(())
    }

    pub fn with_replacement(mut self, replacement: CalendarEvent) -> TimetableResult<Self> {
        self.set_replacement(Some(replacement))?;
        Ok(self)
    }
}
