use crate::calendar::SchooldayCalendar;
use crate::error::{TimetableError, TimetableResult};
use crate::timetable::Timetable;
use std::collections::BTreeMap;

/// Terms by id.
#[derive(Debug, Clone, Default)]
pub struct TimePeriodService {
    terms: BTreeMap<String, SchooldayCalendar>,
}

impl TimePeriodService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, term: SchooldayCalendar) -> Option<SchooldayCalendar> {
        self.terms.insert(id.into(), term)
    }

    pub fn get(&self, id: &str) -> Option<&SchooldayCalendar> {
        self.terms.get(id)
    }

    pub fn term(&self, id: &str) -> TimetableResult<&SchooldayCalendar> {
        self.get(id)
            .ok_or_else(|| TimetableError::UnknownTerm(id.to_string()))
    }

    pub fn remove(&mut self, id: &str) -> Option<SchooldayCalendar> {
        self.terms.remove(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Timetable schemas by id.
///
/// Only the structure of a stored timetable is kept, and every lookup hands
/// out a fresh empty copy, so callers can fill it in without touching the
/// stored schema.
#[derive(Debug, Clone, Default)]
pub struct TimetableSchemaService {
    schemas: BTreeMap<String, Timetable>,
    default_id: Option<String>,
}

impl TimetableSchemaService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the schema of `timetable`. The first schema stored becomes the
    /// default one.
    pub fn insert(&mut self, id: impl Into<String>, timetable: &Timetable) {
        let id = id.into();
        if self.default_id.is_none() {
            self.default_id = Some(id.clone());
        }
        self.schemas.insert(id, timetable.clone_empty());
    }

    pub fn get(&self, id: &str) -> Option<Timetable> {
        self.schemas.get(id).map(Timetable::clone_empty)
    }

    pub fn schema(&self, id: &str) -> TimetableResult<Timetable> {
        self.get(id)
            .ok_or_else(|| TimetableError::UnknownSchema(id.to_string()))
    }

    pub fn remove(&mut self, id: &str) -> Option<Timetable> {
        let removed = self.schemas.remove(id);
        if self.default_id.as_deref() == Some(id) {
            self.default_id = self.schemas.keys().next().cloned();
        }
        removed
    }

    pub fn default_id(&self) -> Option<&str> {
        self.default_id.as_deref()
    }

    pub fn set_default_id(&mut self, id: &str) -> TimetableResult<()> {
        if !self.schemas.contains_key(id) {
            return Err(TimetableError::UnknownSchema(id.to_string()));
        }
        self.default_id = Some(id.to_string());
        Ok(())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
