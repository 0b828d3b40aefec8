use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Read-only view of a term: a date range and which of its dates are schooldays.
///
/// This is all the timetable derivation needs from a term; anything that can
/// answer these two questions can drive a timetable model.
pub trait SchooldayModel {
    fn first(&self) -> NaiveDate;
    fn last(&self) -> NaiveDate;

    /// Dates outside `first..=last` are never schooldays.
    fn is_schoolday(&self, date: NaiveDate) -> bool;

    fn contains(&self, date: NaiveDate) -> bool {
        self.first() <= date && date <= self.last()
    }

    fn days(&self) -> DateRange {
        DateRange::new(self.first(), self.last())
    }
}

/// Inclusive iterator over consecutive calendar dates.
#[derive(Debug, Clone)]
pub struct DateRange {
    next: Option<NaiveDate>,
    last: NaiveDate,
}

impl DateRange {
    pub fn new(first: NaiveDate, last: NaiveDate) -> Self {
        let next = if first <= last { Some(first) } else { None };
        Self { next, last }
    }
}

impl Iterator for DateRange {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        self.next = current.succ_opt().filter(|next| *next <= self.last);
        Some(current)
    }
}

/// A term: a date range plus an explicit set of schooldays inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchooldayCalendar {
    title: String,
    first: NaiveDate,
    last: NaiveDate,
    schooldays: BTreeSet<NaiveDate>,
}

/// Serializable description of a [`SchooldayCalendar`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchooldayCalendarConfig {
    #[serde(default)]
    pub title: String,
    pub first: NaiveDate,
    pub last: NaiveDate,
    #[serde(default)]
    pub weekdays: Vec<Weekday>,
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
    #[serde(default)]
    pub extra_schooldays: Vec<NaiveDate>,
}

impl SchooldayCalendar {
    /// Creates a term with no schooldays. A reversed range is swapped.
    pub fn new(title: impl Into<String>, first: NaiveDate, last: NaiveDate) -> Self {
        let (first, last) = if first <= last {
            (first, last)
        } else {
            (last, first)
        };
        Self {
            title: title.into(),
            first,
            last,
            schooldays: BTreeSet::new(),
        }
    }

    /// Creates a term where every listed weekday is a schoolday.
    pub fn with_weekdays<I>(title: impl Into<String>, first: NaiveDate, last: NaiveDate, weekdays: I) -> Self
    where
        I: IntoIterator<Item = Weekday>,
    {
        let mut calendar = Self::new(title, first, last);
        calendar.add_weekdays(weekdays);
        calendar
    }

    pub fn from_config(config: &SchooldayCalendarConfig) -> Self {
        let mut calendar =
            Self::with_weekdays(config.title.clone(), config.first, config.last, config.weekdays.iter().copied());
        for holiday in &config.holidays {
            calendar.remove(*holiday);
        }
        for extra in &config.extra_schooldays {
            calendar.add(*extra);
        }
        calendar
    }

    /// Lossless config: every schoolday is listed explicitly.
    pub fn to_config(&self) -> SchooldayCalendarConfig {
        SchooldayCalendarConfig {
            title: self.title.clone(),
            first: self.first,
            last: self.last,
            weekdays: Vec::new(),
            holidays: Vec::new(),
            extra_schooldays: self.schooldays.iter().copied().collect(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Changes the date range and forgets all schooldays.
    pub fn reset(&mut self, first: NaiveDate, last: NaiveDate) {
        let (first, last) = if first <= last {
            (first, last)
        } else {
            (last, first)
        };
        self.first = first;
        self.last = last;
        self.schooldays.clear();
    }

    /// Marks a date as a schoolday. Returns false when the date is outside the term.
    pub fn add(&mut self, date: NaiveDate) -> bool {
        if !SchooldayModel::contains(self, date) {
            return false;
        }
        self.schooldays.insert(date);
        true
    }

    pub fn remove(&mut self, date: NaiveDate) -> bool {
        self.schooldays.remove(&date)
    }

    pub fn add_weekdays<I>(&mut self, weekdays: I)
    where
        I: IntoIterator<Item = Weekday>,
    {
        let weekdays: Vec<Weekday> = weekdays.into_iter().collect();
        for date in DateRange::new(self.first, self.last) {
            if weekdays.contains(&date.weekday()) {
                self.schooldays.insert(date);
            }
        }
    }

    pub fn remove_weekdays<I>(&mut self, weekdays: I)
    where
        I: IntoIterator<Item = Weekday>,
    {
        let weekdays: Vec<Weekday> = weekdays.into_iter().collect();
        self.schooldays
            .retain(|date| !weekdays.contains(&date.weekday()));
    }

    /// Flips every date on the given weekdays between schoolday and holiday.
    pub fn toggle_weekdays<I>(&mut self, weekdays: I)
    where
        I: IntoIterator<Item = Weekday>,
    {
        let weekdays: Vec<Weekday> = weekdays.into_iter().collect();
        for date in DateRange::new(self.first, self.last) {
            if weekdays.contains(&date.weekday()) && !self.schooldays.remove(&date) {
                self.schooldays.insert(date);
            }
        }
    }

    pub fn schooldays(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.schooldays.iter().copied()
    }

    pub fn count_schooldays(&self) -> usize {
        self.schooldays.len()
    }
}

impl SchooldayModel for SchooldayCalendar {
    fn first(&self) -> NaiveDate {
        self.first
    }

    fn last(&self) -> NaiveDate {
        self.last
    }

    fn is_schoolday(&self, date: NaiveDate) -> bool {
        self.schooldays.contains(&date)
    }
}

impl From<&SchooldayCalendar> for SchooldayCalendarConfig {
    fn from(calendar: &SchooldayCalendar) -> Self {
        calendar.to_config()
    }
}
