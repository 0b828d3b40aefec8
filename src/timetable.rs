use crate::activity::Activity;
use crate::calendar::SchooldayModel;
use crate::error::{TimetableError, TimetableResult};
use crate::event::Calendar;
use crate::exception::TimetableException;
use crate::model::{TimetableModel, same_model};
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque identity of a timetable instance.
///
/// Used for the day ownership check and the activity back-reference only. It
/// never takes part in equality or in derived calendar output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimetableId(Uuid);

impl TimetableId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimetableId {
    fn default() -> Self {
        Self::new()
    }
}

/// Key of a timetable within an entity: the term (time period) and the schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimetableKey {
    pub period_id: String,
    pub schema_id: String,
}

impl TimetableKey {
    pub fn new(period_id: impl Into<String>, schema_id: impl Into<String>) -> Self {
        Self {
            period_id: period_id.into(),
            schema_id: schema_id.into(),
        }
    }

    /// Parses the `"<period>.<schema>"` form. Schema ids never contain dots.
    pub fn parse(input: &str) -> Option<Self> {
        let (period_id, schema_id) = input.rsplit_once('.')?;
        if period_id.is_empty() || schema_id.is_empty() {
            return None;
        }
        Some(Self::new(period_id, schema_id))
    }
}

impl fmt::Display for TimetableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.period_id, self.schema_id)
    }
}

/// Where a timetable lives; the suffix of every event UID derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableLocation {
    pub path: String,
    pub domain: String,
}

impl fmt::Display for TimetableLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.domain)
    }
}

/// One timetable day: an ordered list of periods, each holding a set of
/// activities.
#[derive(Debug, Clone)]
pub struct TimetableDay {
    periods: Vec<String>,
    activities: HashMap<String, BTreeSet<Activity>>,
    timetable: Option<TimetableId>,
}

impl TimetableDay {
    pub fn new<I, S>(periods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let periods: Vec<String> = periods.into_iter().map(Into::into).collect();
        let activities = periods
            .iter()
            .map(|period| (period.clone(), BTreeSet::new()))
            .collect();
        Self {
            periods,
            activities,
            timetable: None,
        }
    }

    pub fn periods(&self) -> &[String] {
        &self.periods
    }

    pub fn has_period(&self, period_id: &str) -> bool {
        self.periods.iter().any(|p| p == period_id)
    }

    pub fn timetable(&self) -> Option<TimetableId> {
        self.timetable
    }

    /// Activities of a period; an unknown period is an error.
    pub fn activities(&self, period_id: &str) -> TimetableResult<&BTreeSet<Activity>> {
        self.activities
            .get(period_id)
            .ok_or_else(|| self.unknown_period(period_id))
    }

    /// `(period_id, activities)` pairs in period order.
    pub fn items(&self) -> impl Iterator<Item = (&str, &BTreeSet<Activity>)> {
        self.periods.iter().filter_map(move |period| {
            self.activities
                .get(period)
                .map(|activities| (period.as_str(), activities))
        })
    }

    /// Adds an activity to a period. An activity not yet attached to a
    /// timetable is attached to the one owning this day.
    pub fn add(&mut self, period_id: &str, activity: Activity) -> TimetableResult<()> {
        let owner = self.timetable;
        if let Some(slot) = self.activities.get_mut(period_id) {
            let activity = if activity.timetable().is_none() {
                activity.attached_to(owner)
            } else {
                activity
            };
            slot.insert(activity);
            return Ok(());
        }
        Err(self.unknown_period(period_id))
    }

    /// Removes an activity. Returns whether it was present.
    pub fn remove(&mut self, period_id: &str, activity: &Activity) -> TimetableResult<bool> {
        match self.activities.get_mut(period_id) {
            Some(slot) => Ok(slot.remove(activity)),
            None => Err(self.unknown_period(period_id)),
        }
    }

    pub fn clear(&mut self, period_id: &str) -> TimetableResult<()> {
        match self.activities.get_mut(period_id) {
            Some(slot) => {
                slot.clear();
                Ok(())
            }
            None => Err(self.unknown_period(period_id)),
        }
    }

    fn clear_all(&mut self) {
        for activities in self.activities.values_mut() {
            activities.clear();
        }
    }

    fn attach(&mut self, owner: TimetableId) {
        self.timetable = Some(owner);
        for activities in self.activities.values_mut() {
            let detached: Vec<Activity> = activities
                .iter()
                .filter(|a| a.timetable().is_none())
                .cloned()
                .collect();
            for activity in detached {
                activities.replace(activity.attached_to(Some(owner)));
            }
        }
    }

    fn unknown_period(&self, period_id: &str) -> TimetableError {
        TimetableError::UnknownPeriod {
            period_id: period_id.to_string(),
            periods: self.periods.clone(),
        }
    }
}

impl PartialEq for TimetableDay {
    fn eq(&self, other: &Self) -> bool {
        self.periods == other.periods
            && self
                .periods
                .iter()
                .all(|period| self.activities.get(period) == other.activities.get(period))
    }
}

impl Eq for TimetableDay {}

/// A timetable: days and periods with activities, a list of exceptions, the
/// model mapping it onto calendar dates and the timezone its times are in.
///
/// A timetable without activities and exceptions is a schema.
#[derive(Debug)]
pub struct Timetable {
    id: TimetableId,
    day_ids: Vec<String>,
    days: HashMap<String, TimetableDay>,
    exceptions: Vec<TimetableException>,
    model: Option<Arc<dyn TimetableModel>>,
    timezone: Tz,
    location: Option<TimetableLocation>,
}

impl Timetable {
    /// Creates an empty timetable. A [`TimetableDay`] has to be assigned to
    /// every day id before the timetable is used.
    pub fn new<I, S>(day_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: TimetableId::new(),
            day_ids: day_ids.into_iter().map(Into::into).collect(),
            days: HashMap::new(),
            exceptions: Vec::new(),
            model: None,
            timezone: Tz::UTC,
            location: None,
        }
    }

    pub fn id(&self) -> TimetableId {
        self.id
    }

    pub fn day_ids(&self) -> &[String] {
        &self.day_ids
    }

    pub fn day(&self, day_id: &str) -> Option<&TimetableDay> {
        self.days.get(day_id)
    }

    pub fn day_mut(&mut self, day_id: &str) -> Option<&mut TimetableDay> {
        self.days.get_mut(day_id)
    }

    /// Assigns a day. The day id must be declared and the day must not belong
    /// to any timetable yet.
    pub fn set_day(&mut self, day_id: &str, mut day: TimetableDay) -> TimetableResult<()> {
        if !self.day_ids.iter().any(|d| d == day_id) {
            return Err(TimetableError::UnknownDay {
                day_id: day_id.to_string(),
                day_ids: self.day_ids.clone(),
            });
        }
        if day.timetable.is_some() {
            return Err(TimetableError::DayAlreadyOwned {
                day_id: day_id.to_string(),
            });
        }
        day.attach(self.id);
        self.days.insert(day_id.to_string(), day);
        Ok(())
    }

    /// `(day_id, day)` pairs in day id order, skipping unassigned days.
    pub fn items(&self) -> impl Iterator<Item = (&str, &TimetableDay)> {
        self.day_ids
            .iter()
            .filter_map(move |day_id| self.days.get(day_id).map(|day| (day_id.as_str(), day)))
    }

    /// Every `(day_id, period_id, activity)` triple, in declared day order
    /// and then declared period order.
    pub fn itercontent(&self) -> impl Iterator<Item = (&str, &str, &Activity)> {
        self.items().flat_map(|(day_id, day)| {
            day.items().flat_map(move |(period_id, activities)| {
                activities
                    .iter()
                    .map(move |activity| (day_id, period_id, activity))
            })
        })
    }

    /// Removes every activity, keeping the structure.
    pub fn clear(&mut self) {
        for day in self.days.values_mut() {
            day.clear_all();
        }
    }

    /// Adds all activities and exceptions of `other`, which must have the same
    /// schema. On a schema mismatch `self` is left untouched.
    pub fn update(&mut self, other: &Timetable) -> TimetableResult<()> {
        if self.clone_empty() != other.clone_empty() {
            return Err(TimetableError::SchemaMismatch);
        }
        for (day_id, period_id, activity) in other.itercontent() {
            if let Some(day) = self.days.get_mut(day_id) {
                day.add(period_id, activity.clone())?;
            }
        }
        self.exceptions.extend(other.exceptions.iter().cloned());
        Ok(())
    }

    /// A structurally identical timetable with no activities and no
    /// exceptions: same day ids, same periods per day, same model and
    /// timezone.
    pub fn clone_empty(&self) -> Timetable {
        let mut other = Timetable::new(self.day_ids.iter().cloned());
        other.model = self.model.clone();
        other.timezone = self.timezone;
        for (day_id, day) in self.items() {
            let mut empty = TimetableDay::new(day.periods.iter().cloned());
            empty.attach(other.id);
            other.days.insert(day_id.to_string(), empty);
        }
        other
    }

    pub fn exceptions(&self) -> &[TimetableException] {
        &self.exceptions
    }

    pub fn add_exception(&mut self, exception: TimetableException) {
        self.exceptions.push(exception);
    }

    pub fn remove_exception(&mut self, exception: &TimetableException) -> bool {
        match self.exceptions.iter().position(|e| e == exception) {
            Some(idx) => {
                self.exceptions.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn model(&self) -> Option<&Arc<dyn TimetableModel>> {
        self.model.as_ref()
    }

    pub fn set_model(&mut self, model: Arc<dyn TimetableModel>) {
        self.model = Some(model);
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn set_timezone(&mut self, timezone: Tz) {
        self.timezone = timezone;
    }

    pub fn set_timezone_name(&mut self, name: &str) -> TimetableResult<()> {
        self.timezone = parse_timezone(name)?;
        Ok(())
    }

    pub fn location(&self) -> Option<&TimetableLocation> {
        self.location.as_ref()
    }

    pub fn set_location(&mut self, location: TimetableLocation) {
        self.location = Some(location);
    }

    /// Derives this timetable's calendar with its own model.
    pub fn create_calendar(
        &self,
        schooldays: &dyn SchooldayModel,
        first: Option<NaiveDate>,
        last: Option<NaiveDate>,
    ) -> TimetableResult<Calendar> {
        let model = self.model.as_deref().ok_or(TimetableError::MissingModel)?;
        model.create_calendar(schooldays, self, first, last)
    }

    pub(crate) fn uid_suffix(&self) -> String {
        match &self.location {
            Some(location) => location.to_string(),
            None => "unplaced@localhost".to_string(),
        }
    }
}

impl Clone for Timetable {
    /// The copy gets a fresh identity and owns copies of all days.
    fn clone(&self) -> Self {
        let id = TimetableId::new();
        let days = self
            .days
            .iter()
            .map(|(day_id, day)| {
                let mut day = day.clone();
                day.timetable = Some(id);
                (day_id.clone(), day)
            })
            .collect();
        Self {
            id,
            day_ids: self.day_ids.clone(),
            days,
            exceptions: self.exceptions.clone(),
            model: self.model.clone(),
            timezone: self.timezone,
            location: self.location.clone(),
        }
    }
}

impl PartialEq for Timetable {
    fn eq(&self, other: &Self) -> bool {
        self.items().eq(other.items())
            && same_model(self.model.as_deref(), other.model.as_deref())
            && self.exceptions == other.exceptions
            && self.timezone == other.timezone
    }
}

pub fn parse_timezone(name: &str) -> TimetableResult<Tz> {
    name.parse::<Tz>()
        .map_err(|_| TimetableError::UnknownTimezone(name.to_string()))
}
