//! Timetable models: the strategies mapping calendar dates to timetable day
//! ids and day ids to period templates.

mod derive;
mod registry;
mod sequential;
mod weekly;

pub use derive::CalendarEvents;
pub use registry::{ModelFactory, ModelRegistry, ModelSpec, SlotSpec};
pub use sequential::{SequentialDayIdBasedModel, SequentialDaysModel};
pub use weekly::WeeklyModel;

use crate::calendar::SchooldayModel;
use crate::error::{TimetableError, TimetableResult};
use crate::event::Calendar;
use crate::template::{DayTemplate, PeriodSlot};
use crate::timetable::Timetable;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::warn;

/// What a day template is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateKey {
    /// Catch-all used when nothing more specific matches.
    Default,
    Weekday(Weekday),
    DayId(String),
}

/// Position in a cyclic day id sequence.
///
/// Only ordinary schooldays advance it. Dates whose day id comes from an
/// exception leave it where it is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayCursor {
    position: usize,
}

impl DayCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the day id at the current position and moves past it.
    pub fn advance(&mut self, day_ids: &[String]) -> Option<String> {
        if day_ids.is_empty() {
            return None;
        }
        let day_id = day_ids[self.position % day_ids.len()].clone();
        self.position += 1;
        Some(day_id)
    }
}

/// State shared by every model: its day ids, its templates and the per-date
/// overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCore {
    day_ids: Vec<String>,
    templates: HashMap<TemplateKey, DayTemplate>,
    exception_days: BTreeMap<NaiveDate, DayTemplate>,
    exception_day_ids: BTreeMap<NaiveDate, String>,
}

impl ModelCore {
    pub fn new<I, S>(day_ids: I, templates: HashMap<TemplateKey, DayTemplate>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            day_ids: day_ids.into_iter().map(Into::into).collect(),
            templates,
            exception_days: BTreeMap::new(),
            exception_day_ids: BTreeMap::new(),
        }
    }

    pub fn day_ids(&self) -> &[String] {
        &self.day_ids
    }

    pub fn template(&self, key: &TemplateKey) -> Option<&DayTemplate> {
        self.templates.get(key)
    }

    pub fn templates(&self) -> &HashMap<TemplateKey, DayTemplate> {
        &self.templates
    }

    /// Template for `date` by weekday, falling back to the default template.
    pub fn weekday_template(&self, date: NaiveDate) -> TimetableResult<&DayTemplate> {
        let weekday = date.weekday();
        self.templates
            .get(&TemplateKey::Weekday(weekday))
            .or_else(|| self.templates.get(&TemplateKey::Default))
            .ok_or(TimetableError::MissingTemplate { date, weekday })
    }

    pub fn exception_days(&self) -> &BTreeMap<NaiveDate, DayTemplate> {
        &self.exception_days
    }

    /// Replaces the period template used on `date`.
    pub fn set_exception_day(&mut self, date: NaiveDate, template: DayTemplate) {
        self.exception_days.insert(date, template);
    }

    pub fn remove_exception_day(&mut self, date: NaiveDate) -> Option<DayTemplate> {
        self.exception_days.remove(&date)
    }

    pub fn exception_day_ids(&self) -> &BTreeMap<NaiveDate, String> {
        &self.exception_day_ids
    }

    /// Forces the day id of `date`. The cyclic sequence is not consumed on
    /// that date.
    pub fn set_exception_day_id(&mut self, date: NaiveDate, day_id: impl Into<String>) {
        self.exception_day_ids.insert(date, day_id.into());
    }

    pub fn remove_exception_day_id(&mut self, date: NaiveDate) -> Option<String> {
        self.exception_day_ids.remove(&date)
    }
}

/// A day-assignment strategy plus the templates it uses.
///
/// Implementations provide [`schoolday_strategy`](Self::schoolday_strategy)
/// and [`usual_template_for_day`](Self::usual_template_for_day); everything
/// else is built on those two. Calendar derivation lives on
/// `dyn TimetableModel` so models can be shared behind an `Arc`.
pub trait TimetableModel: fmt::Debug + Send + Sync {
    /// Registry name of the model.
    fn kind(&self) -> &'static str;

    fn core(&self) -> &ModelCore;

    fn core_mut(&mut self) -> &mut ModelCore;

    /// Day id of an ordinary schoolday, moving the cursor if the strategy is
    /// sequential. `None` means the date gets no timetable day.
    fn schoolday_strategy(&self, date: NaiveDate, cursor: &mut DayCursor) -> Option<String>;

    /// Template used on `date` when there is no exception template for it.
    fn usual_template_for_day(&self, date: NaiveDate, day_id: &str) -> TimetableResult<&DayTemplate>;

    fn day_ids(&self) -> &[String] {
        self.core().day_ids()
    }

    /// Day id of a schoolday. An exception day id takes precedence and leaves
    /// the cursor untouched.
    fn day_id(&self, date: NaiveDate, cursor: &mut DayCursor) -> Option<String> {
        match self.core().exception_day_ids().get(&date) {
            Some(day_id) => Some(day_id.clone()),
            None => self.schoolday_strategy(date, cursor),
        }
    }

    /// Template in effect on `date`, honouring exception templates.
    fn template_for_day(&self, date: NaiveDate, day_id: &str) -> TimetableResult<&DayTemplate> {
        match self.core().exception_days().get(&date) {
            Some(template) => Ok(template),
            None => self.usual_template_for_day(date, day_id),
        }
    }

    /// Day id of `date` within the term, replaying the assignment from the
    /// first day of the term.
    fn day_id_for(&self, schooldays: &dyn SchooldayModel, date: NaiveDate) -> Option<String> {
        if !schooldays.is_schoolday(date) {
            return None;
        }
        let mut cursor = DayCursor::new();
        for day in schooldays.days() {
            if day > date {
                break;
            }
            if !schooldays.is_schoolday(day) {
                continue;
            }
            let day_id = self.day_id(day, &mut cursor);
            if day == date {
                return day_id;
            }
        }
        None
    }

    /// Slots in effect on `date` for the periods the timetable has on that
    /// day.
    fn periods_in_day(
        &self,
        schooldays: &dyn SchooldayModel,
        timetable: &Timetable,
        date: NaiveDate,
    ) -> TimetableResult<Vec<PeriodSlot>> {
        let Some(day_id) = self.day_id_for(schooldays, date) else {
            return Ok(Vec::new());
        };
        let template = self.template_for_day(date, &day_id)?;
        Ok(slots_in_timetable(template, timetable, &day_id))
    }

    /// Like [`periods_in_day`](Self::periods_in_day) but ignoring any
    /// exception template for `date`.
    fn original_periods_in_day(
        &self,
        schooldays: &dyn SchooldayModel,
        timetable: &Timetable,
        date: NaiveDate,
    ) -> TimetableResult<Vec<PeriodSlot>> {
        let Some(day_id) = self.day_id_for(schooldays, date) else {
            return Ok(Vec::new());
        };
        let template = self.usual_template_for_day(date, &day_id)?;
        Ok(slots_in_timetable(template, timetable, &day_id))
    }
}

impl dyn TimetableModel + '_ {
    /// Lazily derives the events of `timetable` over the term, limited to
    /// `first..=last` when given.
    pub fn events<'a>(
        &'a self,
        schooldays: &'a dyn SchooldayModel,
        timetable: &'a Timetable,
        first: Option<NaiveDate>,
        last: Option<NaiveDate>,
    ) -> CalendarEvents<'a> {
        CalendarEvents::new(self, schooldays, timetable, first, last)
    }

    /// Derives the calendar of `timetable` over the term.
    pub fn create_calendar(
        &self,
        schooldays: &dyn SchooldayModel,
        timetable: &Timetable,
        first: Option<NaiveDate>,
        last: Option<NaiveDate>,
    ) -> TimetableResult<Calendar> {
        self.events(schooldays, timetable, first, last).collect()
    }
}

/// Models are equal when they are of the same kind with the same state.
pub fn same_model(a: Option<&dyn TimetableModel>, b: Option<&dyn TimetableModel>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.kind() == b.kind() && a.core() == b.core(),
        _ => false,
    }
}

fn slots_in_timetable(template: &DayTemplate, timetable: &Timetable, day_id: &str) -> Vec<PeriodSlot> {
    let Some(day) = timetable.day(day_id) else {
        return Vec::new();
    };
    template
        .iter()
        .filter(|slot| day.has_period(&slot.period_id))
        .cloned()
        .collect()
}

/// Interprets a wall-clock time on `date` in `tz` and converts it to UTC.
///
/// Ambiguous times resolve to the earlier instant. A time inside a DST gap is
/// moved forward by the length of a typical gap.
pub(crate) fn localize(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let local = date.and_time(time);
    if let Some(instant) = tz.from_local_datetime(&local).earliest() {
        return instant.with_timezone(&Utc);
    }
    warn!(%local, timezone = %tz, "local time falls into a DST gap, shifting forward");
    let shifted = local + TimeDelta::hours(1);
    match tz.from_local_datetime(&shifted).earliest() {
        Some(instant) => instant.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&local),
    }
}

/// Validates a template key set against what a weekday-keyed model accepts.
pub(crate) fn weekday_templates(
    kind: &str,
    templates: HashMap<TemplateKey, DayTemplate>,
) -> TimetableResult<HashMap<TemplateKey, DayTemplate>> {
    if let Some(TemplateKey::DayId(day_id)) =
        templates.keys().find(|key| matches!(key, TemplateKey::DayId(_)))
    {
        return Err(TimetableError::InvalidModel(format!(
            "{kind} templates are keyed by weekday, got day id {day_id:?}"
        )));
    }
    Ok(templates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_cycles_through_day_ids() {
        let ids: Vec<String> = ["A", "B"].iter().map(|s| s.to_string()).collect();
        let mut cursor = DayCursor::new();
        let seen: Vec<String> = (0..5).filter_map(|_| cursor.advance(&ids)).collect();
        assert_eq!(seen, vec!["A", "B", "A", "B", "A"]);
        assert_eq!(cursor.position(), 5);
        assert_eq!(DayCursor::new().advance(&[]), None);
    }

    #[test]
    fn localize_converts_to_utc() {
        let date = NaiveDate::from_ymd_opt(2003, 11, 20).unwrap();
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let vilnius: Tz = "Europe/Vilnius".parse().unwrap();
        assert_eq!(localize(date, nine, Tz::UTC).to_rfc3339(), "2003-11-20T09:00:00+00:00");
        assert_eq!(localize(date, nine, vilnius).to_rfc3339(), "2003-11-20T07:00:00+00:00");
    }

    #[test]
    fn localize_shifts_out_of_dst_gap() {
        let date = NaiveDate::from_ymd_opt(2021, 3, 28).unwrap();
        let gap = NaiveTime::from_hms_opt(3, 30, 0).unwrap();
        let vilnius: Tz = "Europe/Vilnius".parse().unwrap();
        // 04:30 EEST
        assert_eq!(localize(date, gap, vilnius).to_rfc3339(), "2021-03-28T01:30:00+00:00");
    }
}
