use super::{DayCursor, TimetableModel, localize};
use crate::calendar::{DateRange, SchooldayModel};
use crate::error::TimetableResult;
use crate::event::{CalendarEvent, derive_uid};
use crate::exception::{ExceptionKey, TimetableException};
use crate::timetable::Timetable;
use chrono::NaiveDate;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

/// Lazy sequence of the events a model derives from a timetable.
///
/// Dates are walked from the first day of the term so that the day id
/// sequence is the same whatever `first` is; events are only produced for
/// dates inside `first..=last`. Each item is either an event or the error
/// that stopped the derivation.
pub struct CalendarEvents<'a> {
    model: &'a dyn TimetableModel,
    schooldays: &'a dyn SchooldayModel,
    timetable: &'a Timetable,
    dates: DateRange,
    cursor: DayCursor,
    first: Option<NaiveDate>,
    last: Option<NaiveDate>,
    exceptions: HashMap<ExceptionKey, &'a TimetableException>,
    uid_suffix: String,
    pending: VecDeque<CalendarEvent>,
    emitted: usize,
    finished: bool,
}

impl<'a> CalendarEvents<'a> {
    pub(crate) fn new(
        model: &'a dyn TimetableModel,
        schooldays: &'a dyn SchooldayModel,
        timetable: &'a Timetable,
        first: Option<NaiveDate>,
        last: Option<NaiveDate>,
    ) -> Self {
        let exceptions = timetable
            .exceptions()
            .iter()
            .map(|exception| (exception.key(), exception))
            .collect();
        let uid_suffix = timetable.uid_suffix();
        debug!(timetable = %uid_suffix, ?first, ?last, "deriving timetable calendar");
        Self {
            model,
            schooldays,
            timetable,
            dates: schooldays.days(),
            cursor: DayCursor::new(),
            first,
            last,
            exceptions,
            uid_suffix,
            pending: VecDeque::new(),
            emitted: 0,
            finished: false,
        }
    }

    fn events_on(&self, date: NaiveDate, day_id: &str) -> TimetableResult<Vec<CalendarEvent>> {
        let Some(day) = self.timetable.day(day_id) else {
            warn!(%date, day_id, "timetable has no day for the assigned day id");
            return Ok(Vec::new());
        };
        let template = self.model.template_for_day(date, day_id)?;
        let timezone = self.timetable.timezone();
        let mut events = Vec::new();
        for slot in template {
            if !day.has_period(&slot.period_id) {
                continue;
            }
            let dtstart = localize(date, slot.tstart, timezone);
            for activity in day.activities(&slot.period_id)? {
                let key = ExceptionKey {
                    date,
                    period_id: slot.period_id.clone(),
                    activity: activity.clone(),
                };
                if let Some(exception) = self.exceptions.get(&key) {
                    events.extend(exception.replacement().cloned());
                    continue;
                }
                let resources: Vec<&str> = activity.resources().iter().map(String::as_str).collect();
                let hash = derive_uid(activity.title(), activity.owner(), &resources, dtstart, slot.duration);
                let unique_id = format!("{hash}-{}", self.uid_suffix);
                events.push(CalendarEvent::timetable(
                    dtstart,
                    slot.duration,
                    unique_id,
                    day_id,
                    &slot.period_id,
                    activity,
                ));
            }
        }
        Ok(events)
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            debug!(timetable = %self.uid_suffix, events = self.emitted, "timetable calendar derived");
        }
    }
}

impl Iterator for CalendarEvents<'_> {
    type Item = TimetableResult<CalendarEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                self.emitted += 1;
                return Some(Ok(event));
            }
            if self.finished {
                return None;
            }
            let Some(date) = self.dates.next() else {
                self.finish();
                return None;
            };
            if self.last.is_some_and(|last| date > last) {
                self.finish();
                return None;
            }
            if !self.schooldays.is_schoolday(date) {
                continue;
            }
            let day_id = self.model.day_id(date, &mut self.cursor);
            if self.first.is_some_and(|first| date < first) {
                continue;
            }
            let Some(day_id) = day_id else {
                warn!(%date, model = self.model.kind(), "schoolday without a timetable day id");
                continue;
            };
            match self.events_on(date, &day_id) {
                Ok(events) => self.pending.extend(events),
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
