use crate::activity::Activity;
use crate::exception::ExceptionKey;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use sha2::{Digest, Sha256};

/// What produced a calendar event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// An ordinary event, not derived from a timetable.
    Plain,
    /// A regular occurrence of a timetable activity.
    Timetable {
        day_id: String,
        period_id: String,
        activity: Activity,
    },
    /// A replacement standing in for one overridden timetable occurrence.
    Exceptional { exception: ExceptionKey },
}

/// A concrete event anchored in UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    dtstart: DateTime<Utc>,
    duration: TimeDelta,
    title: String,
    unique_id: String,
    location: Option<String>,
    kind: EventKind,
}

impl CalendarEvent {
    /// A plain event. Its UID is derived from title, start and duration.
    pub fn new(dtstart: DateTime<Utc>, duration: TimeDelta, title: impl Into<String>) -> Self {
        let title = title.into();
        let unique_id = format!("{}@localhost", derive_uid(&title, None, &[], dtstart, duration));
        Self {
            dtstart,
            duration,
            title,
            unique_id,
            location: None,
            kind: EventKind::Plain,
        }
    }

    pub(crate) fn timetable(
        dtstart: DateTime<Utc>,
        duration: TimeDelta,
        unique_id: String,
        day_id: &str,
        period_id: &str,
        activity: &Activity,
    ) -> Self {
        Self {
            dtstart,
            duration,
            title: activity.title().to_string(),
            unique_id,
            location: None,
            kind: EventKind::Timetable {
                day_id: day_id.to_string(),
                period_id: period_id.to_string(),
                activity: activity.clone(),
            },
        }
    }

    /// A replacement event for the timetable occurrence identified by `exception`.
    pub fn exceptional(
        dtstart: DateTime<Utc>,
        duration: TimeDelta,
        title: impl Into<String>,
        exception: ExceptionKey,
    ) -> Self {
        let title = title.into();
        let unique_id = format!(
            "exception-{}-{}@localhost",
            exception.date,
            derive_uid(&title, None, &[], dtstart, duration)
        );
        Self {
            dtstart,
            duration,
            title,
            unique_id,
            location: None,
            kind: EventKind::Exceptional { exception },
        }
    }

    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = unique_id.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn dtstart(&self) -> DateTime<Utc> {
        self.dtstart
    }

    pub fn dtend(&self) -> DateTime<Utc> {
        self.dtstart + self.duration
    }

    pub fn duration(&self) -> TimeDelta {
        self.duration
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn is_exceptional(&self) -> bool {
        matches!(self.kind, EventKind::Exceptional { .. })
    }

    pub fn day_id(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Timetable { day_id, .. } => Some(day_id),
            _ => None,
        }
    }

    pub fn period_id(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Timetable { period_id, .. } => Some(period_id),
            EventKind::Exceptional { exception } => Some(&exception.period_id),
            EventKind::Plain => None,
        }
    }

    pub fn activity(&self) -> Option<&Activity> {
        match &self.kind {
            EventKind::Timetable { activity, .. } => Some(activity),
            EventKind::Exceptional { exception } => Some(&exception.activity),
            EventKind::Plain => None,
        }
    }

    pub fn owner(&self) -> Option<&str> {
        self.activity().and_then(Activity::owner)
    }

    pub fn resources(&self) -> Vec<&str> {
        self.activity()
            .map(|a| a.resources().iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if self.duration.is_zero() {
            start <= self.dtstart && self.dtstart < end
        } else {
            self.dtstart < end && start < self.dtend()
        }
    }
}

/// Stable hex digest of an activity occurrence.
///
/// Only values are hashed, never addresses or random state, so the same input
/// always yields the same identifier.
pub(crate) fn derive_uid(
    title: &str,
    owner: Option<&str>,
    resources: &[&str],
    dtstart: DateTime<Utc>,
    duration: TimeDelta,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update([0u8]);
    hasher.update(owner.unwrap_or("").as_bytes());
    hasher.update([0u8]);
    for resource in resources {
        hasher.update(resource.as_bytes());
        hasher.update([0x1fu8]);
    }
    hasher.update([0u8]);
    hasher.update(dtstart.to_rfc3339().as_bytes());
    hasher.update([0u8]);
    hasher.update(duration.num_seconds().to_be_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

/// An ordered collection of events.
///
/// Derived calendars keep generation order (date, then period start); merged
/// calendars are ordered by start time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Calendar {
    events: Vec<CalendarEvent>,
}

impl Calendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event(&mut self, event: CalendarEvent) {
        self.events.push(event);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CalendarEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn find(&self, unique_id: &str) -> Option<&CalendarEvent> {
        self.events.iter().find(|e| e.unique_id == unique_id)
    }

    /// Events overlapping the half-open instant range `start..end`.
    pub fn expand(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<&CalendarEvent> {
        self.events
            .iter()
            .filter(|e| e.overlaps(start, end))
            .collect()
    }

    /// Events starting on the given UTC date.
    pub fn events_on(&self, date: NaiveDate) -> Vec<&CalendarEvent> {
        self.events
            .iter()
            .filter(|e| e.dtstart.date_naive() == date)
            .collect()
    }

    /// Pairs of events whose time spans intersect, each pair ordered by start.
    pub fn overlapping(&self) -> Vec<(&CalendarEvent, &CalendarEvent)> {
        let mut sorted: Vec<&CalendarEvent> = self.events.iter().collect();
        sorted.sort_by_key(|e| e.dtstart);
        let mut pairs = Vec::new();
        for (idx, event) in sorted.iter().enumerate() {
            for later in &sorted[idx + 1..] {
                if later.dtstart >= event.dtend() {
                    break;
                }
                pairs.push((*event, *later));
            }
        }
        pairs
    }

    /// Merges another calendar in. Events whose UID is already present are
    /// skipped.
    pub fn update(&mut self, other: Calendar) {
        for event in other.events {
            if self.find(&event.unique_id).is_none() {
                self.events.push(event);
            }
        }
        self.events.sort_by(|a, b| a.dtstart.cmp(&b.dtstart));
    }
}

impl FromIterator<CalendarEvent> for Calendar {
    fn from_iter<I: IntoIterator<Item = CalendarEvent>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Calendar {
    type Item = CalendarEvent;
    type IntoIter = std::vec::IntoIter<CalendarEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a Calendar {
    type Item = &'a CalendarEvent;
    type IntoIter = std::slice::Iter<'a, CalendarEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2003, 11, 20, h, 0, 0).unwrap()
    }

    #[test]
    fn uid_is_stable_and_sensitive_to_every_component() {
        let base = derive_uid("Math", Some("g1"), &["room1"], at(9), TimeDelta::minutes(45));
        assert_eq!(base, derive_uid("Math", Some("g1"), &["room1"], at(9), TimeDelta::minutes(45)));
        assert_ne!(base, derive_uid("Math", Some("g1"), &["room1"], at(10), TimeDelta::minutes(45)));
        assert_ne!(base, derive_uid("Math", Some("g1"), &["room1"], at(9), TimeDelta::minutes(50)));
        assert_ne!(base, derive_uid("Math", None, &["room1"], at(9), TimeDelta::minutes(45)));
        assert_ne!(base, derive_uid("Math", Some("g1"), &[], at(9), TimeDelta::minutes(45)));
    }

    #[test]
    fn expand_selects_overlapping_events() {
        let calendar: Calendar = [
            CalendarEvent::new(at(9), TimeDelta::minutes(90), "Green"),
            CalendarEvent::new(at(11), TimeDelta::minutes(90), "Blue"),
        ]
        .into_iter()
        .collect();

        let hits = calendar.expand(at(10), at(11));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title(), "Green");
        assert_eq!(calendar.expand(at(0), at(23)).len(), 2);
    }

    #[test]
    fn overlapping_reports_intersecting_pairs() {
        let calendar: Calendar = [
            CalendarEvent::new(at(11), TimeDelta::minutes(90), "Chess"),
            CalendarEvent::new(at(9), TimeDelta::minutes(90), "Green"),
            CalendarEvent::new(at(10), TimeDelta::minutes(30), "Choir"),
            CalendarEvent::new(at(12), TimeDelta::minutes(30), "Lunch"),
        ]
        .into_iter()
        .collect();
        let pairs: Vec<(&str, &str)> = calendar
            .overlapping()
            .into_iter()
            .map(|(a, b)| (a.title(), b.title()))
            .collect();
        assert_eq!(pairs, vec![("Green", "Choir"), ("Chess", "Lunch")]);
    }

    #[test]
    fn update_skips_known_uids_and_orders_by_start() {
        let late = CalendarEvent::new(at(11), TimeDelta::minutes(30), "Late");
        let early = CalendarEvent::new(at(8), TimeDelta::minutes(30), "Early");
        let mut calendar: Calendar = [late.clone()].into_iter().collect();
        calendar.update([early.clone(), late].into_iter().collect());
        let titles: Vec<&str> = calendar.iter().map(CalendarEvent::title).collect();
        assert_eq!(titles, vec!["Early", "Late"]);
    }
}
