use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// A named period slot: when a period starts and how long it lasts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodSlot {
    pub period_id: String,
    pub tstart: NaiveTime,
    #[serde(with = "duration_minutes")]
    pub duration: TimeDelta,
}

impl PeriodSlot {
    pub fn new(period_id: impl Into<String>, tstart: NaiveTime, duration: TimeDelta) -> Self {
        Self {
            period_id: period_id.into(),
            tstart,
            duration,
        }
    }
}

/// The shape of one kind of school day: a set of period slots kept in start
/// time order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<PeriodSlot>", into = "Vec<PeriodSlot>")]
pub struct DayTemplate {
    slots: Vec<PeriodSlot>,
}

impl DayTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a template from `(period_id, start, duration)` triples.
    pub fn from_slots<I>(slots: I) -> Self
    where
        I: IntoIterator<Item = PeriodSlot>,
    {
        let mut template = Self::new();
        for slot in slots {
            template.add(slot);
        }
        template
    }

    /// Adds a slot. Adding an identical slot twice has no effect.
    pub fn add(&mut self, slot: PeriodSlot) {
        if let Err(idx) = self.slots.binary_search_by(|s| Self::order(s).cmp(&Self::order(&slot))) {
            self.slots.insert(idx, slot);
        }
    }

    pub fn remove(&mut self, slot: &PeriodSlot) -> bool {
        match self.slots.iter().position(|s| s == slot) {
            Some(idx) => {
                self.slots.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeriodSlot> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn order(slot: &PeriodSlot) -> (NaiveTime, &str, TimeDelta) {
        (slot.tstart, slot.period_id.as_str(), slot.duration)
    }
}

impl From<Vec<PeriodSlot>> for DayTemplate {
    fn from(slots: Vec<PeriodSlot>) -> Self {
        Self::from_slots(slots)
    }
}

impl From<DayTemplate> for Vec<PeriodSlot> {
    fn from(template: DayTemplate) -> Self {
        template.slots
    }
}

impl<'a> IntoIterator for &'a DayTemplate {
    type Item = &'a PeriodSlot;
    type IntoIter = std::slice::Iter<'a, PeriodSlot>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

pub(crate) mod duration_minutes {
    use chrono::TimeDelta;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_minutes())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimeDelta, D::Error> {
        let minutes = i64::deserialize(deserializer)?;
        TimeDelta::try_minutes(minutes)
            .ok_or_else(|| D::Error::custom(format!("duration of {minutes} minutes is out of range")))
    }
}
