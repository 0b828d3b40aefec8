use super::weekly::DEFAULT_WEEKLY_DAY_IDS;
use super::{SequentialDayIdBasedModel, SequentialDaysModel, TemplateKey, TimetableModel, WeeklyModel};
use crate::error::{TimetableError, TimetableResult};
use crate::template::{DayTemplate, PeriodSlot};
use chrono::{NaiveDate, NaiveTime, TimeDelta, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// One period slot as written in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpec {
    pub period: String,
    /// `HH:MM`
    pub start: String,
    pub duration_minutes: i64,
}

impl SlotSpec {
    fn to_slot(&self) -> TimetableResult<PeriodSlot> {
        let tstart = NaiveTime::parse_from_str(&self.start, "%H:%M").map_err(|err| {
            TimetableError::InvalidModel(format!("period {:?} start {:?}: {err}", self.period, self.start))
        })?;
        if self.duration_minutes <= 0 {
            return Err(TimetableError::InvalidModel(format!(
                "period {:?} has a non-positive duration",
                self.period
            )));
        }
        let duration = TimeDelta::try_minutes(self.duration_minutes).ok_or_else(|| {
            TimetableError::InvalidModel(format!(
                "period {:?} duration of {} minutes is out of range",
                self.period, self.duration_minutes
            ))
        })?;
        Ok(PeriodSlot::new(self.period.clone(), tstart, duration))
    }
}

/// Serializable description of a timetable model.
///
/// Template keys are `default`, a weekday name (`Monday`, `fri`, ...) or
/// `day:<day id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub kind: String,
    #[serde(default)]
    pub day_ids: Vec<String>,
    #[serde(default)]
    pub templates: BTreeMap<String, Vec<SlotSpec>>,
    #[serde(default)]
    pub exception_day_ids: BTreeMap<NaiveDate, String>,
    #[serde(default)]
    pub exception_days: BTreeMap<NaiveDate, Vec<SlotSpec>>,
}

impl ModelSpec {
    pub fn template_keys(&self) -> TimetableResult<HashMap<TemplateKey, DayTemplate>> {
        self.templates
            .iter()
            .map(|(key, slots)| Ok((parse_template_key(key)?, build_template(slots)?)))
            .collect()
    }
}

fn parse_template_key(key: &str) -> TimetableResult<TemplateKey> {
    if key.eq_ignore_ascii_case("default") {
        return Ok(TemplateKey::Default);
    }
    if let Some(day_id) = key.strip_prefix("day:") {
        return Ok(TemplateKey::DayId(day_id.to_string()));
    }
    key.parse::<Weekday>()
        .map(TemplateKey::Weekday)
        .map_err(|_| TimetableError::InvalidModel(format!("unknown template key {key:?}")))
}

fn build_template(slots: &[SlotSpec]) -> TimetableResult<DayTemplate> {
    let slots = slots.iter().map(SlotSpec::to_slot).collect::<TimetableResult<Vec<_>>>()?;
    Ok(DayTemplate::from_slots(slots))
}

fn build_sequential_days(spec: &ModelSpec) -> TimetableResult<Box<dyn TimetableModel>> {
    let model = SequentialDaysModel::from_keyed(&spec.day_ids, spec.template_keys()?)?;
    Ok(Box::new(model))
}

fn build_sequential_day_id_based(spec: &ModelSpec) -> TimetableResult<Box<dyn TimetableModel>> {
    let model = SequentialDayIdBasedModel::from_keyed(&spec.day_ids, spec.template_keys()?)?;
    Ok(Box::new(model))
}

fn build_weekly(spec: &ModelSpec) -> TimetableResult<Box<dyn TimetableModel>> {
    let templates = spec.template_keys()?;
    let model = if spec.day_ids.is_empty() {
        WeeklyModel::from_keyed(DEFAULT_WEEKLY_DAY_IDS, templates)?
    } else {
        WeeklyModel::from_keyed(&spec.day_ids, templates)?
    };
    Ok(Box::new(model))
}

pub type ModelFactory = fn(&ModelSpec) -> TimetableResult<Box<dyn TimetableModel>>;

/// Maps model kind names to factories.
///
/// Populated once at startup and passed to whatever needs to build models by
/// name, such as the configuration loader.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    factories: BTreeMap<String, ModelFactory>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry knowing the three shipped models.
    pub fn with_builtin_models() -> Self {
        let mut registry = Self::new();
        registry.register(SequentialDaysModel::KIND, build_sequential_days);
        registry.register(SequentialDayIdBasedModel::KIND, build_sequential_day_id_based);
        registry.register(WeeklyModel::KIND, build_weekly);
        registry
    }

    pub fn register(&mut self, kind: impl Into<String>, factory: ModelFactory) {
        self.factories.insert(kind.into(), factory);
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Builds the model `spec` describes, exception overrides included.
    pub fn build(&self, spec: &ModelSpec) -> TimetableResult<Arc<dyn TimetableModel>> {
        let factory = self
            .factories
            .get(&spec.kind)
            .ok_or_else(|| TimetableError::UnknownModelKind(spec.kind.clone()))?;
        let mut model = factory(spec)?;
        let core = model.core_mut();
        for (date, day_id) in &spec.exception_day_ids {
            core.set_exception_day_id(*date, day_id.clone());
        }
        for (date, slots) in &spec.exception_days {
            core.set_exception_day(*date, build_template(slots)?);
        }
        Ok(Arc::from(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(period: &str, start: &str) -> SlotSpec {
        SlotSpec {
            period: period.to_string(),
            start: start.to_string(),
            duration_minutes: 45,
        }
    }

    #[test]
    fn builds_builtin_models_by_name() {
        let registry = ModelRegistry::with_builtin_models();
        let spec = ModelSpec {
            kind: "WeeklyTimetableModel".to_string(),
            day_ids: Vec::new(),
            templates: BTreeMap::from([("default".to_string(), vec![slot("1", "09:00")])]),
            exception_day_ids: BTreeMap::new(),
            exception_days: BTreeMap::new(),
        };
        let model = registry.build(&spec).unwrap();
        assert_eq!(model.kind(), "WeeklyTimetableModel");
        assert_eq!(model.day_ids().len(), 5);
    }

    #[test]
    fn unknown_kind_and_bad_keys_are_rejected() {
        let registry = ModelRegistry::with_builtin_models();
        let mut spec = ModelSpec {
            kind: "LunarTimetableModel".to_string(),
            day_ids: vec!["A".to_string()],
            templates: BTreeMap::new(),
            exception_day_ids: BTreeMap::new(),
            exception_days: BTreeMap::new(),
        };
        assert_eq!(
            registry.build(&spec).unwrap_err(),
            TimetableError::UnknownModelKind("LunarTimetableModel".to_string())
        );

        spec.kind = SequentialDaysModel::KIND.to_string();
        spec.templates.insert("someday".to_string(), vec![slot("1", "09:00")]);
        assert!(matches!(registry.build(&spec).unwrap_err(), TimetableError::InvalidModel(_)));

        spec.templates = BTreeMap::from([("day:A".to_string(), vec![slot("1", "9am")])]);
        spec.kind = SequentialDayIdBasedModel::KIND.to_string();
        assert!(matches!(registry.build(&spec).unwrap_err(), TimetableError::InvalidModel(_)));
    }
}
