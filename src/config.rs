use crate::calendar::{SchooldayCalendar, SchooldayCalendarConfig};
use crate::composite::TimetabledEntity;
use crate::error::TimetableError;
use crate::model::{ModelRegistry, ModelSpec};
use crate::services::{TimePeriodService, TimetableSchemaService};
use crate::timetable::{Timetable, TimetableDay, parse_timezone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Timetable(#[from] TimetableError),
}

fn default_uid_domain() -> String {
    "localhost".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// A term entry: an id plus the schoolday calendar description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermConfig {
    pub id: String,
    #[serde(flatten)]
    pub calendar: SchooldayCalendarConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayConfig {
    pub id: String,
    #[serde(default)]
    pub periods: Vec<String>,
}

/// A timetable schema entry: its days and periods and the model it uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub id: String,
    #[serde(default)]
    pub timezone: Option<String>,
    pub days: Vec<DayConfig>,
    pub model: ModelSpec,
}

/// Engine configuration, usually loaded from a TOML file.
///
/// ```toml
/// uid_domain = "school.example.org"
/// default_timezone = "Europe/Vilnius"
///
/// [[terms]]
/// id = "2003-fall"
/// first = "2003-09-01"
/// last = "2003-12-19"
/// weekdays = ["Mon", "Tue", "Wed", "Thu", "Fri"]
/// holidays = ["2003-11-01"]
///
/// [[schemas]]
/// id = "default"
/// days = [{ id = "A", periods = ["1", "2"] }, { id = "B", periods = ["1", "2"] }]
///
/// [schemas.model]
/// kind = "SequentialDaysTimetableModel"
/// day_ids = ["A", "B"]
/// templates.default = [
///     { period = "1", start = "09:00", duration_minutes = 45 },
///     { period = "2", start = "10:00", duration_minutes = 45 },
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Host part of derived event UIDs.
    #[serde(default = "default_uid_domain")]
    pub uid_domain: String,
    /// Timezone of schemas that do not name one.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    #[serde(default)]
    pub terms: Vec<TermConfig>,
    #[serde(default)]
    pub schemas: Vec<SchemaConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            uid_domain: default_uid_domain(),
            default_timezone: default_timezone(),
            terms: Vec::new(),
            schemas: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// An entity whose timetables derive UIDs in the configured domain.
    pub fn entity(&self, path: impl Into<String>) -> TimetabledEntity {
        TimetabledEntity::with_domain(path, self.uid_domain.clone())
    }

    /// Builds the term and schema registries. Models are created through
    /// `registry` by kind name.
    pub fn build_services(
        &self,
        registry: &ModelRegistry,
    ) -> Result<(TimePeriodService, TimetableSchemaService), ConfigError> {
        let default_tz = parse_timezone(&self.default_timezone)?;

        let mut terms = TimePeriodService::new();
        for term in &self.terms {
            if term.calendar.first > term.calendar.last {
                return Err(ConfigError::Invalid(format!(
                    "term {:?} ends before it starts",
                    term.id
                )));
            }
            let mut calendar = term.calendar.clone();
            if calendar.title.is_empty() {
                calendar.title = term.id.clone();
            }
            if terms
                .insert(term.id.clone(), SchooldayCalendar::from_config(&calendar))
                .is_some()
            {
                return Err(ConfigError::Invalid(format!("duplicate term id {:?}", term.id)));
            }
        }

        let mut schemas = TimetableSchemaService::new();
        let mut seen = BTreeSet::new();
        for schema in &self.schemas {
            if !seen.insert(schema.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate schema id {:?}", schema.id)));
            }
            let mut timetable = Timetable::new(schema.days.iter().map(|day| day.id.clone()));
            for day in &schema.days {
                timetable.set_day(&day.id, TimetableDay::new(day.periods.iter().cloned()))?;
            }
            timetable.set_model(registry.build(&schema.model)?);
            let timezone = match &schema.timezone {
                Some(name) => parse_timezone(name)?,
                None => default_tz,
            };
            timetable.set_timezone(timezone);
            schemas.insert(schema.id.clone(), &timetable);
        }

        debug!(terms = terms.len(), schemas = schemas.len(), "timetable services built");
        Ok((terms, schemas))
    }
}
