pub mod activity;
pub mod calendar;
pub mod composite;
pub mod config;
pub mod error;
pub mod event;
pub mod exception;
pub mod graph;
pub mod model;
pub mod persistence;
pub mod services;
pub mod template;
pub mod timetable;
pub mod xml;

pub use activity::Activity;
pub use calendar::{SchooldayCalendar, SchooldayCalendarConfig, SchooldayModel};
pub use composite::{
    CompositeTimetableEngine, CompositeTimetableSource, EntityDirectory, EntityLookup, TimetableDict,
    TimetableSource, TimetabledEntity,
};
pub use config::{ConfigError, EngineConfig};
pub use error::{TimetableError, TimetableResult};
pub use event::{Calendar, CalendarEvent, EventKind};
pub use exception::{ExceptionKey, TimetableException};
pub use graph::{RelationshipGraph, Relationships, Role};
pub use model::{
    ModelRegistry, ModelSpec, SequentialDayIdBasedModel, SequentialDaysModel, TimetableModel, WeeklyModel,
};
pub use services::{TimePeriodService, TimetableSchemaService};
pub use template::{DayTemplate, PeriodSlot};
pub use timetable::{Timetable, TimetableDay, TimetableId, TimetableKey, TimetableLocation};
pub use xml::{XmlError, read_timetable, write_timetable};
