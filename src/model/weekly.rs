use super::{DayCursor, ModelCore, TemplateKey, TimetableModel, weekday_templates};
use crate::error::{TimetableError, TimetableResult};
use crate::template::DayTemplate;
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::HashMap;

pub const DEFAULT_WEEKLY_DAY_IDS: [&str; 5] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

/// Day id is a function of the weekday: the n-th day id goes to the n-th
/// day of the week, starting on Monday. Days past the end of the list get no
/// day id, so by default weekends have no timetable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyModel {
    core: ModelCore,
}

impl WeeklyModel {
    pub const KIND: &'static str = "WeeklyTimetableModel";

    /// A Monday to Friday model.
    pub fn new<T>(templates: T) -> Self
    where
        T: IntoIterator<Item = (Option<Weekday>, DayTemplate)>,
    {
        let templates = templates
            .into_iter()
            .map(|(weekday, template)| {
                (weekday.map_or(TemplateKey::Default, TemplateKey::Weekday), template)
            })
            .collect();
        Self {
            core: ModelCore::new(DEFAULT_WEEKLY_DAY_IDS, templates),
        }
    }

    pub fn with_day_ids<I, S, T>(day_ids: I, templates: T) -> TimetableResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        T: IntoIterator<Item = (Option<Weekday>, DayTemplate)>,
    {
        let templates = templates
            .into_iter()
            .map(|(weekday, template)| {
                (weekday.map_or(TemplateKey::Default, TemplateKey::Weekday), template)
            })
            .collect();
        Self::from_keyed(day_ids, templates)
    }

    pub(crate) fn from_keyed<I, S>(day_ids: I, templates: HashMap<TemplateKey, DayTemplate>) -> TimetableResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let templates = weekday_templates(Self::KIND, templates)?;
        let core = ModelCore::new(day_ids, templates);
        if core.day_ids().len() > 7 {
            return Err(TimetableError::InvalidModel(format!(
                "a week has 7 days, got {} day ids",
                core.day_ids().len()
            )));
        }
        Ok(Self { core })
    }
}

impl TimetableModel for WeeklyModel {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModelCore {
        &mut self.core
    }

    fn schoolday_strategy(&self, date: NaiveDate, _cursor: &mut DayCursor) -> Option<String> {
        let index = date.weekday().num_days_from_monday() as usize;
        self.core.day_ids().get(index).cloned()
    }

    fn usual_template_for_day(&self, date: NaiveDate, _day_id: &str) -> TimetableResult<&DayTemplate> {
        self.core.weekday_template(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekends_have_no_day_id() {
        let model = WeeklyModel::new([(None, DayTemplate::new())]);
        let mut cursor = DayCursor::new();
        let monday = NaiveDate::from_ymd_opt(2003, 11, 24).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2003, 11, 22).unwrap();
        assert_eq!(model.schoolday_strategy(monday, &mut cursor).as_deref(), Some("Monday"));
        assert_eq!(model.schoolday_strategy(saturday, &mut cursor), None);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn rejects_more_than_seven_day_ids() {
        let ids = ["1", "2", "3", "4", "5", "6", "7", "8"];
        let err = WeeklyModel::with_day_ids(ids, [(None, DayTemplate::new())]).unwrap_err();
        assert!(matches!(err, TimetableError::InvalidModel(_)));
    }
}
