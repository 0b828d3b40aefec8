use super::{DayCursor, ModelCore, TemplateKey, TimetableModel, weekday_templates};
use crate::error::{TimetableError, TimetableResult};
use crate::template::DayTemplate;
use chrono::{NaiveDate, Weekday};
use std::collections::HashMap;

/// Cycles through the day ids, one per schoolday. Non-schooldays do not
/// advance the cycle.
///
/// Templates are chosen by weekday with a default fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialDaysModel {
    core: ModelCore,
}

impl SequentialDaysModel {
    pub const KIND: &'static str = "SequentialDaysTimetableModel";

    /// `templates` maps a weekday, or `None` for the default, to a template.
    pub fn new<I, S, T>(day_ids: I, templates: T) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        T: IntoIterator<Item = (Option<Weekday>, DayTemplate)>,
    {
        let templates = templates
            .into_iter()
            .map(|(weekday, template)| {
                let key = weekday.map_or(TemplateKey::Default, TemplateKey::Weekday);
                (key, template)
            })
            .collect();
        Self {
            core: ModelCore::new(day_ids, templates),
        }
    }

    pub(crate) fn from_keyed<I, S>(day_ids: I, templates: HashMap<TemplateKey, DayTemplate>) -> TimetableResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let templates = weekday_templates(Self::KIND, templates)?;
        Ok(Self {
            core: ModelCore::new(day_ids, templates),
        })
    }
}

impl TimetableModel for SequentialDaysModel {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModelCore {
        &mut self.core
    }

    fn schoolday_strategy(&self, _date: NaiveDate, cursor: &mut DayCursor) -> Option<String> {
        cursor.advance(self.core.day_ids())
    }

    fn usual_template_for_day(&self, date: NaiveDate, _day_id: &str) -> TimetableResult<&DayTemplate> {
        self.core.weekday_template(date)
    }
}

/// Cycles through the day ids like [`SequentialDaysModel`] but looks
/// templates up by the assigned day id. Every day id needs a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialDayIdBasedModel {
    core: ModelCore,
}

impl SequentialDayIdBasedModel {
    pub const KIND: &'static str = "SequentialDayIdBasedTimetableModel";

    pub fn new<I, S, T, K>(day_ids: I, templates: T) -> TimetableResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        T: IntoIterator<Item = (K, DayTemplate)>,
        K: Into<String>,
    {
        let templates = templates
            .into_iter()
            .map(|(day_id, template)| (TemplateKey::DayId(day_id.into()), template))
            .collect();
        Self::from_keyed(day_ids, templates)
    }

    pub(crate) fn from_keyed<I, S>(day_ids: I, templates: HashMap<TemplateKey, DayTemplate>) -> TimetableResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let core = ModelCore::new(day_ids, templates);
        if let Some(key) = core
            .templates()
            .keys()
            .find(|key| !matches!(key, TemplateKey::DayId(_)))
        {
            return Err(TimetableError::InvalidModel(format!(
                "{} templates are keyed by day id, got {key:?}",
                Self::KIND
            )));
        }
        let missing: Vec<&str> = core
            .day_ids()
            .iter()
            .filter(|day_id| core.template(&TemplateKey::DayId((*day_id).clone())).is_none())
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(TimetableError::InvalidModel(format!(
                "no day template for day ids {missing:?}"
            )));
        }
        Ok(Self { core })
    }
}

impl TimetableModel for SequentialDayIdBasedModel {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModelCore {
        &mut self.core
    }

    fn schoolday_strategy(&self, _date: NaiveDate, cursor: &mut DayCursor) -> Option<String> {
        cursor.advance(self.core.day_ids())
    }

    fn usual_template_for_day(&self, _date: NaiveDate, day_id: &str) -> TimetableResult<&DayTemplate> {
        self.core
            .template(&TemplateKey::DayId(day_id.to_string()))
            .ok_or_else(|| TimetableError::MissingDayTemplate {
                day_id: day_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::PeriodSlot;
    use chrono::{NaiveTime, TimeDelta};

    fn template(start: u32) -> DayTemplate {
        DayTemplate::from_slots([PeriodSlot::new(
            "1",
            NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            TimeDelta::hours(1),
        )])
    }

    #[test]
    fn day_id_based_model_requires_every_template() {
        let err = SequentialDayIdBasedModel::new(["A", "B"], [("A", template(9))]).unwrap_err();
        assert!(matches!(err, TimetableError::InvalidModel(_)));
        assert!(SequentialDayIdBasedModel::new(["A", "B"], [("A", template(9)), ("B", template(10))]).is_ok());
    }

    #[test]
    fn weekday_template_falls_back_to_default() {
        let model = SequentialDaysModel::new(
            ["A"],
            [(None, template(9)), (Some(Weekday::Fri), template(10))],
        );
        let thursday = NaiveDate::from_ymd_opt(2003, 11, 20).unwrap();
        let friday = NaiveDate::from_ymd_opt(2003, 11, 21).unwrap();
        assert_eq!(model.usual_template_for_day(thursday, "A").unwrap(), &template(9));
        assert_eq!(model.usual_template_for_day(friday, "A").unwrap(), &template(10));

        let strict = SequentialDaysModel::new(["A"], [(Some(Weekday::Fri), template(10))]);
        let err = strict.usual_template_for_day(thursday, "A").unwrap_err();
        assert_eq!(
            err,
            TimetableError::MissingTemplate {
                date: thursday,
                weekday: Weekday::Thu
            }
        );
    }
}
