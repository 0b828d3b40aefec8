use chrono::{NaiveDate, NaiveTime, TimeDelta, Weekday};
use proptest::prelude::*;
use std::sync::Arc;
use timetable_engine::calendar::SchooldayModel;
use timetable_engine::model::DayCursor;
use timetable_engine::{
    Activity, DayTemplate, PeriodSlot, SchooldayCalendar, SequentialDaysModel, Timetable, TimetableDay, TimetableModel,
};

const DAY_IDS: [&str; 3] = ["A", "B", "C"];

fn term(start_offset: u32, length: u32, weekday_mask: u8) -> SchooldayCalendar {
    let first = NaiveDate::from_ymd_opt(2005, 6, 1).unwrap() + TimeDelta::days(i64::from(start_offset));
    let last = first + TimeDelta::days(i64::from(length));
    let weekdays = (0..7u8)
        .filter(|bit| weekday_mask & (1 << bit) != 0)
        .filter_map(|bit| Weekday::try_from(bit).ok());
    SchooldayCalendar::with_weekdays("term", first, last, weekdays)
}

fn model() -> SequentialDaysModel {
    let template = DayTemplate::from_slots([
        PeriodSlot::new("1", NaiveTime::from_hms_opt(8, 30, 0).unwrap(), TimeDelta::minutes(45)),
        PeriodSlot::new("2", NaiveTime::from_hms_opt(9, 30, 0).unwrap(), TimeDelta::minutes(45)),
    ]);
    SequentialDaysModel::new(DAY_IDS, [(None, template)])
}

fn timetable() -> Timetable {
    let mut tt = Timetable::new(DAY_IDS);
    for (idx, day_id) in DAY_IDS.iter().enumerate() {
        let mut day = TimetableDay::new(["1", "2"]);
        day.add("1", Activity::new(format!("Lesson {idx}"))).unwrap();
        day.add("2", Activity::new("Study hall")).unwrap();
        tt.set_day(day_id, day).unwrap();
    }
    tt.set_model(Arc::new(model()));
    tt
}

proptest! {
    #[test]
    fn derivation_is_deterministic(offset in 0u32..60, length in 0u32..40, mask in 1u8..128) {
        let term = term(offset, length, mask);
        let tt = timetable();
        let first = tt.create_calendar(&term, None, None).unwrap();
        let second = tt.clone().create_calendar(&term, None, None).unwrap();
        prop_assert_eq!(first.len(), term.count_schooldays() * 2);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn exception_days_do_not_consume_the_cycle(
        length in 5u32..40,
        mask in 1u8..128,
        picks in proptest::collection::vec(0usize..40, 0..4),
    ) {
        let term = term(0, length, mask);
        let schooldays: Vec<NaiveDate> = term.schooldays().collect();
        let mut model = model();
        let mut overridden = Vec::new();
        for pick in picks {
            if let Some(date) = schooldays.get(pick) {
                model.core_mut().set_exception_day_id(*date, "X");
                overridden.push(*date);
            }
        }

        let mut cursor = DayCursor::new();
        let ordinary: Vec<String> = term
            .days()
            .filter(|date| term.is_schoolday(*date))
            .filter_map(|date| {
                let day_id = model.day_id(date, &mut cursor);
                if overridden.contains(&date) { None } else { day_id }
            })
            .collect();
        let expected: Vec<String> = DAY_IDS
            .iter()
            .cycle()
            .take(ordinary.len())
            .map(|id| id.to_string())
            .collect();
        prop_assert_eq!(ordinary, expected);
    }

    #[test]
    fn bounded_calendars_are_slices_of_the_full_one(length in 1u32..40, mask in 1u8..128, cut in 0u32..40) {
        let term = term(0, length, mask);
        let tt = timetable();
        let full = tt.create_calendar(&term, None, None).unwrap();
        let first = term.first() + TimeDelta::days(i64::from(cut.min(length)));
        let bounded = tt.create_calendar(&term, Some(first), None).unwrap();
        for event in &bounded {
            prop_assert_eq!(full.find(event.unique_id()), Some(event));
        }
        let expected = full.iter().filter(|e| e.dtstart().date_naive() >= first).count();
        prop_assert_eq!(bounded.len(), expected);
    }
}
