use chrono::{Datelike, NaiveDate, Weekday};
use timetable_engine::calendar::{SchooldayCalendar, SchooldayCalendarConfig, SchooldayModel};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn new_calendar_has_no_schooldays() {
    let cal = SchooldayCalendar::new("Fall", d(2003, 9, 1), d(2003, 9, 30));
    assert_eq!(cal.count_schooldays(), 0);
    assert!(!cal.is_schoolday(d(2003, 9, 1)));
    assert_eq!(cal.days().count(), 30);
}

#[test]
fn reversed_range_is_swapped() {
    let cal = SchooldayCalendar::new("Fall", d(2003, 9, 30), d(2003, 9, 1));
    assert_eq!(cal.first(), d(2003, 9, 1));
    assert_eq!(cal.last(), d(2003, 9, 30));
}

#[test]
fn weekdays_become_schooldays() {
    // 2003-09-01 is a Monday
    let cal = SchooldayCalendar::with_weekdays(
        "Fall",
        d(2003, 9, 1),
        d(2003, 9, 14),
        [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
    );
    assert_eq!(cal.count_schooldays(), 10);
    assert!(cal.schooldays().all(|date| date.weekday().num_days_from_monday() < 5));
    assert!(!cal.is_schoolday(d(2003, 9, 6)));
}

#[test]
fn dates_outside_the_term_are_never_schooldays() {
    let mut cal = SchooldayCalendar::new("Fall", d(2003, 9, 1), d(2003, 9, 30));
    assert!(!cal.add(d(2003, 10, 1)));
    assert!(!cal.is_schoolday(d(2003, 10, 1)));
    assert!(!cal.contains(d(2003, 8, 31)));
    assert!(cal.add(d(2003, 9, 30)));
    assert!(cal.is_schoolday(d(2003, 9, 30)));
}

#[test]
fn remove_and_toggle_weekdays() {
    let mut cal = SchooldayCalendar::with_weekdays(
        "Fall",
        d(2003, 9, 1),
        d(2003, 9, 7),
        [Weekday::Mon, Weekday::Tue, Weekday::Wed],
    );
    cal.remove_weekdays([Weekday::Tue]);
    assert!(!cal.is_schoolday(d(2003, 9, 2)));

    // Monday goes away, Saturday comes in
    cal.toggle_weekdays([Weekday::Mon, Weekday::Sat]);
    let days: Vec<NaiveDate> = cal.schooldays().collect();
    assert_eq!(days, vec![d(2003, 9, 3), d(2003, 9, 6)]);

    assert!(cal.remove(d(2003, 9, 3)));
    assert!(!cal.remove(d(2003, 9, 3)));
}

#[test]
fn reset_forgets_schooldays() {
    let mut cal = SchooldayCalendar::with_weekdays("Fall", d(2003, 9, 1), d(2003, 9, 7), [Weekday::Mon]);
    cal.reset(d(2004, 1, 10), d(2004, 1, 5));
    assert_eq!(cal.count_schooldays(), 0);
    assert_eq!(cal.first(), d(2004, 1, 5));
    assert_eq!(cal.last(), d(2004, 1, 10));
}

#[test]
fn config_applies_holidays_and_extra_days() {
    let config = SchooldayCalendarConfig {
        title: "Fall".into(),
        first: d(2003, 9, 1),
        last: d(2003, 9, 7),
        weekdays: vec![Weekday::Mon, Weekday::Tue],
        holidays: vec![d(2003, 9, 2)],
        extra_schooldays: vec![d(2003, 9, 6)],
    };
    let cal = SchooldayCalendar::from_config(&config);
    let days: Vec<NaiveDate> = cal.schooldays().collect();
    assert_eq!(days, vec![d(2003, 9, 1), d(2003, 9, 6)]);
    assert_eq!(cal.title(), "Fall");

    let again = SchooldayCalendar::from_config(&cal.to_config());
    assert_eq!(again, cal);
}
