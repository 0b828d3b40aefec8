use timetable_engine::{Activity, Timetable, TimetableDay, TimetableError};

fn schema() -> Timetable {
    let mut tt = Timetable::new(["Day 1", "Day 2"]);
    tt.set_day("Day 1", TimetableDay::new(["A", "B"])).unwrap();
    tt.set_day("Day 2", TimetableDay::new(["C", "D"])).unwrap();
    tt
}

fn content(tt: &Timetable) -> Vec<(String, String, String)> {
    tt.itercontent()
        .map(|(day, period, activity)| (day.to_string(), period.to_string(), activity.title().to_string()))
        .collect()
}

#[test]
fn set_day_rejects_undeclared_day_ids() {
    let mut tt = Timetable::new(["Day 1"]);
    let err = tt.set_day("Day 9", TimetableDay::new(["A"])).unwrap_err();
    assert_eq!(
        err,
        TimetableError::UnknownDay {
            day_id: "Day 9".to_string(),
            day_ids: vec!["Day 1".to_string()],
        }
    );
}

#[test]
fn a_day_belongs_to_one_timetable() {
    let tt = schema();
    let mut other = Timetable::new(["Day 1"]);
    let owned = tt.day("Day 1").unwrap().clone();
    let err = other.set_day("Day 1", owned).unwrap_err();
    assert_eq!(
        err,
        TimetableError::DayAlreadyOwned {
            day_id: "Day 1".to_string()
        }
    );
}

#[test]
fn itercontent_follows_day_and_period_order() {
    let mut tt = schema();
    tt.day_mut("Day 2").unwrap().add("D", Activity::new("Art")).unwrap();
    tt.day_mut("Day 1").unwrap().add("B", Activity::new("Math")).unwrap();
    tt.day_mut("Day 1").unwrap().add("A", Activity::new("Latin")).unwrap();
    tt.day_mut("Day 1").unwrap().add("A", Activity::new("Greek")).unwrap();

    let expected = vec![
        ("Day 1".to_string(), "A".to_string(), "Greek".to_string()),
        ("Day 1".to_string(), "A".to_string(), "Latin".to_string()),
        ("Day 1".to_string(), "B".to_string(), "Math".to_string()),
        ("Day 2".to_string(), "D".to_string(), "Art".to_string()),
    ];
    assert_eq!(content(&tt), expected);
}

#[test]
fn equal_activities_are_stored_once() {
    let mut tt = schema();
    let day = tt.day_mut("Day 1").unwrap();
    day.add("A", Activity::new("Math").with_owner("/persons/john")).unwrap();
    day.add("A", Activity::new("Math").with_owner("/persons/john")).unwrap();
    day.add("A", Activity::new("Math").with_owner("/persons/jane")).unwrap();
    assert_eq!(tt.day("Day 1").unwrap().activities("A").unwrap().len(), 2);
}

#[test]
fn update_merges_content_of_same_schema() {
    let mut tt = schema();
    tt.day_mut("Day 1").unwrap().add("A", Activity::new("Math")).unwrap();
    let mut other = schema();
    other.day_mut("Day 1").unwrap().add("A", Activity::new("Math")).unwrap();
    other.day_mut("Day 2").unwrap().add("C", Activity::new("Music")).unwrap();

    tt.update(&other).unwrap();
    assert_eq!(content(&tt).len(), 2);
    assert_eq!(content(&other).len(), 2);
}

#[test]
fn update_with_other_schema_leaves_timetable_untouched() {
    let mut tt = schema();
    tt.day_mut("Day 1").unwrap().add("A", Activity::new("Math")).unwrap();
    let before = tt.clone();

    let mut other = Timetable::new(["Day 1", "Day 2"]);
    other.set_day("Day 1", TimetableDay::new(["A", "B"])).unwrap();
    other.set_day("Day 2", TimetableDay::new(["C"])).unwrap();
    other.day_mut("Day 1").unwrap().add("B", Activity::new("Music")).unwrap();

    assert_eq!(tt.update(&other).unwrap_err(), TimetableError::SchemaMismatch);
    assert_eq!(tt, before);
}

#[test]
fn timezone_is_part_of_the_schema() {
    let mut tt = schema();
    let mut other = schema();
    other.set_timezone_name("Europe/Vilnius").unwrap();
    assert_ne!(tt.clone_empty(), other.clone_empty());
    assert_eq!(tt.update(&other).unwrap_err(), TimetableError::SchemaMismatch);

    let err = other.set_timezone_name("Mars/Olympus").unwrap_err();
    assert_eq!(err, TimetableError::UnknownTimezone("Mars/Olympus".to_string()));
}

#[test]
fn clone_empty_keeps_structure_only() {
    let mut tt = schema();
    tt.set_timezone_name("Europe/Vilnius").unwrap();
    tt.day_mut("Day 2").unwrap().add("C", Activity::new("Music")).unwrap();

    let empty = tt.clone_empty();
    assert_eq!(empty.itercontent().count(), 0);
    assert_eq!(empty.day_ids(), tt.day_ids());
    assert_eq!(empty.day("Day 2").unwrap().periods(), ["C", "D"]);
    assert_eq!(empty.timezone(), tt.timezone());
    assert_eq!(empty.day("Day 1").unwrap().timetable(), Some(empty.id()));

    let mut cleared = tt.clone();
    cleared.clear();
    assert_eq!(cleared, empty);
}

#[test]
fn equality_ignores_identity() {
    let mut a = schema();
    let mut b = schema();
    assert_ne!(a.id(), b.id());
    a.day_mut("Day 1").unwrap().add("A", Activity::new("Math")).unwrap();
    assert_ne!(a, b);
    b.day_mut("Day 1").unwrap().add("A", Activity::new("Math")).unwrap();
    assert_eq!(a, b);
}

#[test]
fn removing_activities() {
    let mut tt = schema();
    let day = tt.day_mut("Day 1").unwrap();
    day.add("A", Activity::new("Math")).unwrap();
    assert!(day.remove("A", &Activity::new("Math")).unwrap());
    assert!(!day.remove("A", &Activity::new("Math")).unwrap());
    assert!(matches!(
        day.remove("Z", &Activity::new("Math")),
        Err(TimetableError::UnknownPeriod { .. })
    ));
}
