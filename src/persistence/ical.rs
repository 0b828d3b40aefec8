use super::ExportResult;
use crate::event::{Calendar, CalendarEvent};
use chrono::TimeDelta;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const PRODID: &str = "-//timetable-engine//EN";

/// Renders a calendar as an iCalendar (RFC 5545) document with CRLF line
/// endings. Output depends only on the events, so unchanged calendars render
/// identically.
pub fn calendar_to_ical(calendar: &Calendar) -> String {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
    ];
    for event in calendar {
        push_event(&mut lines, event);
    }
    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in lines {
        out.push_str(&line);
        out.push_str("\r\n");
    }
    out
}

pub fn write_calendar_ical<P: AsRef<Path>>(calendar: &Calendar, path: P) -> ExportResult<()> {
    fs::write(path, calendar_to_ical(calendar))?;
    Ok(())
}

fn push_event(lines: &mut Vec<String>, event: &CalendarEvent) {
    let stamp = event.dtstart().format("%Y%m%dT%H%M%SZ").to_string();
    lines.push("BEGIN:VEVENT".to_string());
    lines.push(format!("UID:{}", escape(event.unique_id())));
    lines.push(format!("SUMMARY:{}", escape(event.title())));
    lines.push(format!("DTSTART:{stamp}"));
    lines.push(format!("DURATION:{}", format_duration(event.duration())));
    lines.push(format!("DTSTAMP:{stamp}"));
    if let Some(location) = event.location() {
        lines.push(format!("LOCATION:{}", escape(location)));
    }
    lines.push("END:VEVENT".to_string());
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

fn format_duration(duration: TimeDelta) -> String {
    let mut seconds = duration.num_seconds();
    let mut out = String::new();
    if seconds < 0 {
        out.push('-');
        seconds = -seconds;
    }
    out.push('P');
    let days = seconds / 86_400;
    seconds %= 86_400;
    if days > 0 {
        let _ = write!(out, "{days}D");
    }
    if seconds > 0 || days == 0 {
        out.push('T');
        let (hours, minutes, secs) = (seconds / 3600, seconds % 3600 / 60, seconds % 60);
        if hours > 0 {
            let _ = write!(out, "{hours}H");
        }
        if minutes > 0 {
            let _ = write!(out, "{minutes}M");
        }
        if secs > 0 || (hours == 0 && minutes == 0) {
            let _ = write!(out, "{secs}S");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn durations_use_rfc5545_notation() {
        assert_eq!(format_duration(TimeDelta::minutes(45)), "PT45M");
        assert_eq!(format_duration(TimeDelta::minutes(90)), "PT1H30M");
        assert_eq!(format_duration(TimeDelta::days(1)), "P1D");
        assert_eq!(format_duration(TimeDelta::zero()), "PT0S");
    }

    #[test]
    fn renders_escaped_events() {
        let start = Utc.with_ymd_and_hms(2003, 11, 20, 9, 0, 0).unwrap();
        let calendar: Calendar = [CalendarEvent::new(start, TimeDelta::minutes(45), "Math, advanced")
            .with_unique_id("uid-1")
            .with_location("Room 1")]
        .into_iter()
        .collect();
        let ical = calendar_to_ical(&calendar);
        assert!(ical.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n"));
        assert!(ical.contains("SUMMARY:Math\\, advanced\r\n"));
        assert!(ical.contains("DTSTART:20031120T090000Z\r\n"));
        assert!(ical.contains("DURATION:PT45M\r\n"));
        assert!(ical.contains("LOCATION:Room 1\r\n"));
        assert!(ical.ends_with("END:VEVENT\r\nEND:VCALENDAR\r\n"));
    }
}
