//! The `<timetable>` XML exchange format.
//!
//! ```xml
//! <timetable xmlns="http://schooltool.org/ns/timetable/0.1"
//!            xmlns:xlink="http://www.w3.org/1999/xlink">
//!   <timezone name="Europe/Vilnius"/>
//!   <term id="2003 fall"/>
//!   <schooltt id="default"/>
//!   <day id="Day 1">
//!     <period id="A">
//!       <activity title="Math">
//!         <resource xlink:href="/resources/room1"/>
//!       </activity>
//!     </period>
//!   </day>
//!   <exception date="2003-11-24" period="A">
//!     <activity title="Math"/>
//!     <replacement date="2003-11-24" time="09:00" duration="30" uid="...">Assembly</replacement>
//!   </exception>
//! </timetable>
//! ```
//!
//! Replacement times and durations are kept to the second: `time="09:00:30"`
//! and `duration="29:30"` are written only when the seconds are non-zero.

use crate::activity::Activity;
use crate::error::TimetableError;
use crate::event::CalendarEvent;
use crate::exception::TimetableException;
use crate::model::localize;
use crate::services::TimetableSchemaService;
use crate::timetable::{Timetable, TimetableDay, parse_timezone};
use chrono::{NaiveDate, NaiveTime, TimeDelta, Timelike};
use chrono_tz::Tz;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

pub const TIMETABLE_NS: &str = "http://schooltool.org/ns/timetable/0.1";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Syntax(#[from] quick_xml::Error),

    #[error("malformed XML attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("failed to write XML: {0}")]
    Io(#[from] std::io::Error),

    #[error("written XML is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("<{element}> is missing the {attribute:?} attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("<{parent}> has no <{element}> element")]
    MissingElement {
        parent: &'static str,
        element: &'static str,
    },

    #[error("unexpected <{element}> element")]
    UnexpectedElement { element: String },

    #[error("invalid {what} {value:?}")]
    InvalidValue { what: &'static str, value: String },

    #[error("document root is not <timetable>")]
    NotATimetable,

    #[error(transparent)]
    Timetable(#[from] TimetableError),
}

/// A parsed timetable document.
#[derive(Debug)]
pub struct TimetableDocument {
    pub term: Option<String>,
    pub schema: Option<String>,
    pub timetable: Timetable,
}

/// Serializes a timetable. `term` and `schema` are the ids written to the
/// `<term>` and `<schooltt>` elements.
pub fn write_timetable(timetable: &Timetable, term: Option<&str>, schema: Option<&str>) -> Result<String, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("timetable");
    root.push_attribute(("xmlns", TIMETABLE_NS));
    root.push_attribute(("xmlns:xlink", XLINK_NS));
    writer.write_event(Event::Start(root))?;

    let timezone = timetable.timezone();
    writer.write_event(Event::Empty(
        BytesStart::new("timezone").with_attributes([("name", timezone.name())]),
    ))?;
    if let Some(term) = term {
        writer.write_event(Event::Empty(BytesStart::new("term").with_attributes([("id", term)])))?;
    }
    if let Some(schema) = schema {
        writer.write_event(Event::Empty(BytesStart::new("schooltt").with_attributes([("id", schema)])))?;
    }

    for (day_id, day) in timetable.items() {
        writer.write_event(Event::Start(BytesStart::new("day").with_attributes([("id", day_id)])))?;
        for (period_id, activities) in day.items() {
            let period = BytesStart::new("period").with_attributes([("id", period_id)]);
            if activities.is_empty() {
                writer.write_event(Event::Empty(period))?;
                continue;
            }
            writer.write_event(Event::Start(period))?;
            for activity in activities {
                write_activity(&mut writer, activity)?;
            }
            writer.write_event(Event::End(BytesEnd::new("period")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("day")))?;
    }

    for exception in timetable.exceptions() {
        let date = exception.date().to_string();
        let start = BytesStart::new("exception")
            .with_attributes([("date", date.as_str()), ("period", exception.period_id())]);
        writer.write_event(Event::Start(start))?;
        write_activity(&mut writer, exception.activity())?;
        if let Some(replacement) = exception.replacement() {
            write_replacement(&mut writer, replacement, timezone)?;
        }
        writer.write_event(Event::End(BytesEnd::new("exception")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("timetable")))?;
    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_activity(writer: &mut Writer<Vec<u8>>, activity: &Activity) -> Result<(), XmlError> {
    let mut start = BytesStart::new("activity");
    start.push_attribute(("title", activity.title()));
    if let Some(owner) = activity.owner() {
        start.push_attribute(("owner", owner));
    }
    if activity.resources().is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for resource in activity.resources() {
        writer.write_event(Event::Empty(
            BytesStart::new("resource").with_attributes([("xlink:href", resource.as_str())]),
        ))?;
    }
    writer.write_event(Event::End(BytesEnd::new("activity")))?;
    Ok(())
}

fn write_replacement(writer: &mut Writer<Vec<u8>>, event: &CalendarEvent, timezone: Tz) -> Result<(), XmlError> {
    let local = event.dtstart().with_timezone(&timezone);
    let date = local.date_naive().to_string();
    let time = if local.second() == 0 {
        local.format("%H:%M").to_string()
    } else {
        local.format("%H:%M:%S").to_string()
    };
    let duration = format_duration(event.duration());
    let start = BytesStart::new("replacement").with_attributes([
        ("date", date.as_str()),
        ("time", time.as_str()),
        ("duration", duration.as_str()),
        ("uid", event.unique_id()),
    ]);
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(event.title())))?;
    writer.write_event(Event::End(BytesEnd::new("replacement")))?;
    Ok(())
}

#[derive(Debug, Default)]
struct DocPeriod {
    id: String,
    activities: Vec<Activity>,
}

#[derive(Debug, Default)]
struct DocDay {
    id: String,
    periods: Vec<DocPeriod>,
}

#[derive(Debug)]
struct DocReplacement {
    date: NaiveDate,
    time: NaiveTime,
    duration: TimeDelta,
    uid: Option<String>,
    title: String,
}

#[derive(Debug)]
struct DocException {
    date: NaiveDate,
    period: String,
    activity: Option<Activity>,
    replacement: Option<DocReplacement>,
}

#[derive(Debug, Default)]
struct Document {
    timezone: Option<String>,
    term: Option<String>,
    schema: Option<String>,
    days: Vec<DocDay>,
    exceptions: Vec<DocException>,
}

/// Where the parser currently is inside the document.
#[derive(Debug, Default)]
struct Parser {
    doc: Document,
    seen_root: bool,
    day: Option<DocDay>,
    period: Option<DocPeriod>,
    activity: Option<Activity>,
    exception: Option<DocException>,
    replacement: Option<DocReplacement>,
}

impl Parser {
    fn start(&mut self, element: &BytesStart) -> Result<(), XmlError> {
        let name = element.local_name();
        match name.as_ref() {
            b"timetable" if !self.seen_root => self.seen_root = true,
            _ if !self.seen_root => return Err(XmlError::NotATimetable),
            b"timezone" => self.doc.timezone = Some(required(element, "timezone", "name")?),
            b"term" => self.doc.term = Some(required(element, "term", "id")?),
            b"schooltt" => self.doc.schema = Some(required(element, "schooltt", "id")?),
            b"day" if self.day.is_none() && self.exception.is_none() => {
                self.day = Some(DocDay {
                    id: required(element, "day", "id")?,
                    periods: Vec::new(),
                });
            }
            b"period" if self.day.is_some() && self.period.is_none() => {
                self.period = Some(DocPeriod {
                    id: required(element, "period", "id")?,
                    activities: Vec::new(),
                });
            }
            b"activity" if self.activity.is_none() && (self.period.is_some() || self.exception.is_some()) => {
                let mut activity = Activity::new(required(element, "activity", "title")?);
                if let Some(owner) = attribute(element, b"owner")? {
                    activity = activity.with_owner(owner);
                }
                self.activity = Some(activity);
            }
            b"resource" if self.activity.is_some() => {
                let href = attribute(element, b"href")?.ok_or(XmlError::MissingAttribute {
                    element: "resource",
                    attribute: "xlink:href",
                })?;
                if let Some(activity) = self.activity.take() {
                    let mut resources: Vec<String> = activity.resources().iter().cloned().collect();
                    resources.push(href);
                    self.activity = Some(activity.with_resources(resources));
                }
            }
            b"exception" if self.day.is_none() && self.exception.is_none() => {
                self.exception = Some(DocException {
                    date: parse_date(&required(element, "exception", "date")?)?,
                    period: required(element, "exception", "period")?,
                    activity: None,
                    replacement: None,
                });
            }
            b"replacement" if self.exception.is_some() && self.replacement.is_none() => {
                let duration = required(element, "replacement", "duration")?;
                let duration = parse_duration(&duration)?;
                self.replacement = Some(DocReplacement {
                    date: parse_date(&required(element, "replacement", "date")?)?,
                    time: parse_time(&required(element, "replacement", "time")?)?,
                    duration,
                    uid: attribute(element, b"uid")?,
                    title: String::new(),
                });
            }
            other => {
                return Err(XmlError::UnexpectedElement {
                    element: String::from_utf8_lossy(other).into_owned(),
                });
            }
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if let Some(replacement) = self.replacement.as_mut() {
            replacement.title.push_str(text);
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"activity" => {
                let activity = self.activity.take();
                if let Some(period) = self.period.as_mut() {
                    period.activities.extend(activity);
                } else if let Some(exception) = self.exception.as_mut() {
                    exception.activity = activity;
                }
            }
            b"period" => {
                if let (Some(period), Some(day)) = (self.period.take(), self.day.as_mut()) {
                    day.periods.push(period);
                }
            }
            b"day" => self.doc.days.extend(self.day.take()),
            b"replacement" => {
                if let Some(exception) = self.exception.as_mut() {
                    exception.replacement = self.replacement.take();
                }
            }
            b"exception" => self.doc.exceptions.extend(self.exception.take()),
            _ => {}
        }
    }
}

fn attribute(element: &BytesStart, local_name: &[u8]) -> Result<Option<String>, XmlError> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == local_name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn required(element: &BytesStart, name: &'static str, attr: &'static str) -> Result<String, XmlError> {
    attribute(element, attr.as_bytes())?.ok_or(XmlError::MissingAttribute {
        element: name,
        attribute: attr,
    })
}

fn parse_date(value: &str) -> Result<NaiveDate, XmlError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| XmlError::InvalidValue {
        what: "date",
        value: value.to_string(),
    })
}

/// Durations are written in minutes, as `minutes:seconds` when they do not
/// fall on a whole minute.
fn format_duration(duration: TimeDelta) -> String {
    let seconds = duration.num_seconds();
    if seconds % 60 == 0 {
        return (seconds / 60).to_string();
    }
    let sign = if seconds < 0 { "-" } else { "" };
    let seconds = seconds.unsigned_abs();
    format!("{sign}{}:{:02}", seconds / 60, seconds % 60)
}

fn parse_duration(value: &str) -> Result<TimeDelta, XmlError> {
    let invalid = || XmlError::InvalidValue {
        what: "duration",
        value: value.to_string(),
    };
    let (minutes, seconds) = match value.split_once(':') {
        Some((minutes, seconds)) => (minutes, seconds.parse::<i64>().map_err(|_| invalid())?),
        None => (value, 0),
    };
    let whole: i64 = minutes.parse().map_err(|_| invalid())?;
    if !(0..60).contains(&seconds) {
        return Err(invalid());
    }
    let seconds = if minutes.starts_with('-') { -seconds } else { seconds };
    TimeDelta::try_minutes(whole)
        .and_then(|whole| whole.checked_add(&TimeDelta::seconds(seconds)))
        .ok_or_else(invalid)
}

fn parse_time(value: &str) -> Result<NaiveTime, XmlError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| XmlError::InvalidValue {
            what: "time",
            value: value.to_string(),
        })
}

/// Parses a timetable document.
///
/// With a schema service, the timetable starts as a copy of the schema named
/// by `<schooltt>` (model included) and every day and period in the document
/// must exist in it. Without one, the structure is taken from the document.
pub fn read_timetable(xml: &str, schemas: Option<&TimetableSchemaService>) -> Result<TimetableDocument, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut parser = Parser::default();

    loop {
        match reader.read_event()? {
            Event::Start(element) => parser.start(&element)?,
            Event::Empty(element) => {
                parser.start(&element)?;
                parser.end(element.local_name().as_ref());
            }
            Event::Text(text) => parser.text(&text.unescape()?),
            Event::End(element) => parser.end(element.local_name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
    }
    if !parser.seen_root {
        return Err(XmlError::NotATimetable);
    }
    build(parser.doc, schemas)
}

fn build(doc: Document, schemas: Option<&TimetableSchemaService>) -> Result<TimetableDocument, XmlError> {
    let mut timetable = match (schemas, doc.schema.as_deref()) {
        (Some(schemas), Some(schema_id)) => fill_schema(schemas.schema(schema_id)?, &doc.days)?,
        _ => structure_from_document(&doc.days)?,
    };
    if let Some(name) = doc.timezone.as_deref() {
        timetable.set_timezone(parse_timezone(name)?);
    }

    let timezone = timetable.timezone();
    for exception in doc.exceptions {
        let activity = exception.activity.ok_or(XmlError::MissingElement {
            parent: "exception",
            element: "activity",
        })?;
        let mut built = TimetableException::new(exception.date, exception.period, activity);
        if let Some(replacement) = exception.replacement {
            let dtstart = localize(replacement.date, replacement.time, timezone);
            let mut event = CalendarEvent::exceptional(dtstart, replacement.duration, replacement.title, built.key());
            if let Some(uid) = replacement.uid {
                event = event.with_unique_id(uid);
            }
            built.set_replacement(Some(event))?;
        }
        timetable.add_exception(built);
    }

    Ok(TimetableDocument {
        term: doc.term,
        schema: doc.schema,
        timetable,
    })
}

fn structure_from_document(days: &[DocDay]) -> Result<Timetable, XmlError> {
    let mut timetable = Timetable::new(days.iter().map(|day| day.id.clone()));
    for doc_day in days {
        let mut day = TimetableDay::new(doc_day.periods.iter().map(|period| period.id.clone()));
        for period in &doc_day.periods {
            for activity in &period.activities {
                day.add(&period.id, activity.clone())?;
            }
        }
        timetable.set_day(&doc_day.id, day)?;
    }
    Ok(timetable)
}

fn fill_schema(mut timetable: Timetable, days: &[DocDay]) -> Result<Timetable, XmlError> {
    for doc_day in days {
        let day_ids = timetable.day_ids().to_vec();
        let day = timetable
            .day_mut(&doc_day.id)
            .ok_or_else(|| TimetableError::UnknownDay {
                day_id: doc_day.id.clone(),
                day_ids,
            })?;
        for period in &doc_day.periods {
            if !day.has_period(&period.id) {
                return Err(TimetableError::UnknownPeriod {
                    period_id: period.id.clone(),
                    periods: day.periods().to_vec(),
                }
                .into());
            }
            for activity in &period.activities {
                day.add(&period.id, activity.clone())?;
            }
        }
    }
    Ok(timetable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_foreign_documents() {
        let err = read_timetable("<calendar/>", None).unwrap_err();
        assert!(matches!(err, XmlError::NotATimetable));
    }

    #[test]
    fn rejects_unknown_elements() {
        let xml = r#"<timetable xmlns="http://schooltool.org/ns/timetable/0.1"><week id="1"/></timetable>"#;
        let err = read_timetable(xml, None).unwrap_err();
        assert!(matches!(err, XmlError::UnexpectedElement { element } if element == "week"));
    }

    #[test]
    fn reads_resources_by_xlink_href() {
        let xml = r#"
            <timetable xmlns="http://schooltool.org/ns/timetable/0.1"
                       xmlns:xlink="http://www.w3.org/1999/xlink">
              <day id="1">
                <period id="A">
                  <activity title="Lab &amp; Theory">
                    <resource xlink:href="/resources/lab1"/>
                    <resource xlink:href="/resources/lab2"/>
                  </activity>
                </period>
              </day>
            </timetable>"#;
        let doc = read_timetable(xml, None).unwrap();
        let (_, _, activity) = doc.timetable.itercontent().next().unwrap();
        assert_eq!(activity.title(), "Lab & Theory");
        assert_eq!(activity.resources().len(), 2);
        assert_eq!(doc.timetable.timezone(), Tz::UTC);
    }
}
