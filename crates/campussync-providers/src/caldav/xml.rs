//! WebDAV request bodies and multistatus parsing.

use std::io::Cursor;

use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};

/// DAV namespace
pub const DAV_NS: &str = "DAV:";
/// CalDAV namespace
pub const CALDAV_NS: &str = "urn:ietf:params:xml:ns:caldav";

type XmlResult<T> = Result<T, quick_xml::Error>;

/// A calendar collection listed by a depth-1 PROPFIND.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCalendar {
    /// The collection href as reported by the server.
    pub href: String,
    /// The display name.
    pub display_name: Option<String>,
}

/// An event resource listed by a calendar-query REPORT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedObject {
    pub href: String,
    pub etag: Option<String>,
}

/// PROPFIND body asking for `current-user-principal`.
pub fn current_user_principal_body() -> XmlResult<String> {
    propfind_body(&["d:current-user-principal"])
}

/// PROPFIND body asking for `calendar-home-set`.
pub fn calendar_home_set_body() -> XmlResult<String> {
    propfind_body(&["c:calendar-home-set"])
}

/// PROPFIND body listing the collections below a calendar home.
pub fn propfind_calendars_body() -> XmlResult<String> {
    propfind_body(&["d:displayname", "d:resourcetype"])
}

/// REPORT body selecting every `VEVENT` that overlaps `[start, end)`.
///
/// Only hrefs and ETags are requested; the event data itself is never needed.
pub fn calendar_query_body(start: DateTime<Utc>, end: DateTime<Utc>) -> XmlResult<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut query = BytesStart::new("c:calendar-query");
    query.push_attribute(("xmlns:d", DAV_NS));
    query.push_attribute(("xmlns:c", CALDAV_NS));
    writer.write_event(Event::Start(query))?;

    writer.write_event(Event::Start(BytesStart::new("d:prop")))?;
    writer.write_event(Event::Empty(BytesStart::new("d:getetag")))?;
    writer.write_event(Event::End(BytesEnd::new("d:prop")))?;

    writer.write_event(Event::Start(BytesStart::new("c:filter")))?;

    let mut vcalendar = BytesStart::new("c:comp-filter");
    vcalendar.push_attribute(("name", "VCALENDAR"));
    writer.write_event(Event::Start(vcalendar))?;

    let mut vevent = BytesStart::new("c:comp-filter");
    vevent.push_attribute(("name", "VEVENT"));
    writer.write_event(Event::Start(vevent))?;

    let mut time_range = BytesStart::new("c:time-range");
    time_range.push_attribute(("start", format_utc(start).as_str()));
    time_range.push_attribute(("end", format_utc(end).as_str()));
    writer.write_event(Event::Empty(time_range))?;

    writer.write_event(Event::End(BytesEnd::new("c:comp-filter")))?;
    writer.write_event(Event::End(BytesEnd::new("c:comp-filter")))?;
    writer.write_event(Event::End(BytesEnd::new("c:filter")))?;
    writer.write_event(Event::End(BytesEnd::new("c:calendar-query")))?;

    Ok(into_string(writer))
}

fn propfind_body(props: &[&str]) -> XmlResult<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut propfind = BytesStart::new("d:propfind");
    propfind.push_attribute(("xmlns:d", DAV_NS));
    propfind.push_attribute(("xmlns:c", CALDAV_NS));
    writer.write_event(Event::Start(propfind))?;
    writer.write_event(Event::Start(BytesStart::new("d:prop")))?;
    for prop in props {
        writer.write_event(Event::Empty(BytesStart::new(*prop)))?;
    }
    writer.write_event(Event::End(BytesEnd::new("d:prop")))?;
    writer.write_event(Event::End(BytesEnd::new("d:propfind")))?;

    Ok(into_string(writer))
}

fn into_string(writer: Writer<Cursor<Vec<u8>>>) -> String {
    String::from_utf8_lossy(&writer.into_inner().into_inner()).into_owned()
}

/// Returns the first `href` nested in the property with local name `prop`.
///
/// Used for single-href properties such as `current-user-principal` and
/// `calendar-home-set`.
pub fn parse_nested_href(xml: &str, prop: &str) -> XmlResult<Option<String>> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut in_prop = false;
    let mut in_href = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                name if name == prop.as_bytes() => in_prop = true,
                b"href" if in_prop => in_href = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                name if name == prop.as_bytes() => in_prop = false,
                b"href" => in_href = false,
                _ => {}
            },
            Event::Text(text) if in_href => return Ok(Some(text.unescape()?.into_owned())),
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Parses a depth-1 PROPFIND multistatus into the calendar collections it
/// lists.
///
/// Responses whose `resourcetype` lacks `calendar` are skipped.
pub fn parse_propfind_response(xml: &str) -> XmlResult<Vec<DiscoveredCalendar>> {
    let mut calendars = Vec::new();
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut href: Option<String> = None;
    let mut display_name: Option<String> = None;
    let mut is_calendar = false;
    let mut current: Option<&'static str> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"response" => {
                    href = None;
                    display_name = None;
                    is_calendar = false;
                }
                b"href" => current = Some("href"),
                b"displayname" => current = Some("displayname"),
                b"calendar" => is_calendar = true,
                _ => {}
            },
            Event::Text(text) => {
                let value = text.unescape()?.into_owned();
                match current {
                    Some("href") if href.is_none() => href = Some(value),
                    Some("displayname") => display_name = Some(value),
                    _ => {}
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"response" && is_calendar {
                    if let Some(href) = href.take() {
                        calendars.push(DiscoveredCalendar {
                            href,
                            display_name: display_name.take(),
                        });
                    }
                }
                current = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(calendars)
}

/// Parses a calendar-query multistatus into the listed resources.
///
/// ETag quotes are stripped.
pub fn parse_report_response(xml: &str) -> XmlResult<Vec<ReportedObject>> {
    let mut objects = Vec::new();
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut href: Option<String> = None;
    let mut etag: Option<String> = None;
    let mut current: Option<&'static str> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"response" => {
                    href = None;
                    etag = None;
                }
                b"href" => current = Some("href"),
                b"getetag" => current = Some("getetag"),
                _ => {}
            },
            Event::Text(text) => {
                let value = text.unescape()?.into_owned();
                match current {
                    Some("href") => href = Some(value),
                    Some("getetag") => etag = Some(value.trim_matches('"').to_string()),
                    _ => {}
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"response" {
                    if let Some(href) = href.take() {
                        objects.push(ReportedObject {
                            href,
                            etag: etag.take(),
                        });
                    }
                }
                current = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(objects)
}

fn format_utc(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}
