//! Parsing of the CampusOffice iCalendar export.

use icalendar::{Calendar, CalendarComponent};
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::event::EventRecord;

/// Parses an export and keeps its top-level events, in document order.
///
/// Timezone definitions and any other non-event components are dropped.
pub fn parse_export(ics: &str) -> SyncResult<Vec<EventRecord>> {
    let calendar: Calendar = ics.parse().map_err(|e: String| {
        SyncError::invalid_export(format!("Could not parse calendar export: {}", e))
    })?;

    let total = calendar.iter().count();
    let events: Vec<EventRecord> = calendar
        .iter()
        .filter_map(|component| match component {
            CalendarComponent::Event(event) => Some(EventRecord::new(event.clone())),
            _ => None,
        })
        .collect();

    debug!(
        components = total,
        events = events.len(),
        "Parsed calendar export"
    );

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "BEGIN:VCALENDAR\r\n\
        VERSION:2.0\r\n\
        PRODID:-//CAMPUS//Office//DE\r\n\
        BEGIN:VTIMEZONE\r\n\
        TZID:Europe/Berlin\r\n\
        BEGIN:STANDARD\r\n\
        DTSTART:19701025T030000\r\n\
        TZOFFSETFROM:+0200\r\n\
        TZOFFSETTO:+0100\r\n\
        END:STANDARD\r\n\
        END:VTIMEZONE\r\n\
        BEGIN:VEVENT\r\n\
        UID:lecture-1@campus\r\n\
        DTSTART;TZID=Europe/Berlin:20240102T081500\r\n\
        DTEND;TZID=Europe/Berlin:20240102T094500\r\n\
        SUMMARY:Analysis für Informatiker\r\n\
        LOCATION:H01\r\n\
        END:VEVENT\r\n\
        BEGIN:VTODO\r\n\
        UID:todo-1@campus\r\n\
        SUMMARY:Not an event\r\n\
        END:VTODO\r\n\
        BEGIN:VEVENT\r\n\
        UID:lecture-2@campus\r\n\
        DTSTART;TZID=Europe/Berlin:20240103T100000\r\n\
        DTEND;TZID=Europe/Berlin:20240103T113000\r\n\
        SUMMARY:Lineare Algebra\r\n\
        END:VEVENT\r\n\
        BEGIN:VEVENT\r\n\
        UID:lecture-3@campus\r\n\
        DTSTART;TZID=Europe/Berlin:20240104T140000\r\n\
        DTEND;TZID=Europe/Berlin:20240104T153000\r\n\
        SUMMARY:Programmierung\r\n\
        END:VEVENT\r\n\
        END:VCALENDAR\r\n";

    #[test]
    fn keeps_only_events_in_order() {
        let events = parse_export(EXPORT).unwrap();
        let uids: Vec<_> = events.iter().map(|e| e.uid().unwrap().to_string()).collect();
        assert_eq!(
            uids,
            vec!["lecture-1@campus", "lecture-2@campus", "lecture-3@campus"]
        );
    }

    #[test]
    fn keeps_non_ascii_text() {
        let events = parse_export(EXPORT).unwrap();
        assert!(events[0].to_ics().contains("Analysis für Informatiker"));
    }

    #[test]
    fn empty_calendar_yields_no_events() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n";
        assert!(parse_export(ics).unwrap().is_empty());
    }
}
