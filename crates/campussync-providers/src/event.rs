//! Event records moved from the source to the destination.
//!
//! An [`EventRecord`] is one `VEVENT` from the CampusOffice export. Its
//! properties are never interpreted beyond the UID, which names the
//! resource on the CalDAV server.

use std::collections::HashMap;

use icalendar::{Calendar, Component, Event};

/// One opaque calendar event taken from the source export.
///
/// After [`group_by_uid`](Self::group_by_uid) a record also carries the
/// other `VEVENT`s sharing its UID, such as overridden occurrences of a
/// recurring event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    event: Event,
    overrides: Vec<Event>,
}

impl EventRecord {
    /// Wraps a parsed event.
    pub fn new(event: Event) -> Self {
        Self {
            event,
            overrides: Vec::new(),
        }
    }

    /// Folds records sharing a UID into the first of them, keeping the
    /// order of first appearance. Records without a UID stay on their own.
    pub fn group_by_uid(records: Vec<EventRecord>) -> Vec<EventRecord> {
        let mut grouped: Vec<EventRecord> = Vec::with_capacity(records.len());
        let mut seen: HashMap<String, usize> = HashMap::new();

        for record in records {
            let Some(uid) = record.uid().map(str::to_string) else {
                grouped.push(record);
                continue;
            };
            match seen.get(&uid) {
                Some(&at) => {
                    let target = &mut grouped[at];
                    target.overrides.push(record.event);
                    target.overrides.extend(record.overrides);
                }
                None => {
                    seen.insert(uid, grouped.len());
                    grouped.push(record);
                }
            }
        }

        grouped
    }

    /// Returns the event UID, if the source provided one.
    pub fn uid(&self) -> Option<&str> {
        self.event.get_uid()
    }

    /// Returns the UID, assigning a random one first if the event has none.
    pub fn ensure_uid(&mut self) -> String {
        if let Some(uid) = self.event.get_uid() {
            return uid.to_string();
        }
        let uid = uuid::Uuid::new_v4().to_string();
        self.event.uid(&uid);
        uid
    }

    /// Returns the underlying event.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Wraps the event, and any events grouped with it, in a standalone
    /// calendar document.
    pub fn to_ics(&self) -> String {
        let mut calendar = Calendar::new();
        calendar.push(self.event.clone());
        for event in &self.overrides {
            calendar.push(event.clone());
        }
        calendar.to_string()
    }
}

impl From<Event> for EventRecord {
    fn from(event: Event) -> Self {
        Self::new(event)
    }
}

/// An event object that already exists in the destination calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Absolute URL of the resource.
    pub href: String,
    /// Entity tag reported by the server, sent back as `If-Match` on delete.
    pub etag: Option<String>,
}

impl RemoteObject {
    /// Creates a remote object reference.
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            etag: None,
        }
    }

    /// Builder method to set the entity tag.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }
}
