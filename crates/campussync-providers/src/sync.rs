//! The replace policy.
//!
//! A run makes the destination's events for the window equal to the events
//! fetched from the source: list what is there, delete all of it, upload the
//! fresh set. Nothing is diffed and nothing is rolled back; a failure in the
//! middle leaves whatever was already deleted or uploaded in place.

use campussync_core::SyncWindow;
use tracing::{debug, info};

use crate::error::SyncResult;
use crate::event::EventRecord;
use crate::provider::RemoteCalendar;

/// What a successful [`replace`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    /// Existing events removed from the window.
    pub deleted: usize,
    /// Calendar objects uploaded; events sharing a UID count once.
    pub inserted: usize,
}

/// Replaces the calendar's events in `window` with `events`.
///
/// The listing happens before any mutation, so a broken query aborts
/// without touching the calendar. Deletions run one at a time in listing
/// order and all of them finish before the first upload. Events sharing a
/// UID are uploaded together as one calendar object.
pub async fn replace(
    calendar: &dyn RemoteCalendar,
    window: SyncWindow,
    events: Vec<EventRecord>,
) -> SyncResult<ReplaceSummary> {
    info!(
        calendar = %calendar.url(),
        start = %window.start(),
        end = %window.end(),
        "Delete all existing events in given time period"
    );
    let existing = calendar.search(window).await?;

    let total = existing.len();
    for (index, object) in existing.iter().enumerate() {
        info!("Delete event {}/{}", index + 1, total);
        calendar.delete(object).await?;
    }

    info!("Upload all events");
    let events = EventRecord::group_by_uid(events);
    let total = events.len();
    for (index, event) in events.into_iter().enumerate() {
        info!("Upload event {}/{}", index + 1, total);
        let created = calendar.put(event).await?;
        debug!(href = %created.href, "Uploaded event");
    }

    Ok(ReplaceSummary {
        deleted: existing.len(),
        inserted: total,
    })
}
