//! The destination calendar abstraction.
//!
//! [`RemoteCalendar`] is the seam between the replace policy in
//! [`crate::sync`] and the CalDAV implementation in [`crate::caldav`].

use std::future::Future;
use std::pin::Pin;

use campussync_core::SyncWindow;

use crate::error::SyncResult;
use crate::event::{EventRecord, RemoteObject};

/// A boxed future for async trait methods.
///
/// Boxed futures keep the trait object-safe so the synchronizer can work
/// with `&dyn RemoteCalendar`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A calendar collection that events can be listed in, removed from, and
/// added to.
///
/// Implementations report failures with the matching
/// [`SyncErrorKind`](crate::error::SyncErrorKind): `Query` for
/// [`search`](Self::search), `Delete` for [`delete`](Self::delete) and `Put`
/// for [`put`](Self::put).
pub trait RemoteCalendar: Send + Sync {
    /// Canonical URL of the calendar collection.
    fn url(&self) -> &str;

    /// Lists every event overlapping the window, in server order.
    fn search(&self, window: SyncWindow) -> BoxFuture<'_, SyncResult<Vec<RemoteObject>>>;

    /// Removes one existing event.
    fn delete<'a>(&'a self, object: &'a RemoteObject) -> BoxFuture<'a, SyncResult<()>>;

    /// Stores an event as a new object and returns where it was created.
    fn put(&self, event: EventRecord) -> BoxFuture<'_, SyncResult<RemoteObject>>;
}
