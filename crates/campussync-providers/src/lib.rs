//! Source fetcher and destination synchronizer for campussync.
//!
//! - [`campus::CampusFetcher`] - logs into CampusOffice and downloads the
//!   iCalendar export for a window
//! - [`caldav::resolve_calendar`] - locates the destination calendar
//! - [`sync::replace`] - replaces the destination's events in the window
//! - [`SyncError`] - the error every step reports
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                 ┌─────────────────┐
//! │  CampusOffice   │                 │  CalDAV Server  │
//! └────────┬────────┘                 └────────▲────────┘
//!          │ iCalendar export                  │ REPORT / DELETE / PUT
//!          ▼                                   │
//! ┌─────────────────┐  EventRecord  ┌──────────┴───────┐
//! │ CampusFetcher   ├──────────────►│ sync::replace    │
//! └─────────────────┘               │ (RemoteCalendar) │
//!                                   └──────────────────┘
//! ```

pub mod caldav;
pub mod campus;
pub mod error;
pub mod event;
pub mod provider;
pub mod sync;

pub use error::{SyncError, SyncErrorKind, SyncResult};
pub use event::{EventRecord, RemoteObject};
pub use provider::{BoxFuture, RemoteCalendar};
pub use sync::{ReplaceSummary, replace};
