//! CampusOffice calendar fetcher.
//!
//! Logs into the session-based CampusOffice web interface, downloads the
//! iCalendar export for a [`SyncWindow`] and returns its events.
//!
//! # Example
//!
//! ```ignore
//! use campussync_providers::campus::{CampusConfig, CampusCredentials, CampusFetcher};
//!
//! let config = CampusConfig::new(CampusCredentials::new("123456", "secret"));
//! let events = CampusFetcher::new(config).fetch(window).await?;
//! ```

mod config;
mod ics;
mod session;

pub use config::{CampusConfig, CampusCredentials};
pub use ics::parse_export;
pub use session::{CampusSession, export_end, export_start};

use campussync_core::SyncWindow;
use tracing::info;

use crate::error::SyncResult;
use crate::event::EventRecord;

/// Fetches the CampusOffice calendar for a window.
#[derive(Debug, Clone)]
pub struct CampusFetcher {
    config: CampusConfig,
}

impl CampusFetcher {
    /// Creates a fetcher for the given configuration.
    pub fn new(config: CampusConfig) -> Self {
        Self { config }
    }

    /// Logs in, downloads the export for `window`, logs out and parses it.
    ///
    /// Once the login form has been submitted, a logout is attempted on
    /// every path out of this function. A failing logout is only logged and
    /// never replaces the error that ended the fetch.
    pub async fn fetch(&self, window: SyncWindow) -> SyncResult<Vec<EventRecord>> {
        let session = CampusSession::new(self.config.clone())?;
        session.open().await?;

        let export = async {
            session.login().await?;
            session.export(window.start(), window.end()).await
        }
        .await;

        session.logout().await;
        let export = export?;

        info!("Parse calendar");
        let events = parse_export(&export)?;
        info!(count = events.len(), "Fetched CampusOffice events");
        Ok(events)
    }
}
