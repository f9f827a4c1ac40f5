//! One sync run: load configuration, fetch, resolve, replace.
//!
//! Every step returns [`SyncError`] unchanged; [`report`] turns the outcome
//! into exactly one log line and the process exit code.

use std::path::Path;
use std::process::ExitCode;

use chrono::Local;
use tracing::{error, info, warn};

use campussync_providers::caldav::resolve_calendar;
use campussync_providers::campus::CampusFetcher;
use campussync_providers::{ReplaceSummary, SyncError, SyncErrorKind, SyncResult, replace};

use crate::config::{SyncConfig, SyncSettings};

/// Loads the configuration file and runs a sync for today's date.
pub async fn execute(config_path: &Path) -> SyncResult<ReplaceSummary> {
    let settings =
        SyncConfig::load_from(config_path)?.into_settings(Local::now().date_naive())?;
    run(settings).await
}

/// Fetches the CampusOffice events and replaces the CalDAV calendar's events
/// in the same window with them.
pub async fn run(settings: SyncSettings) -> SyncResult<ReplaceSummary> {
    let window = settings.window;
    info!(start = %window.start(), end = %window.end(), "Synchronize time period");

    let events = CampusFetcher::new(settings.campus).fetch(window).await?;
    let calendar = resolve_calendar(settings.caldav, &settings.calendar_url).await?;
    replace(&calendar, window, events).await
}

/// Logs the outcome of a run and maps it to an exit code.
pub fn report(result: &SyncResult<ReplaceSummary>) -> ExitCode {
    match result {
        Ok(summary) => {
            info!(
                deleted = summary.deleted,
                uploaded = summary.inserted,
                "Calendar synchronized"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", failure_message(err));
            if err.kind().leaves_partial_state() {
                warn!("The CalDAV calendar was left partially updated; run again to complete it");
            }
            ExitCode::from(err.kind().exit_code())
        }
    }
}

/// The single line logged for a failed run.
pub fn failure_message(err: &SyncError) -> String {
    let detail = single_line(err.message());
    match err.kind() {
        SyncErrorKind::Config => format!("Could not load config from file: {}", detail),
        SyncErrorKind::InvalidWindow => format!("Could not parse time period: {}", detail),
        SyncErrorKind::Transport
        | SyncErrorKind::Authentication
        | SyncErrorKind::InvalidExport => {
            format!("Could not retrieve CampusOffice calendar: {}", detail)
        }
        SyncErrorKind::DestinationAuth => {
            "Could not access CalDAV calendar: Authorization failed".to_string()
        }
        SyncErrorKind::Discovery => format!("Could not access CalDAV calendar: {}", detail),
        SyncErrorKind::CalendarNotFound => "Could not find CalDAV calendar".to_string(),
        SyncErrorKind::Query => {
            "Could not retrieve list of already existing events in CalDAV calendar".to_string()
        }
        SyncErrorKind::Delete => {
            "Could not remove already existing event in CalDAV calendar".to_string()
        }
        SyncErrorKind::Put => "Could not upload new event to CalDAV calendar".to_string(),
    }
}

fn single_line(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
