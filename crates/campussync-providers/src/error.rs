//! Error types for sync operations.
//!
//! Every failure of a run is a [`SyncError`] classified by a
//! [`SyncErrorKind`]. Errors are never recovered inside the library; they
//! travel unchanged to the orchestrator, which turns each kind into one log
//! line and an exit code.

use std::fmt;
use thiserror::Error;

use campussync_core::WindowError;

/// The category of a sync error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncErrorKind {
    /// Configuration is missing or invalid.
    Config,
    /// The time period could not be parsed or is inverted.
    InvalidWindow,
    /// Network failure or non-2xx status while talking to CampusOffice.
    Transport,
    /// CampusOffice rejected the login.
    Authentication,
    /// The CampusOffice export is not a valid iCalendar document.
    InvalidExport,
    /// The CalDAV server rejected the credentials.
    DestinationAuth,
    /// No CalDAV calendar matches the configured URL.
    CalendarNotFound,
    /// CalDAV principal or calendar discovery failed for another reason.
    Discovery,
    /// Listing the existing events in the window failed.
    Query,
    /// Removing an existing event failed.
    Delete,
    /// Uploading a new event failed.
    Put,
}

impl SyncErrorKind {
    /// Returns a stable machine-readable name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::InvalidWindow => "invalid_window",
            Self::Transport => "transport",
            Self::Authentication => "authentication",
            Self::InvalidExport => "invalid_export",
            Self::DestinationAuth => "destination_auth",
            Self::CalendarNotFound => "calendar_not_found",
            Self::Discovery => "discovery",
            Self::Query => "query",
            Self::Delete => "delete",
            Self::Put => "put",
        }
    }

    /// Process exit code reported for this kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config => 10,
            Self::InvalidWindow => 11,
            Self::Transport => 20,
            Self::Authentication => 21,
            Self::InvalidExport => 22,
            Self::DestinationAuth => 30,
            Self::CalendarNotFound => 31,
            Self::Discovery => 32,
            Self::Query => 33,
            Self::Delete => 34,
            Self::Put => 35,
        }
    }

    /// Returns true if the destination may have been partially modified.
    pub fn leaves_partial_state(&self) -> bool {
        matches!(self, Self::Delete | Self::Put)
    }
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that aborted a sync run.
#[derive(Debug, Error)]
pub struct SyncError {
    kind: SyncErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SyncError {
    /// Creates a new error with the given kind and message.
    pub fn new(kind: SyncErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Config, message)
    }

    /// Creates a source transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Transport, message)
    }

    /// Creates a source login error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Authentication, message)
    }

    /// Creates an unparsable-export error.
    pub fn invalid_export(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::InvalidExport, message)
    }

    /// Creates a destination authorization error.
    pub fn destination_auth(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::DestinationAuth, message)
    }

    /// Creates a calendar-not-found error.
    pub fn calendar_not_found(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::CalendarNotFound, message)
    }

    /// Creates a discovery error.
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Discovery, message)
    }

    /// Creates a window query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Query, message)
    }

    /// Creates a delete error.
    pub fn delete(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Delete, message)
    }

    /// Creates an upload error.
    pub fn put(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Put, message)
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> SyncErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<WindowError> for SyncError {
    fn from(err: WindowError) -> Self {
        let kind = match err {
            WindowError::MissingBound { .. } => SyncErrorKind::Config,
            WindowError::Inverted { .. } | WindowError::InvalidDate { .. } => {
                SyncErrorKind::InvalidWindow
            }
        };
        Self::new(kind, err.to_string()).with_source(err)
    }
}

/// A specialized Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
