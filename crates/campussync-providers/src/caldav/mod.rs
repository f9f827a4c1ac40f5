//! CalDAV destination.
//!
//! Resolves the target calendar through the standard discovery chain and
//! exposes it as a [`RemoteCalendar`](crate::provider::RemoteCalendar):
//!
//! - HTTP Digest and Basic authentication
//! - PROPFIND for principal, calendar home and calendar discovery
//! - REPORT calendar-query with a time-range filter for the window listing
//! - DELETE and conditional PUT for the replace step
//!
//! # Example
//!
//! ```ignore
//! use campussync_providers::caldav::{CalDavConfig, resolve_calendar};
//!
//! let config = CalDavConfig::new("https://dav.example.com/", "me", "secret")?;
//! let calendar = resolve_calendar(config, "https://dav.example.com/calendars/me/uni/").await?;
//! ```

mod auth;
mod calendar;
mod client;
mod config;
mod xml;

pub use calendar::{CalDavCalendar, resolve_calendar};
pub use client::DavError;
pub use config::CalDavConfig;
