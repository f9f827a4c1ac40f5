//! Core types: sync window, tracing setup

pub mod tracing;
pub mod window;

pub use crate::tracing::{TracingConfig, TracingError, TracingOutputFormat, build_dispatch};
pub use window::{SyncWindow, WindowError};
