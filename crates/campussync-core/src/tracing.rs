//! Logging setup for campussync.
//!
//! Instead of installing a process-wide subscriber, [`build_dispatch`] returns
//! a [`Dispatch`] that the caller attaches to the work it wants logged:
//!
//! ```ignore
//! use campussync_core::tracing::{build_dispatch, TracingConfig};
//! use tracing::instrument::WithSubscriber;
//!
//! let dispatch = build_dispatch(&TracingConfig::default())?;
//! run(config).with_subscriber(dispatch).await;
//! ```

use thiserror::Error;
use tracing::{Dispatch, Level};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Errors that can occur while building the log dispatcher.
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to parse env filter directive
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Compact single-line format (default)
    #[default]
    Compact,
    /// JSON lines, for log collectors
    Json,
}

/// Configuration for the log dispatcher
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// The default log level when RUST_LOG is not set
    pub default_level: Level,
    /// Output format for log messages
    pub output_format: TracingOutputFormat,
    /// Whether to include target (module path) in logs
    pub include_target: bool,
    /// Whether to include timestamps
    pub include_timestamp: bool,
    /// Custom env filter directive (overrides default_level if set)
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Compact,
            include_target: true,
            include_timestamp: true,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Set the default log level
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    /// Set the output format
    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set a custom env filter directive
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn filter(&self) -> Result<EnvFilter, TracingError> {
        if let Some(ref filter) = self.env_filter {
            return Ok(EnvFilter::try_new(filter)?);
        }
        Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_level.to_string())))
    }
}

/// Build a log dispatcher writing to stderr.
///
/// The `RUST_LOG` environment variable overrides the default level unless
/// an explicit filter was configured.
///
/// # Errors
///
/// Returns an error if the env filter directive is invalid.
pub fn build_dispatch(config: &TracingConfig) -> Result<Dispatch, TracingError> {
    let env_filter = config.filter()?;

    let dispatch = match config.output_format {
        TracingOutputFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(config.include_target);

            let layer = if config.include_timestamp {
                layer.boxed()
            } else {
                layer.without_time().boxed()
            };

            Dispatch::new(tracing_subscriber::registry().with(env_filter).with(layer))
        }
        TracingOutputFormat::Json => Dispatch::new(
            tracing_subscriber::registry().with(env_filter).with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(config.include_target),
            ),
        ),
    };

    Ok(dispatch)
}
