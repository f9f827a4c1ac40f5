//! Configuration loading and orchestration for the `campussync` binary.

pub mod cli;
pub mod config;
pub mod orchestrator;
pub mod secret;

pub use cli::Cli;
pub use config::{SyncConfig, SyncSettings};
