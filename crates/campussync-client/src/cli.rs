//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

/// campussync - Mirror your CampusOffice calendar into a CalDAV calendar
#[derive(Debug, Parser)]
#[command(name = "campussync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    pub config: PathBuf,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Write log lines as JSON
    #[arg(long)]
    pub json_log: bool,
}
