//! campussync CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing::instrument::WithSubscriber;

use campussync_client::Cli;
use campussync_client::orchestrator;
use campussync_core::tracing::{TracingConfig, TracingOutputFormat, build_dispatch};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut log_config = TracingConfig::default();
    if cli.debug {
        log_config = log_config.with_env_filter(Level::DEBUG.to_string());
    }
    if cli.json_log {
        log_config = log_config.with_format(TracingOutputFormat::Json);
    }
    let dispatch = match build_dispatch(&log_config) {
        Ok(dispatch) => dispatch,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    async move {
        let result = orchestrator::execute(&cli.config).await;
        orchestrator::report(&result)
    }
    .with_subscriber(dispatch)
    .await
}
