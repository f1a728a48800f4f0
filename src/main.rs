mod auth;
mod cli;
mod config;
mod error;
mod logging;
mod output;
mod providers;
mod report;
mod workflow;

use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use log::{debug, error, info, warn};
use logging::LogSink;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match logging::init(cli.log_file()) {
        Ok(LogSink::File(path)) => debug!("Logging to {}", path.display()),
        Ok(LogSink::StderrOnly(e)) => warn!("Logging to stderr only: {e:#}"),
        Err(e) => eprintln!("Failed to set up logging: {e:#}"),
    }

    output::print_banner();

    info!("Starting prev-updater");
    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
