//! Robot navigation daemon entry point.
//!
//! Binds the configured listen address, installs a `tracing` subscriber, and
//! accepts connections forever (spec.md §6). All protocol logic lives in
//! [`robotd`]; this file is just start-up glue.

use std::process::ExitCode;

use robotd::config::Config;
use robotd::server;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    match server::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "failed to start robot daemon");
            ExitCode::FAILURE
        }
    }
}
