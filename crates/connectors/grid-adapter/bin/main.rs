use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use grid_adapter::cli::{self, Cli};
use grid_adapter_configuration::environment::ProcessEnvironment;

#[tokio::main]
pub async fn main() -> ExitCode {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match cli::run(args.command, &args.configuration, ProcessEnvironment).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error:#}");
            ExitCode::FAILURE
        }
    }
}
