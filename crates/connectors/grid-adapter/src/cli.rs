//! The command line of the `grid-adapter` binary.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info_span, Instrument};

use grid_adapter_configuration as configuration;
use grid_adapter_configuration::environment::Environment;

use crate::grid::GridAdapter;
use crate::{routes, state};

/// Serve w2ui grids from a SQLite database.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// The directory holding `configuration.json`.
    #[arg(
        long,
        env = "GRID_ADAPTER_CONFIGURATION",
        value_name = "DIRECTORY",
        default_value = "."
    )]
    pub configuration: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Write an empty configuration and its JSON schema.
    Initialize,
    /// Introspect the database and refresh the table metadata, keeping the grids.
    Update,
    /// Serve the configured grids over HTTP.
    Serve {
        #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
        host: IpAddr,
        #[arg(long, env = "PORT", default_value_t = 8080)]
        port: u16,
    },
}

/// Run a command against a configuration directory.
pub async fn run(
    command: Command,
    configuration_dir: &Path,
    environment: impl Environment,
) -> anyhow::Result<()> {
    match command {
        Command::Initialize => initialize(configuration_dir).await,
        Command::Update => update(configuration_dir, environment).await,
        Command::Serve { host, port } => {
            serve(configuration_dir, environment, SocketAddr::new(host, port)).await
        }
    }
}

async fn initialize(configuration_dir: &Path) -> anyhow::Result<()> {
    let configuration_file = configuration_dir.join(configuration::CONFIGURATION_FILENAME);
    if tokio::fs::try_exists(&configuration_file).await? {
        anyhow::bail!(
            "a configuration already exists at {}",
            configuration_file.display()
        );
    }
    configuration::write_parsed_configuration(
        configuration::ParsedConfiguration::initial(),
        configuration_dir,
    )
    .await?;
    tracing::info!(path = %configuration_dir.display(), "configuration initialized");
    Ok(())
}

async fn update(configuration_dir: &Path, environment: impl Environment) -> anyhow::Result<()> {
    let parsed = configuration::parse_configuration(configuration_dir).await?;
    let updated = configuration::configure(&parsed, environment)
        .instrument(info_span!("Introspect database"))
        .await?;
    if updated == parsed {
        tracing::info!("configuration is up to date");
        return Ok(());
    }
    configuration::write_parsed_configuration(updated, configuration_dir).await?;
    tracing::info!(path = %configuration_dir.display(), "configuration updated");
    Ok(())
}

async fn serve(
    configuration_dir: &Path,
    environment: impl Environment,
    address: SocketAddr,
) -> anyhow::Result<()> {
    let parsed = configuration::parse_configuration(configuration_dir)
        .instrument(info_span!("parse configuration"))
        .await?;
    let configuration = configuration::make_runtime_configuration(parsed, environment)?;
    let state = state::create_state(&configuration).await?;

    let adapter = GridAdapter::new(Arc::new(configuration), Arc::new(state));
    let router = routes::create_router(adapter);

    tracing::info!(%address, "starting server");
    axum::Server::try_bind(&address)?
        .serve(router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(body = %err, "unable to listen for the shutdown signal");
    }
}
