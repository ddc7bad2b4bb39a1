//! Venue casino server
//!
//! Serves the HTTP API, or writes a sample configuration file.

use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use venue_casino::{
    api::ApiServer,
    config::{generate_sample_config, ConfigLoader},
    engine::CasinoService,
};

#[derive(Parser)]
#[command(name = "venue-casino")]
#[command(about = "Player-owned casino venues with shortfall settlement")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging for the casino crate
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Write a sample configuration file
    SampleConfig {
        #[arg(default_value = "venue_casino.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "venue_casino=debug,tower_http=debug"
    } else {
        "venue_casino=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    match cli.command {
        Commands::SampleConfig { path } => {
            generate_sample_config(&path.to_string_lossy())?;
            info!("Sample configuration written to {}", path.display());
            Ok(())
        }
        Commands::Serve { port } => {
            let mut loader = ConfigLoader::new();
            if let Some(path) = &cli.config {
                loader = loader.with_path(path);
            }
            let mut config = loader.load()?;
            if let Some(port) = port {
                config.server.port = port;
            }

            let server_config = config.server.clone();
            let casino = Arc::new(CasinoService::open(config)?);
            ApiServer::new(server_config, casino).run().await
        }
    }
}
