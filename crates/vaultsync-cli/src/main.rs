mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vaultsync",
    version,
    about = "SaaS backup connector engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backup job for a configured source
    Run {
        /// Path to source YAML file
        config: PathBuf,
    },
    /// Validate source configuration and connectivity
    Check {
        /// Path to source YAML file
        config: PathBuf,
    },
    /// List the endpoint catalog of a platform
    Endpoints {
        /// Platform type (e.g. "hubspot", "stripe")
        platform: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run { config } => commands::run::execute(&config).await,
        Commands::Check { config } => commands::check::execute(&config).await,
        Commands::Endpoints { platform } => commands::endpoints::execute(&platform),
    }
}
