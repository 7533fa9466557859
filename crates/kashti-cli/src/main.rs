//! kashti CI CLI tool.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "kashti-ci")]
#[command(about = "kashti CI event routing and pipeline execution", long_about = None)]
struct Cli {
    /// Path to the project configuration file
    #[arg(long, env = "KASHTI_CONFIG", default_value = "kashti.kdl")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Route an event and print the resulting pipeline
    Route {
        /// Path to an event envelope JSON file ("-" for stdin)
        #[arg(long)]
        event: String,
    },
    /// Route an event and execute the pipeline with the dry-run executor
    Run {
        /// Path to an event envelope JSON file ("-" for stdin)
        #[arg(long)]
        event: String,
        /// Job names that should simulate failure
        #[arg(long)]
        fail: Vec<String>,
    },
    /// Validate a project configuration file
    Validate {
        /// Path to the configuration file
        #[arg(default_value = "kashti.kdl")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Route { event } => {
            commands::route(&cli.config, &event)?;
        }
        Commands::Run { event, fail } => {
            commands::run(&cli.config, &event, fail).await?;
        }
        Commands::Validate { path } => {
            commands::validate(&path)?;
        }
    }

    Ok(())
}
