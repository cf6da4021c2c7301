//! geolayer: fetch map layers from the command line.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use geolayer_core::Config;
use geolayer_service::{LayerPipeline, LayerRequest};

#[derive(Parser)]
#[command(name = "geolayer", about = "Aggregate public geodata into map layers", version)]
struct Cli {
    /// Path to a TOML config file (defaults to the user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a free-text request, e.g. "earthquakes near Tokyo".
    Ask {
        text: String,
    },

    /// Fetch one layer by source, location and data type.
    Fetch {
        #[arg(long)]
        source: String,

        #[arg(long)]
        location: String,

        #[arg(long, default_value = "population")]
        data_type: String,
    },

    /// Print the effective configuration.
    Config {
        /// Check the configuration and report errors and warnings.
        #[arg(long)]
        validate: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    geolayer_core::init()?;

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Config { validate: true } => {
            let validation = config.validate();
            for warning in &validation.warnings {
                println!("warning: {}", warning);
            }
            if !validation.is_valid() {
                bail!("Invalid configuration: {}", validation.error_summary());
            }
            println!("Configuration is valid");
        }
        Commands::Config { validate: false } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Ask { text } => {
            let (config, _) = config.into_validated()?;
            let pipeline = LayerPipeline::from_config(config)?;
            let response = pipeline.handle_message(&text).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Fetch {
            source,
            location,
            data_type,
        } => {
            let (config, _) = config.into_validated()?;
            let pipeline = LayerPipeline::from_config(config)?;
            let layer = pipeline
                .fetch_layer(&LayerRequest::new(source, location, data_type))
                .await;
            println!("{}", serde_json::to_string_pretty(&*layer)?);
        }
    }

    tracing::debug!("geolayer finished");
    Ok(())
}
