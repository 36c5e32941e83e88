use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use pantryfinder::{
    FinderService, OpenCageGeocoder, PantryFinderConfig, PantryFinderError, ReferenceData,
    Strategy, logging, web,
};

#[derive(Parser, Debug)]
#[command(name = "pantryfinder")]
#[command(about = "Find the food assistance agencies nearest to an address")]
#[command(version)]
struct Cli {
    /// Config file path (defaults to <config dir>/pantryfinder/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up agencies near one address
    Find {
        /// Street address, or "lat,lon"
        #[arg(short, long)]
        address: String,

        /// geometric or tract-routed (overrides search.strategy)
        #[arg(short, long)]
        strategy: Option<Strategy>,

        #[arg(short = 'n', long)]
        max_results: Option<u32>,

        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,

        /// Write the map points to this GeoJSON file
        #[arg(long)]
        map_geojson: Option<PathBuf>,
    },
    /// Serve the search API over HTTP
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<PantryFinderError>() {
                Some(error) => eprintln!("Error: {}", error.user_message()),
                None => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = PantryFinderConfig::load_from_path(cli.config)?;
    logging::init(&config.logging, cli.verbose)?;
    debug!("Configuration loaded");

    match cli.command {
        Command::Find {
            address,
            strategy,
            max_results,
            json,
            map_geojson,
        } => {
            if let Some(max_results) = max_results {
                if !(1..=100).contains(&max_results) {
                    return Err(PantryFinderError::validation(
                        "--max-results must be between 1 and 100",
                    )
                    .into());
                }
                config.search.max_results = max_results;
            }

            let finder = build_finder(&config)?;
            let outcome = finder.search(&address, strategy).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print!("{outcome}");
            }

            if let Some(path) = map_geojson {
                let collection = outcome.map.to_geojson();
                fs::write(&path, serde_json::to_string_pretty(&collection)?)
                    .with_context(|| format!("Failed to write map to {}", path.display()))?;
                info!("Wrote {} map points to {}", collection.features.len(), path.display());
            }
        }
        Command::Serve { port } => {
            let finder = Arc::new(build_finder(&config)?);
            web::run(port.unwrap_or(config.server.port), finder).await?;
        }
    }

    Ok(())
}

fn build_finder(config: &PantryFinderConfig) -> Result<FinderService> {
    let data = Arc::new(ReferenceData::load(&config.data)?);
    let finder = FinderService::new(
        data,
        config.search.resolver_options(),
        config.map.clone(),
    );

    Ok(match config.geocoding.api_key {
        Some(_) => finder.with_geocoder(Arc::new(OpenCageGeocoder::new(&config.geocoding)?)),
        None => {
            info!("No geocoding API key configured; only 'lat,lon' input can be searched");
            finder
        }
    })
}
