use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;

use geoaid::api::GeocodeClient;
use geoaid::config::{FileConfig, resolve_access_token};
use geoaid::enrich::{COURTESY_PAUSE, enrich_rows};
use geoaid::geojson::{feature_collection, write_feature_collection};
use geoaid::table::RowSet;

const GEOCODE_INPUT: &str = "aid.csv";
const GEOCODE_OUTPUT: &str = "aid_geocoded.csv";
const CONVERT_INPUT: &str = "all-aid-mapped.csv";
const CONVERT_OUTPUT: &str = "all-aid-mapped.geojson";

/// Geocode aid-location CSV files and export them as GeoJSON
///
/// Examples:
///   # Fill in missing Lat/Lon values in aid.csv via Mapbox
///   geoaid geocode
///
///   # Convert the default mapped CSV into GeoJSON
///   geoaid convert
///
///   # Convert a specific file
///   geoaid convert sites.csv sites.geojson
#[derive(Parser, Debug)]
#[command(name = "geoaid")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches geoaid.toml if not provided)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill in missing Lat/Lon values by geocoding each row's address
    Geocode,
    /// Convert a CSV file into a GeoJSON FeatureCollection
    Convert {
        /// Input CSV path (defaults to all-aid-mapped.csv)
        input: Option<PathBuf>,
        /// Output GeoJSON path (defaults to all-aid-mapped.geojson)
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let file_config = if let Some(ref config_path) = args.config {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .context(format!("Failed to read config file: {:?}", config_path))?;
            Some(toml::from_str(&contents).context("Failed to parse config file")?)
        } else {
            bail!("Config file not found: {:?}", config_path);
        }
    } else {
        FileConfig::load()
    };

    let verbose = args.verbose || file_config.as_ref().map(|c| c.verbose).unwrap_or(false);

    match args.command {
        Command::Geocode => run_geocode(file_config.as_ref(), verbose),
        Command::Convert { input, output } => {
            let input = input.unwrap_or_else(|| PathBuf::from(CONVERT_INPUT));
            let output = output.unwrap_or_else(|| PathBuf::from(CONVERT_OUTPUT));
            run_convert(&input, &output, verbose)
        }
    }
}

fn run_geocode(file_config: Option<&FileConfig>, verbose: bool) -> Result<()> {
    let total_start = Instant::now();

    let access_token = resolve_access_token(file_config)?;
    let mapbox_config = file_config
        .and_then(|c| c.mapbox.clone())
        .unwrap_or_default();

    let input = Path::new(GEOCODE_INPUT);
    let output = Path::new(GEOCODE_OUTPUT);
    if !input.exists() {
        bail!("Input CSV not found: {}", input.display());
    }

    if verbose {
        println!("Configuration:");
        println!("  Input: {}", input.display());
        println!("  Output: {}", output.display());
        println!("  Country scope: {}", mapbox_config.country);
        println!("  Max attempts: {}", mapbox_config.max_attempts);
        println!("  Request timeout: {}s", mapbox_config.timeout_secs);
        println!();
    }

    let mut rows = RowSet::read_from_path(input)?;
    let mut client = GeocodeClient::new(access_token, &mapbox_config)?;

    let spinner = create_spinner("Geocoding rows...");
    let start = Instant::now();
    let stats = enrich_rows(&mut rows, &mut client, COURTESY_PAUSE)?;
    spinner.finish_with_message(format!(
        "Geocoded {} of {} attempted rows [{:.1}s]",
        stats.updated,
        stats.attempted,
        start.elapsed().as_secs_f32()
    ));

    rows.write_to_path(output)?;

    println!(
        "Processed {} rows. Attempted geocoding {}, updated {}.",
        stats.total, stats.attempted, stats.updated
    );
    println!("Wrote: {}", output.display());
    if verbose {
        println!("Total time: {:.1}s", total_start.elapsed().as_secs_f32());
    }

    Ok(())
}

fn run_convert(input: &Path, output: &Path, verbose: bool) -> Result<()> {
    if !input.exists() {
        bail!("Input CSV not found: {}", input.display());
    }

    if verbose {
        println!("Configuration:");
        println!("  Input: {}", input.display());
        println!("  Output: {}", output.display());
        println!();
    }

    let rows = RowSet::read_from_path(input)?;
    let collection = feature_collection(&rows);
    write_feature_collection(output, &collection)?;

    println!(
        "Wrote GeoJSON with {} features to: {}",
        collection.len(),
        output.display()
    );

    Ok(())
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
