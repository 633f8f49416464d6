//! Command-line interface for `zarrsrs`, which reports Zarr rasters with the
//! spatial reference recorded in their own metadata.
//!
//! This binary wires the [`zarrsrs_zarr`] driver, the [`zarrsrs_core`] SRS
//! modifier and the [`zarrsrs_proj`] backend into the process-wide driver
//! registry, then dispatches to command handlers.
//!
//! # Architecture
//!
//! The CLI is built using [`clap`] for argument parsing and [`tracing`] for structured logging.
//! Library crates log through the `log` facade; those records are bridged into `tracing`.
//!
//! # Available Commands
//!
//! - `info` - Display dataset information, including the resolved CRS
//! - `drivers` - List all registered drivers and their capabilities

mod display;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{Level, debug, info};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use zarrsrs_core::config::SrsModifierConfig;
use zarrsrs_core::driver::register_srs_modifier;
use zarrsrs_core::error::SrsModifierError;
use zarrsrs_core::operations;
use zarrsrs_core_common::{DriverRegistry, driver_registry};
use zarrsrs_proj::ProjSrsFactory;
use zarrsrs_zarr::register_zarr;

#[derive(Parser)]
#[command(
    name = "zarrsrs",
    version,
    about = "Inspect Zarr rasters with the CRS recorded in their metadata",
    long_about = "zarrsrs opens Zarr arrays through an SRS-modifying driver that reads the\n\
                  _CRS (url, wkt, projjson) and horizontal_CRS_code attributes and reports\n\
                  the resulting spatial reference."
)]
/// Command-line arguments and options for the `zarrsrs` CLI.
///
/// Global flags control logging verbosity and the SRS modifier configuration.
/// Configuration flags override the matching `ZARR_SRS_*` environment variables.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long, global = true)]
    debug: bool,

    /// Transform applied after resolution: NONE or `EPSG_OVERRIDE`.
    #[arg(long, global = true, value_name = "TYPE")]
    transform_type: Option<String>,

    /// EPSG code used by `EPSG_OVERRIDE`.
    #[arg(long, global = true, value_name = "CODE")]
    target_epsg: Option<u32>,

    /// Promote per-format CRS diagnostics to DEBUG level.
    #[arg(long, global = true)]
    srs_debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the `zarrsrs` CLI.
#[derive(Subcommand)]
enum Commands {
    /// Displays information about a Zarr raster.
    ///
    /// Shows the driver that opened it, its dimensions and bands, the
    /// resolved spatial reference and where it came from, and its metadata.
    Info {
        /// Path to the Zarr array or group.
        #[arg(value_name = "DATASET")]
        input: PathBuf,

        /// Force a driver by short name instead of letting the registry choose.
        #[arg(long, value_name = "DRIVER")]
        driver: Option<String>,

        /// Print the information as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Lists all registered drivers and their capabilities.
    Drivers,
}

/// Entry point for the `zarrsrs` command-line interface.
///
/// Failures are reported on stderr with a recovery suggestion when one is
/// known, and the process exits with status 1.
fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(err);
            ExitCode::FAILURE
        },
    }
}

fn report_failure(err: anyhow::Error) {
    debug!("Command failed: {err:?}");
    let err = SrsModifierError::classify(err);
    eprintln!("{}", err.user_message());
    if let Some(suggestion) = err.recovery_suggestion() {
        eprintln!("\nSuggestion: {suggestion}");
    }
}

fn run(cli: Cli) -> Result<()> {
    // Setup logging based on verbosity flags
    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true) // Show module paths for better context
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = build_config(&cli)?;
    let registry = driver_registry();
    register_drivers(registry, config)?;

    match cli.command {
        Commands::Info {
            input,
            driver,
            json,
        } => {
            info!("Displaying info for {}", input.display());
            handle_info(registry, &input, driver.as_deref(), json)?;
        },
        Commands::Drivers => {
            handle_drivers(registry);
        },
    }

    Ok(())
}

/// Environment configuration with command-line overrides applied.
fn build_config(cli: &Cli) -> Result<SrsModifierConfig> {
    let mut config = SrsModifierConfig::from_env()?;
    if let Some(transform_type) = &cli.transform_type {
        config.transform_type = transform_type.parse()?;
    }
    if let Some(target_epsg) = cli.target_epsg {
        config.target_epsg = target_epsg;
    }
    if cli.srs_debug {
        config.debug = true;
    }
    config.validate()?;
    debug!("Using {config:?}");
    Ok(config)
}

fn register_drivers(registry: &DriverRegistry, config: SrsModifierConfig) -> Result<()> {
    register_zarr(registry);
    register_srs_modifier(registry, Arc::new(ProjSrsFactory::new()), config)?;
    Ok(())
}

fn handle_info(
    registry: &DriverRegistry,
    input: &Path,
    driver: Option<&str>,
    json: bool,
) -> Result<()> {
    let info = operations::dataset_info(registry, input, driver)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print!("{}", display::format_dataset_info(&info));
    }
    Ok(())
}

/// Handles the `drivers` subcommand by displaying a formatted table of registered drivers.
fn handle_drivers(registry: &DriverRegistry) {
    let drivers = registry.drivers();
    println!("\nAvailable Drivers ({} total):\n", drivers.len());
    println!("{}", display::drivers_table(&drivers));
}
