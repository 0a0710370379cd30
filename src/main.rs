//! loadshift entry point: CLI wiring around the forecast/optimize planner.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use loadshift::Planner;
use loadshift::config::EngineConfig;
use loadshift::demo::{Archetype, generate_building};
use loadshift::io::export::{
    export_forecast_csv, export_readings_csv, export_schedule_csv, write_readings_csv,
};
use loadshift::io::readings::load_readings_csv;
use loadshift::source::InMemorySource;
use loadshift::types::{BuildingId, OptimizationMode, OptimizationRequest, floor_to_hour};

#[derive(Parser)]
#[command(name = "loadshift")]
#[command(author, version, about = "Building load forecasting and schedule optimization")]
#[command(
    long_about = "Forecasts hourly building demand from meter readings and shifts it into a \
    feasible schedule that minimizes peak load, energy cost or emissions.\n\
    \nData sources (choose one):\n  \
    - CSV readings: --readings <path>\n  \
    - Synthetic building: --demo <archetype> (default: office)\n\
    \nExamples:\n  \
    loadshift forecast --horizon 48\n  \
    loadshift optimize --max-load-kw 40 --mode cost\n  \
    loadshift --readings meters.csv optimize --building 3 --max-load-kw 25 --json"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Engine configuration TOML file
    #[arg(long, global = true, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Built-in configuration preset (baseline, wide_tariff, strict_retention)
    #[arg(long, global = true)]
    preset: Option<String>,

    /// Readings CSV (sensor_id,building_id,timestamp,value[,active])
    #[arg(long, global = true, conflicts_with = "demo")]
    readings: Option<PathBuf>,

    /// Synthetic building archetype used when no readings file is given
    #[arg(long, global = true)]
    demo: Option<Archetype>,

    /// Seed for synthetic readings
    #[arg(long, global = true, default_value_t = 42)]
    seed: u64,

    /// Forecast origin as RFC 3339 (default: start of the current hour)
    #[arg(long, global = true)]
    now: Option<DateTime<Utc>>,

    /// Write the forecast, schedule or readings to this CSV file
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    /// Print JSON instead of a text report
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Forecast hourly demand for a building
    Forecast {
        #[arg(long, default_value_t = 1)]
        building: BuildingId,

        /// Number of hours to forecast
        #[arg(long, default_value_t = 24)]
        horizon: usize,
    },

    /// Forecast and optimize a building's load schedule
    Optimize {
        #[arg(long, default_value_t = 1)]
        building: BuildingId,

        /// Hourly load cap (kW)
        #[arg(long)]
        max_load_kw: f64,

        /// Schedule horizon in hours
        #[arg(long, default_value_t = 24)]
        hours: usize,

        /// Objective: peak, cost or emissions
        #[arg(long, default_value = "peak")]
        mode: OptimizationMode,

        /// Day tariff override (price per kWh)
        #[arg(long)]
        day_tariff: Option<f64>,

        /// Night tariff override (price per kWh)
        #[arg(long)]
        night_tariff: Option<f64>,
    },

    /// Generate synthetic readings for a demo building
    Demo {
        #[arg(long, default_value_t = 1)]
        building: BuildingId,

        /// Days of history to generate
        #[arg(long, default_value_t = 14)]
        days: u32,
    },
}

fn load_config(global: &GlobalArgs) -> Result<EngineConfig> {
    let config = if let Some(path) = &global.config {
        EngineConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?
    } else if let Some(name) = &global.preset {
        EngineConfig::from_preset(name)?
    } else {
        EngineConfig::baseline()
    };

    let errors = config.validate();
    if !errors.is_empty() {
        let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
        bail!("invalid configuration:\n  {}", joined.join("\n  "));
    }
    Ok(config)
}

fn load_source(
    global: &GlobalArgs,
    building: BuildingId,
    lookback_days: u32,
    now: DateTime<Utc>,
) -> Result<InMemorySource> {
    if let Some(path) = &global.readings {
        let source = load_readings_csv(path)
            .with_context(|| format!("reading {}", path.display()))?;
        info!(
            path = %path.display(),
            sensors = source.sensors().len(),
            readings = source.readings().len(),
            "loaded readings"
        );
        return Ok(source);
    }

    let archetype = global.demo.unwrap_or_default();
    info!(%archetype, building, seed = global.seed, "using synthetic readings");
    Ok(generate_building(archetype, building, lookback_days, now, global.seed)?.into_source())
}

fn write_out(path: &Path, result: std::io::Result<()>) -> Result<()> {
    result.with_context(|| format!("writing {}", path.display()))?;
    eprintln!("Written to {}", path.display());
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let global = &cli.global;
    let config = load_config(global)?;
    let now = global.now.unwrap_or_else(|| floor_to_hour(Utc::now()));
    let lookback_days = config.forecast.lookback_days;
    let planner = Planner::new(config);

    match cli.command {
        Command::Forecast { building, horizon } => {
            let source = load_source(global, building, lookback_days, now)?;
            let forecast = planner
                .forecast_building_energy(&source, building, horizon, now)
                .context("forecasting building energy")?;

            if global.json {
                println!("{}", serde_json::to_string_pretty(&forecast)?);
            } else if forecast.is_empty() {
                println!("No readings for building {building}; forecast is empty.");
            } else {
                for p in &forecast {
                    println!(
                        "{:>4}  {}  {:>10.3} kWh",
                        p.horizon_index,
                        p.timestamp.format("%Y-%m-%d %H:%M"),
                        p.predicted_value
                    );
                }
            }
            if let Some(path) = &global.out {
                write_out(path, export_forecast_csv(&forecast, path))?;
            }
        }
        Command::Optimize {
            building,
            max_load_kw,
            hours,
            mode,
            day_tariff,
            night_tariff,
        } => {
            let source = load_source(global, building, lookback_days, now)?;
            let request = OptimizationRequest {
                building_id: building,
                max_load_kw,
                hours,
                mode,
                day_tariff,
                night_tariff,
            };
            let result = planner
                .optimize_energy_schedule(&source, &request, now)
                .context("optimizing energy schedule")?;

            if global.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{result}");
            }
            if let Some(path) = &global.out {
                write_out(path, export_schedule_csv(&result.schedule, path))?;
            }
        }
        Command::Demo { building, days } => {
            let archetype = global.demo.unwrap_or_default();
            let demo = generate_building(archetype, building, days, now, global.seed)?;
            match &global.out {
                Some(path) => write_out(
                    path,
                    export_readings_csv(&demo.sensors, &demo.readings, path),
                )?,
                None => write_readings_csv(&demo.sensors, &demo.readings, std::io::stdout().lock())?,
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}
