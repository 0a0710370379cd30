//! Error types for forecasting, optimization, and reading sources.

use thiserror::Error;

use crate::types::BuildingId;

/// Failures surfaced by [`Planner`](crate::planner::Planner) operations.
///
/// Every variant is a synchronous validation or solve failure. None of them
/// is retried internally and no partial schedule accompanies them.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no forecast data available for building {building_id}")]
    NoData { building_id: BuildingId },

    #[error("baseline forecast has zero total energy ({total:.3} kWh)")]
    ZeroBaseline { total: f64 },

    #[error("unsupported optimization mode: \"{0}\" (expected peak, cost or emissions)")]
    UnsupportedMode(String),

    #[error(
        "schedule is infeasible: {hours} h capped at {max_load_kw} kW cannot retain {required_kwh:.2} kWh"
    )]
    Infeasible {
        max_load_kw: f64,
        hours: usize,
        required_kwh: f64,
    },

    #[error("optimization failed: {0}")]
    Solver(String),

    #[error("invalid request field `{field}`: {message}")]
    InvalidRequest {
        field: &'static str,
        message: String,
    },

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Failures raised while loading or querying sensor readings.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("reading source I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("reading source CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid reading record on line {line}: {message}")]
    InvalidRecord { line: u64, message: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;
