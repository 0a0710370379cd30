//! Building-level load forecasting and LP-based schedule optimization.

pub mod config;
pub mod demo;
pub mod error;
/// Hourly aggregation, baseline profile, boosted model and blending.
pub mod forecast;
pub mod io;
/// Tariff and emission profiles, linear programs and result assembly.
pub mod optimize;
pub mod planner;
pub mod source;
pub mod types;

pub use config::EngineConfig;
pub use error::{EngineError, SourceError};
pub use planner::Planner;
pub use source::{InMemorySource, ReadingSource};
pub use types::{ForecastPoint, OptimizationMode, OptimizationRequest};
