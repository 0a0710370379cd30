//! Plain value records flowing through forecasting and optimization.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, DurationRound, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub type BuildingId = u64;
pub type SensorId = u64;

/// Upper bound on the optimization horizon (one year of hourly steps).
pub const MAX_HOURS: usize = 8760;

/// A metering device attached to a building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: SensorId,
    pub building_id: BuildingId,
    /// Inactive sensors are ignored by aggregation.
    pub active: bool,
}

/// One raw energy reading as delivered by the data store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub sensor_id: SensorId,
    pub timestamp: DateTime<Utc>,
    /// Energy in kWh.
    pub value: f64,
}

/// One hour bucket of building-level demand.
///
/// Series are sparse: hours without readings are absent rather than zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Start of the hour bucket.
    pub timestamp: DateTime<Utc>,
    /// Summed energy of all active sensors in the bucket (kWh, >= 0).
    pub value: f64,
}

/// One step of a forward-looking demand forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// 1-based step index relative to the forecast origin.
    pub horizon_index: usize,
    pub timestamp: DateTime<Utc>,
    /// Predicted energy for the hour (kWh, >= 0).
    pub predicted_value: f64,
}

/// Optimization objective.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationMode {
    /// Minimize the maximum hourly load.
    #[default]
    Peak,
    /// Minimize tariff-weighted energy cost.
    Cost,
    /// Minimize grid-emission-weighted energy.
    Emissions,
}

impl OptimizationMode {
    pub const ALL: [Self; 3] = [Self::Peak, Self::Cost, Self::Emissions];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Peak => "peak",
            Self::Cost => "cost",
            Self::Emissions => "emissions",
        }
    }
}

impl fmt::Display for OptimizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "peak" => Ok(Self::Peak),
            "cost" => Ok(Self::Cost),
            "emissions" => Ok(Self::Emissions),
            _ => Err(EngineError::UnsupportedMode(s.to_string())),
        }
    }
}

/// Parameters of one schedule optimization call.
///
/// `day_tariff` and `night_tariff` fall back to the configured tariff
/// defaults (8.0 / 5.0) when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub building_id: BuildingId,
    pub max_load_kw: f64,
    pub hours: usize,
    #[serde(default)]
    pub mode: OptimizationMode,
    #[serde(default)]
    pub day_tariff: Option<f64>,
    #[serde(default)]
    pub night_tariff: Option<f64>,
}

impl OptimizationRequest {
    /// Creates a request using the default tariffs.
    pub fn new(
        building_id: BuildingId,
        max_load_kw: f64,
        hours: usize,
        mode: OptimizationMode,
    ) -> Self {
        Self {
            building_id,
            max_load_kw,
            hours,
            mode,
            day_tariff: None,
            night_tariff: None,
        }
    }

    /// Overrides both tariffs.
    pub fn with_tariffs(mut self, day_tariff: f64, night_tariff: f64) -> Self {
        self.day_tariff = Some(day_tariff);
        self.night_tariff = Some(night_tariff);
        self
    }

    /// Checks the field constraints before any forecasting work is done.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRequest`] naming the first offending field.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.max_load_kw.is_finite() || self.max_load_kw <= 0.0 {
            return Err(EngineError::InvalidRequest {
                field: "max_load_kw",
                message: format!("must be a finite value > 0, got {}", self.max_load_kw),
            });
        }
        if self.hours == 0 || self.hours > MAX_HOURS {
            return Err(EngineError::InvalidRequest {
                field: "hours",
                message: format!("must be in 1..={MAX_HOURS}, got {}", self.hours),
            });
        }
        for (field, tariff) in [
            ("day_tariff", self.day_tariff),
            ("night_tariff", self.night_tariff),
        ] {
            if let Some(t) = tariff.filter(|t| !t.is_finite() || *t < 0.0) {
                return Err(EngineError::InvalidRequest {
                    field,
                    message: format!("must be a finite value >= 0, got {t}"),
                });
            }
        }
        Ok(())
    }
}

/// Truncates a timestamp to the start of its hour.
pub fn floor_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(TimeDelta::hours(1)).unwrap_or(ts)
}

/// Hour of day in `0..24`.
pub fn hour_of_day(ts: DateTime<Utc>) -> usize {
    ts.hour() as usize
}

/// Day of week with Monday = 0 through Sunday = 6.
///
/// Training and prediction both go through this helper so the learned
/// mapping never sees two conventions.
pub fn weekday_index(ts: DateTime<Utc>) -> usize {
    ts.weekday().num_days_from_monday() as usize
}
