//! Time-of-day price and grid carbon-intensity lookups.

use chrono::{DateTime, Timelike, Utc};

use crate::config::{EmissionConfig, TariffConfig};
use crate::types::OptimizationRequest;

/// Resolved two-level tariff for one optimization call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TariffRates {
    pub day: f64,
    pub night: f64,
    pub day_start_hour: u32,
    pub day_end_hour: u32,
}

impl TariffRates {
    pub fn from_config(cfg: &TariffConfig) -> Self {
        Self {
            day: cfg.day_tariff,
            night: cfg.night_tariff,
            day_start_hour: cfg.day_start_hour,
            day_end_hour: cfg.day_end_hour,
        }
    }

    /// Applies the request's tariff overrides on top of the configured defaults.
    pub fn for_request(cfg: &TariffConfig, request: &OptimizationRequest) -> Self {
        let base = Self::from_config(cfg);
        Self {
            day: request.day_tariff.unwrap_or(base.day),
            night: request.night_tariff.unwrap_or(base.night),
            ..base
        }
    }

    pub fn rate_for_hour(&self, hour: u32) -> f64 {
        if (self.day_start_hour..self.day_end_hour).contains(&hour) {
            self.day
        } else {
            self.night
        }
    }
}

/// Price per kWh at `ts`.
pub fn tariff_at(ts: DateTime<Utc>, rates: &TariffRates) -> f64 {
    rates.rate_for_hour(ts.hour())
}

/// kg CO2 per kWh for an hour of day.
pub fn emission_factor_for_hour(hour: u32, cfg: &EmissionConfig) -> f64 {
    cfg.bands
        .iter()
        .find(|band| band.contains(hour))
        .map_or(cfg.fallback_factor, |band| band.factor)
}

/// kg CO2 per kWh at `ts`.
pub fn emission_factor_at(ts: DateTime<Utc>, cfg: &EmissionConfig) -> f64 {
    emission_factor_for_hour(ts.hour(), cfg)
}

pub fn tariff_profile(timestamps: &[DateTime<Utc>], rates: &TariffRates) -> Vec<f64> {
    timestamps.iter().map(|&ts| tariff_at(ts, rates)).collect()
}

pub fn emission_profile(timestamps: &[DateTime<Utc>], cfg: &EmissionConfig) -> Vec<f64> {
    timestamps
        .iter()
        .map(|&ts| emission_factor_at(ts, cfg))
        .collect()
}
