//! Hybrid demand forecasting: hour-of-day baseline blended with a boosted model.

pub mod aggregate;
pub mod baseline;
pub mod model;
mod tree;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

pub use aggregate::{building_series, hourly_series};
pub use baseline::BaselineProfile;
pub use model::DemandModel;

use crate::config::{EngineConfig, ForecastConfig};
use crate::types::{ForecastPoint, SeriesPoint, hour_of_day, weekday_index};

/// Fixed-weight blend of baseline profile and model prediction.
///
/// Weights are not renormalized when the model is untrained: the blend then
/// reduces to `baseline_weight * baseline`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastCombiner {
    pub baseline_weight: f64,
    pub model_weight: f64,
}

impl Default for ForecastCombiner {
    fn default() -> Self {
        Self::from_config(&ForecastConfig::default())
    }
}

impl ForecastCombiner {
    pub fn from_config(cfg: &ForecastConfig) -> Self {
        Self {
            baseline_weight: cfg.baseline_weight,
            model_weight: cfg.model_weight,
        }
    }

    /// Produces `horizon` hourly forecast points starting one hour after `now`.
    ///
    /// # Arguments
    ///
    /// * `profile` - Hour-of-day baseline
    /// * `model` - Trained model, or `None` when untrained
    /// * `now` - Forecast origin
    /// * `horizon` - Number of steps to forecast
    ///
    /// # Returns
    ///
    /// Points with `horizon_index` 1..=horizon and non-negative values. The
    /// forecast stops early at the last representable timestamp.
    pub fn combine(
        &self,
        profile: &BaselineProfile,
        model: Option<&DemandModel>,
        now: DateTime<Utc>,
        horizon: usize,
    ) -> Vec<ForecastPoint> {
        let model_weight = if model.is_some() {
            self.model_weight
        } else {
            0.0
        };

        (1..=horizon)
            .map_while(|step| {
                let offset = TimeDelta::try_hours(i64::try_from(step).ok()?)?;
                let timestamp = now.checked_add_signed(offset)?;
                let hour = hour_of_day(timestamp);
                let baseline = profile.at(hour);
                let predicted = model.map_or(0.0, |m| m.predict(hour, weekday_index(timestamp)));
                let value = self.baseline_weight * baseline + model_weight * predicted;
                Some(ForecastPoint {
                    horizon_index: step,
                    timestamp,
                    predicted_value: value.max(0.0),
                })
            })
            .collect()
    }
}

/// Runs profiling, training and blending over an already aggregated series.
///
/// An empty series yields an empty forecast.
pub fn hybrid_forecast(
    series: &[SeriesPoint],
    now: DateTime<Utc>,
    horizon: usize,
    config: &EngineConfig,
) -> Vec<ForecastPoint> {
    if series.is_empty() {
        return Vec::new();
    }

    let profile = BaselineProfile::from_series(series);
    let model = DemandModel::train(series, &config.model);
    debug!(
        points = series.len(),
        trained = model.is_some(),
        horizon,
        "building hybrid forecast"
    );

    ForecastCombiner::from_config(&config.forecast).combine(&profile, model.as_ref(), now, horizon)
}
