//! Forecast-then-optimize pipeline for a single building.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::forecast::{building_series, hybrid_forecast};
use crate::optimize::{LpBackend, MicroLpBackend, OptimizationResult, ScheduleOptimizer, TariffRates};
use crate::source::ReadingSource;
use crate::types::{BuildingId, ForecastPoint, MAX_HOURS, OptimizationRequest};

/// Entry point for forecasting and schedule optimization.
///
/// Generic over `B: LpBackend` for static dispatch. Holds no per-request
/// state; every call recomputes the series, profile and model from scratch.
#[derive(Debug, Clone)]
pub struct Planner<B: LpBackend = MicroLpBackend> {
    config: EngineConfig,
    backend: B,
}

impl Planner<MicroLpBackend> {
    /// Creates a planner using the bundled simplex backend.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_backend(config, MicroLpBackend)
    }
}

impl Default for Planner<MicroLpBackend> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<B: LpBackend> Planner<B> {
    pub fn with_backend(config: EngineConfig, backend: B) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Forecasts `horizon` hours of demand for a building.
    ///
    /// Reads the building's active sensors over the configured lookback
    /// window ending at `now`. Returns an empty forecast when the building
    /// has no sensors or no readings in the window.
    ///
    /// # Errors
    ///
    /// * [`EngineError::InvalidRequest`] when `horizon` exceeds [`MAX_HOURS`]
    /// * reading-source failures
    pub fn forecast_building_energy<S: ReadingSource + ?Sized>(
        &self,
        source: &S,
        building_id: BuildingId,
        horizon: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<ForecastPoint>> {
        if horizon > MAX_HOURS {
            return Err(EngineError::InvalidRequest {
                field: "horizon",
                message: format!("must be at most {MAX_HOURS}, got {horizon}"),
            });
        }

        let lookback = TimeDelta::days(i64::from(self.config.forecast.lookback_days));
        let since = now
            .checked_sub_signed(lookback)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let series = building_series(source, building_id, since, now)?;
        let forecast = hybrid_forecast(&series, now, horizon, &self.config);
        debug!(building_id, horizon, points = forecast.len(), "forecast ready");
        Ok(forecast)
    }

    /// Forecasts the request's horizon and optimizes the resulting curve.
    ///
    /// # Errors
    ///
    /// * [`EngineError::InvalidRequest`] for out-of-range request fields
    /// * [`EngineError::NoData`] when the building yields no forecast
    /// * any error of [`Planner::optimize_forecast`]
    pub fn optimize_energy_schedule<S: ReadingSource + ?Sized>(
        &self,
        source: &S,
        request: &OptimizationRequest,
        now: DateTime<Utc>,
    ) -> Result<OptimizationResult> {
        request.validate()?;
        debug!(building_id = request.building_id, mode = %request.mode, "request received");

        let forecast = self.forecast_building_energy(source, request.building_id, request.hours, now)?;
        if forecast.is_empty() {
            return Err(EngineError::NoData {
                building_id: request.building_id,
            });
        }
        self.optimize_forecast(&forecast, request)
    }

    /// Optimizes an already computed forecast.
    ///
    /// The forecast is used as given (ordered by `horizon_index`); its
    /// length, not `request.hours`, defines the schedule horizon.
    ///
    /// # Errors
    ///
    /// * [`EngineError::NoData`] for an empty forecast
    /// * [`EngineError::InvalidRequest`] when a forecast value is negative or not finite
    /// * [`EngineError::ZeroBaseline`] when total forecast energy is not positive
    /// * [`EngineError::Infeasible`] / [`EngineError::Solver`] from the solve
    pub fn optimize_forecast(
        &self,
        forecast: &[ForecastPoint],
        request: &OptimizationRequest,
    ) -> Result<OptimizationResult> {
        request.validate()?;
        if forecast.is_empty() {
            return Err(EngineError::NoData {
                building_id: request.building_id,
            });
        }

        let mut points = forecast.to_vec();
        points.sort_by_key(|p| p.horizon_index);
        let baseline: Vec<f64> = points.iter().map(|p| p.predicted_value).collect();
        let timestamps: Vec<DateTime<Utc>> = points.iter().map(|p| p.timestamp).collect();

        if let Some(bad) = points
            .iter()
            .find(|p| !p.predicted_value.is_finite() || p.predicted_value < 0.0)
        {
            return Err(EngineError::InvalidRequest {
                field: "forecast",
                message: format!(
                    "predicted value at horizon {} must be finite and >= 0, got {}",
                    bad.horizon_index, bad.predicted_value
                ),
            });
        }

        let total: f64 = baseline.iter().sum();
        if total <= 0.0 {
            return Err(EngineError::ZeroBaseline { total });
        }

        let tariff = TariffRates::for_request(&self.config.tariff, request);
        let optimizer = ScheduleOptimizer::new(
            self.config.optimizer.service_factor,
            tariff,
            self.config.emissions.clone(),
        );
        let problem = optimizer.formulate(&baseline, &timestamps, request);
        let optimized = optimizer.solve(&self.backend, &problem, request)?;

        let result = OptimizationResult::assemble(
            request,
            &points,
            &optimized,
            optimizer.tariff(),
            optimizer.emissions(),
        );
        info!(
            building_id = result.building_id,
            mode = %result.mode,
            hours = result.hours,
            baseline_kwh = result.total_baseline_kwh,
            optimized_kwh = result.total_optimized_kwh,
            peak_kw = result.peak_optimized_kw,
            "schedule optimized"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::{LinearProgram, LpSolution, LpStatus};
    use crate::source::InMemorySource;
    use crate::types::OptimizationMode;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
    }

    fn flat(values: &[f64]) -> Vec<ForecastPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| ForecastPoint {
                horizon_index: i + 1,
                timestamp: now() + TimeDelta::hours(i as i64 + 1),
                predicted_value: v,
            })
            .collect()
    }

    struct AlwaysFails;

    impl LpBackend for AlwaysFails {
        fn name(&self) -> &'static str {
            "always-fails"
        }

        fn solve(&self, _program: &LinearProgram) -> LpSolution {
            LpSolution::without_values(LpStatus::Failed("numerical trouble".into()))
        }
    }

    #[test]
    fn planner_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Planner>();
    }

    #[test]
    fn empty_forecast_is_no_data() {
        let req = OptimizationRequest::new(9, 10.0, 24, OptimizationMode::Peak);
        let err = Planner::new(EngineConfig::default()).optimize_forecast(&[], &req);
        assert!(matches!(err, Err(EngineError::NoData { building_id: 9 })));
    }

    #[test]
    fn all_zero_forecast_is_zero_baseline() {
        let req = OptimizationRequest::new(1, 10.0, 3, OptimizationMode::Peak);
        let err = Planner::new(EngineConfig::default()).optimize_forecast(&flat(&[0.0; 3]), &req);
        assert!(matches!(err, Err(EngineError::ZeroBaseline { .. })));
    }

    #[test]
    fn invalid_request_rejected_before_solving() {
        let req = OptimizationRequest::new(1, 0.0, 3, OptimizationMode::Peak);
        let err = Planner::new(EngineConfig::default()).optimize_forecast(&flat(&[1.0; 3]), &req);
        assert!(matches!(
            err,
            Err(EngineError::InvalidRequest {
                field: "max_load_kw",
                ..
            })
        ));
    }

    #[test]
    fn unordered_forecast_is_sorted_by_horizon() {
        let mut points = flat(&[1.0, 2.0, 3.0]);
        points.reverse();
        let req = OptimizationRequest::new(1, 10.0, 3, OptimizationMode::Peak);
        let result = Planner::new(EngineConfig::default()).optimize_forecast(&points, &req);
        let baseline: Vec<f64> = result
            .map(|r| r.schedule.iter().map(|s| s.baseline_kw).collect())
            .unwrap_or_default();
        assert_eq!(baseline, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn backend_failure_surfaces_as_solver_error() {
        let planner = Planner::with_backend(EngineConfig::default(), AlwaysFails);
        let req = OptimizationRequest::new(1, 10.0, 3, OptimizationMode::Cost);
        let err = planner.optimize_forecast(&flat(&[1.0; 3]), &req);
        assert!(matches!(err, Err(EngineError::Solver(msg)) if msg == "numerical trouble"));
    }

    #[test]
    fn building_without_sensors_forecasts_empty_and_optimizes_to_no_data() {
        let source = InMemorySource::default();
        let planner = Planner::new(EngineConfig::default());
        let forecast = planner.forecast_building_energy(&source, 5, 24, now());
        assert!(forecast.is_ok_and(|f| f.is_empty()));

        let req = OptimizationRequest::new(5, 10.0, 24, OptimizationMode::Peak);
        let err = planner.optimize_energy_schedule(&source, &req, now());
        assert!(matches!(err, Err(EngineError::NoData { building_id: 5 })));
    }

    #[test]
    fn non_finite_forecast_value_is_rejected() {
        let req = OptimizationRequest::new(1, 10.0, 3, OptimizationMode::Peak);
        let err = Planner::new(EngineConfig::default())
            .optimize_forecast(&flat(&[f64::NAN, 5.0, 3.0]), &req);
        assert!(matches!(
            err,
            Err(EngineError::InvalidRequest {
                field: "forecast",
                ..
            })
        ));
    }

    #[test]
    fn negative_forecast_value_is_rejected() {
        let req = OptimizationRequest::new(1, 10.0, 2, OptimizationMode::Cost);
        let err = Planner::new(EngineConfig::default()).optimize_forecast(&flat(&[-3.0, 5.0]), &req);
        assert!(matches!(
            err,
            Err(EngineError::InvalidRequest {
                field: "forecast",
                ..
            })
        ));
    }

    #[test]
    fn horizon_beyond_limit_is_rejected() {
        let source = InMemorySource::default();
        let err = Planner::new(EngineConfig::default()).forecast_building_energy(
            &source,
            1,
            MAX_HOURS + 1,
            now(),
        );
        assert!(matches!(
            err,
            Err(EngineError::InvalidRequest {
                field: "horizon",
                ..
            })
        ));
    }

    #[test]
    fn forecast_near_end_of_time_range_does_not_panic() {
        let origin = DateTime::<Utc>::MAX_UTC - TimeDelta::hours(1);
        let mut source = InMemorySource::default();
        source.add_sensor(crate::types::Sensor {
            id: 1,
            building_id: 1,
            active: true,
        });
        source.extend_readings((1..=48).map(|h| crate::types::Reading {
            sensor_id: 1,
            timestamp: origin - TimeDelta::hours(h),
            value: 4.0,
        }));
        let forecast = Planner::new(EngineConfig::default())
            .forecast_building_energy(&source, 1, 3, origin)
            .unwrap_or_default();
        assert_eq!(forecast.len(), 1);
    }

    #[test]
    fn readings_after_now_are_not_history() {
        let mut source = InMemorySource::default();
        source.add_sensor(crate::types::Sensor {
            id: 1,
            building_id: 1,
            active: true,
        });
        source.extend_readings((1..=48).map(|h| crate::types::Reading {
            sensor_id: 1,
            timestamp: now() + TimeDelta::hours(h),
            value: 4.0,
        }));
        let forecast = Planner::new(EngineConfig::default()).forecast_building_energy(&source, 1, 3, now());
        assert!(forecast.is_ok_and(|f| f.is_empty()));
    }
}
