//! Optimized schedule assembly and summary metrics.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::{TariffRates, emission_factor_at, tariff_at};
use crate::config::EmissionConfig;
use crate::types::{BuildingId, ForecastPoint, OptimizationMode, OptimizationRequest};

/// One hour of the optimized schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    /// 0-based position in the horizon.
    pub hour_index: usize,
    pub timestamp: DateTime<Utc>,
    pub baseline_kw: f64,
    pub optimized_kw: f64,
}

/// Outcome of a successful optimization.
///
/// Totals are rounded to two decimals; per-hour schedule values are not.
/// Cost figures are only present in cost mode, emission figures only in
/// emissions mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub building_id: BuildingId,
    pub hours: usize,
    pub mode: OptimizationMode,
    pub total_baseline_kwh: f64,
    pub total_optimized_kwh: f64,
    pub estimated_cost_baseline: Option<f64>,
    pub estimated_cost_optimized: Option<f64>,
    pub estimated_emissions_baseline_kg: Option<f64>,
    pub estimated_emissions_optimized_kg: Option<f64>,
    pub peak_baseline_kw: f64,
    pub peak_optimized_kw: f64,
    pub schedule: Vec<ScheduleItem>,
}

/// Rounds to two decimals, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn weighted_total(items: &[ScheduleItem], weight: impl Fn(DateTime<Utc>) -> f64) -> (f64, f64) {
    items.iter().fold((0.0, 0.0), |(base, opt), item| {
        let w = weight(item.timestamp);
        (base + item.baseline_kw * w, opt + item.optimized_kw * w)
    })
}

fn peak(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(0.0, f64::max)
}

impl OptimizationResult {
    /// Pairs each forecast hour with its optimized load and computes totals.
    ///
    /// # Arguments
    ///
    /// * `request` - The request that produced `optimized`
    /// * `forecast` - Baseline forecast, in horizon order
    /// * `optimized` - Solver output, one value per forecast point
    /// * `tariff` - Rates used for cost figures
    /// * `emissions` - Factors used for emission figures
    pub fn assemble(
        request: &OptimizationRequest,
        forecast: &[ForecastPoint],
        optimized: &[f64],
        tariff: &TariffRates,
        emissions: &EmissionConfig,
    ) -> Self {
        let schedule: Vec<ScheduleItem> = forecast
            .iter()
            .zip(optimized)
            .enumerate()
            .map(|(hour_index, (point, &optimized_kw))| ScheduleItem {
                hour_index,
                timestamp: point.timestamp,
                baseline_kw: point.predicted_value,
                optimized_kw,
            })
            .collect();

        let total_baseline: f64 = schedule.iter().map(|s| s.baseline_kw).sum();
        let total_optimized: f64 = schedule.iter().map(|s| s.optimized_kw).sum();

        let (cost, co2) = match request.mode {
            OptimizationMode::Peak => (None, None),
            OptimizationMode::Cost => (
                Some(weighted_total(&schedule, |ts| tariff_at(ts, tariff))),
                None,
            ),
            OptimizationMode::Emissions => (
                None,
                Some(weighted_total(&schedule, |ts| emission_factor_at(ts, emissions))),
            ),
        };

        Self {
            building_id: request.building_id,
            hours: schedule.len(),
            mode: request.mode,
            total_baseline_kwh: round2(total_baseline),
            total_optimized_kwh: round2(total_optimized),
            estimated_cost_baseline: cost.map(|c| round2(c.0)),
            estimated_cost_optimized: cost.map(|c| round2(c.1)),
            estimated_emissions_baseline_kg: co2.map(|e| round2(e.0)),
            estimated_emissions_optimized_kg: co2.map(|e| round2(e.1)),
            peak_baseline_kw: round2(peak(schedule.iter().map(|s| s.baseline_kw))),
            peak_optimized_kw: round2(peak(schedule.iter().map(|s| s.optimized_kw))),
            schedule,
        }
    }

    pub fn optimized_loads(&self) -> Vec<f64> {
        self.schedule.iter().map(|s| s.optimized_kw).collect()
    }
}

impl fmt::Display for OptimizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Schedule Report ---")?;
        writeln!(f, "Building:              {}", self.building_id)?;
        writeln!(f, "Mode:                  {} ({} h)", self.mode, self.hours)?;
        writeln!(
            f,
            "Energy:                {:.2} kWh -> {:.2} kWh",
            self.total_baseline_kwh, self.total_optimized_kwh
        )?;
        write!(
            f,
            "Peak load:             {:.2} kW -> {:.2} kW",
            self.peak_baseline_kw, self.peak_optimized_kw
        )?;
        if let (Some(base), Some(opt)) = (self.estimated_cost_baseline, self.estimated_cost_optimized)
        {
            write!(f, "\nEstimated cost:        {base:.2} -> {opt:.2}")?;
        }
        if let (Some(base), Some(opt)) = (
            self.estimated_emissions_baseline_kg,
            self.estimated_emissions_optimized_kg,
        ) {
            write!(f, "\nEstimated emissions:   {base:.2} kg -> {opt:.2} kg")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TariffConfig;
    use chrono::{TimeDelta, TimeZone};

    fn forecast(values: &[f64]) -> Vec<ForecastPoint> {
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 5, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| ForecastPoint {
                horizon_index: i + 1,
                timestamp: now + TimeDelta::hours(i as i64 + 1),
                predicted_value: v,
            })
            .collect()
    }

    fn assemble(mode: OptimizationMode, base: &[f64], opt: &[f64]) -> OptimizationResult {
        let req = OptimizationRequest::new(3, 10.0, base.len(), mode);
        OptimizationResult::assemble(
            &req,
            &forecast(base),
            opt,
            &TariffRates::from_config(&TariffConfig::default()),
            &EmissionConfig::default(),
        )
    }

    #[test]
    fn round2_is_half_away_from_zero() {
        assert_eq!(round2(1.005_000_1), 1.01);
        assert_eq!(round2(2.344), 2.34);
        assert_eq!(round2(-0.125), -0.13);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn peak_mode_reports_no_cost_or_emissions() {
        let r = assemble(OptimizationMode::Peak, &[4.0, 6.0], &[4.5, 4.5]);
        assert_eq!(r.estimated_cost_baseline, None);
        assert_eq!(r.estimated_emissions_optimized_kg, None);
        assert_eq!(r.total_baseline_kwh, 10.0);
        assert_eq!(r.total_optimized_kwh, 9.0);
        assert_eq!(r.peak_baseline_kw, 6.0);
        assert_eq!(r.peak_optimized_kw, 4.5);
    }

    #[test]
    fn schedule_indices_are_zero_based() {
        let r = assemble(OptimizationMode::Peak, &[1.0, 2.0, 3.0], &[1.0, 1.0, 1.0]);
        let idx: Vec<_> = r.schedule.iter().map(|s| s.hour_index).collect();
        assert_eq!(idx, vec![0, 1, 2]);
        assert_eq!(r.schedule[2].baseline_kw, 3.0);
        assert_eq!(r.hours, 3);
    }

    #[test]
    fn cost_mode_prices_both_curves() {
        // Forecast starts at 06:00: hours 6,7 at night rate 5, 8,9 at day rate 8.
        let r = assemble(
            OptimizationMode::Cost,
            &[0.0, 0.0, 10.0, 10.0],
            &[9.0, 9.0, 0.0, 0.0],
        );
        assert_eq!(r.estimated_cost_baseline, Some(160.0));
        assert_eq!(r.estimated_cost_optimized, Some(90.0));
        assert_eq!(r.estimated_emissions_baseline_kg, None);
    }

    #[test]
    fn emissions_mode_weights_by_factor() {
        // Hours 6..=9 all sit in the 0.80 shoulder band.
        let r = assemble(OptimizationMode::Emissions, &[1.0; 4], &[0.9; 4]);
        assert_eq!(r.estimated_emissions_baseline_kg, Some(3.2));
        assert_eq!(r.estimated_emissions_optimized_kg, Some(2.88));
        assert_eq!(r.estimated_cost_optimized, None);
    }

    #[test]
    fn report_mentions_mode_specific_lines() {
        let text = assemble(OptimizationMode::Cost, &[1.0; 4], &[1.0; 4]).to_string();
        assert!(text.contains("Schedule Report"));
        assert!(text.contains("Estimated cost"));
        assert!(!text.contains("Estimated emissions"));
    }
}
