//! Load-shifting linear program: formulation and solution extraction.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::lp::{LinearProgram, LpBackend, LpStatus, Relation, VarId};
use super::profile::{TariffRates, emission_profile, tariff_profile};
use crate::config::EmissionConfig;
use crate::error::EngineError;
use crate::types::{OptimizationMode, OptimizationRequest};

/// A formulated program plus the handles needed to read its solution.
#[derive(Debug, Clone)]
pub struct LoadShiftProblem {
    pub program: LinearProgram,
    /// One load variable per hour, in horizon order.
    pub loads: Vec<VarId>,
    /// Auxiliary peak variable (peak mode only).
    pub peak: Option<VarId>,
    /// Energy the schedule must retain (kWh).
    pub required_kwh: f64,
}

/// Builds and solves the load-shifting program for one request.
///
/// The schedule may move, flatten or compress the forecast curve, but keeps
/// at least `service_factor` of its total energy, every hour bounded by
/// `[0, max_load_kw]`.
#[derive(Debug, Clone)]
pub struct ScheduleOptimizer {
    service_factor: f64,
    tariff: TariffRates,
    emissions: EmissionConfig,
}

impl ScheduleOptimizer {
    pub fn new(service_factor: f64, tariff: TariffRates, emissions: EmissionConfig) -> Self {
        Self {
            service_factor,
            tariff,
            emissions,
        }
    }

    pub fn tariff(&self) -> &TariffRates {
        &self.tariff
    }

    pub fn emissions(&self) -> &EmissionConfig {
        &self.emissions
    }

    /// Formulates the program for a baseline curve and its hour timestamps.
    ///
    /// # Arguments
    ///
    /// * `baseline` - Forecast load per hour (kW, one-hour buckets)
    /// * `timestamps` - Timestamp of each baseline hour
    /// * `request` - Load cap and objective
    pub fn formulate(
        &self,
        baseline: &[f64],
        timestamps: &[DateTime<Utc>],
        request: &OptimizationRequest,
    ) -> LoadShiftProblem {
        let mut program = LinearProgram::new();
        let loads: Vec<VarId> = (0..baseline.len())
            .map(|t| program.add_variable(format!("load_{t}"), 0.0, Some(request.max_load_kw)))
            .collect();

        let required_kwh = self.service_factor * baseline.iter().sum::<f64>();
        program.add_constraint(
            loads.iter().map(|&x| (x, 1.0)).collect(),
            Relation::GreaterEq,
            required_kwh,
        );

        let peak = match request.mode {
            OptimizationMode::Peak => {
                let p = program.add_variable("peak_load", 0.0, None);
                for &x in &loads {
                    program.add_constraint(vec![(x, 1.0), (p, -1.0)], Relation::LessEq, 0.0);
                }
                program.minimize(vec![(p, 1.0)]);
                Some(p)
            }
            OptimizationMode::Cost => {
                let weights = tariff_profile(timestamps, &self.tariff);
                program.minimize(loads.iter().copied().zip(weights).collect());
                None
            }
            OptimizationMode::Emissions => {
                let weights = emission_profile(timestamps, &self.emissions);
                program.minimize(loads.iter().copied().zip(weights).collect());
                None
            }
        };

        debug!(
            mode = %request.mode,
            hours = loads.len(),
            variables = program.num_variables(),
            constraints = program.constraints().len(),
            required_kwh,
            "formulated load-shift program"
        );

        LoadShiftProblem {
            program,
            loads,
            peak,
            required_kwh,
        }
    }

    /// Solves a formulated problem and returns the optimized load per hour.
    ///
    /// Values are clamped into `[0, max_load_kw]` to strip solver round-off.
    ///
    /// # Errors
    ///
    /// [`EngineError::Infeasible`] when no schedule satisfies the bounds and
    /// the energy floor, [`EngineError::Solver`] for any other non-optimal
    /// termination.
    pub fn solve<B: LpBackend + ?Sized>(
        &self,
        backend: &B,
        problem: &LoadShiftProblem,
        request: &OptimizationRequest,
    ) -> Result<Vec<f64>, EngineError> {
        let solution = backend.solve(&problem.program);
        debug!(backend = backend.name(), status = ?solution.status, "solver finished");

        match solution.status {
            LpStatus::Optimal => problem
                .loads
                .iter()
                .map(|&x| {
                    solution
                        .value(x)
                        .map(|v| v.clamp(0.0, request.max_load_kw))
                        .ok_or_else(|| {
                            EngineError::Solver(format!(
                                "{} returned no value for variable {}",
                                backend.name(),
                                x.index()
                            ))
                        })
                })
                .collect(),
            LpStatus::Infeasible => Err(EngineError::Infeasible {
                max_load_kw: request.max_load_kw,
                hours: problem.loads.len(),
                required_kwh: problem.required_kwh,
            }),
            LpStatus::Unbounded => Err(EngineError::Solver(format!(
                "{} reported an unbounded program",
                backend.name()
            ))),
            LpStatus::Failed(reason) => Err(EngineError::Solver(reason)),
        }
    }
}
