//! Constrained load-shifting over a forecast horizon.

pub mod lp;
pub mod microlp;
pub mod profile;
pub mod result;
pub mod schedule;

pub use lp::{LinearProgram, LpBackend, LpSolution, LpStatus};
pub use microlp::MicroLpBackend;
pub use profile::TariffRates;
pub use result::{OptimizationResult, ScheduleItem};
pub use schedule::ScheduleOptimizer;
