//! Hour-of-day average demand profile.

use serde::Serialize;

use crate::types::{SeriesPoint, hour_of_day};

pub const HOURS_PER_DAY: usize = 24;

/// Average historical demand for each hour of the day.
///
/// The array type pins the length at 24 slots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselineProfile([f64; HOURS_PER_DAY]);

impl Default for BaselineProfile {
    fn default() -> Self {
        Self([0.0; HOURS_PER_DAY])
    }
}

impl BaselineProfile {
    /// Builds the profile from a (possibly sparse) hourly series.
    ///
    /// Each slot is the mean of the points observed at that hour. Slots with
    /// no observations take the global mean of all points, and an empty
    /// series produces an all-zero profile.
    pub fn from_series(series: &[SeriesPoint]) -> Self {
        if series.is_empty() {
            return Self::default();
        }

        let mut totals = [0.0_f64; HOURS_PER_DAY];
        let mut counts = [0_usize; HOURS_PER_DAY];
        for p in series {
            let h = hour_of_day(p.timestamp);
            totals[h] += p.value;
            counts[h] += 1;
        }

        let global_mean = totals.iter().sum::<f64>() / series.len() as f64;

        let mut slots = [0.0_f64; HOURS_PER_DAY];
        for (h, slot) in slots.iter_mut().enumerate() {
            *slot = if counts[h] > 0 {
                totals[h] / counts[h] as f64
            } else {
                global_mean
            };
        }
        Self(slots)
    }

    /// Baseline value for an hour of the day (wraps past 23).
    pub fn at(&self, hour: usize) -> f64 {
        self.0[hour % HOURS_PER_DAY]
    }

    pub fn values(&self) -> &[f64; HOURS_PER_DAY] {
        &self.0
    }
}
