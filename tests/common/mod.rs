//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use loadshift::demo::{Archetype, generate_building};
use loadshift::source::InMemorySource;
use loadshift::types::{BuildingId, ForecastPoint, Reading, Sensor};

/// Fixed forecast origin: Monday 2024-03-18 00:00 UTC.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 18, 0, 0, 0).unwrap()
}

/// Forecast whose first point sits at `now()` 00:00, so index `i` is hour `i`.
pub fn forecast_from_midnight(values: &[f64]) -> Vec<ForecastPoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, &predicted_value)| ForecastPoint {
            horizon_index: i + 1,
            timestamp: now() + TimeDelta::hours(i as i64),
            predicted_value,
        })
        .collect()
}

/// Two weeks of synthetic office readings ending at `now()`.
pub fn office_source(building_id: BuildingId) -> InMemorySource {
    generate_building(Archetype::Office, building_id, 14, now(), 42)
        .unwrap_or_else(|e| panic!("demo generation failed: {e}"))
        .into_source()
}

/// One active sensor reading `kwh` every hour for `days` days before `now()`.
pub fn constant_source(building_id: BuildingId, kwh: f64, days: i64) -> InMemorySource {
    let sensor_id = building_id * 100;
    let readings = (1..=days * 24).map(|h| Reading {
        sensor_id,
        timestamp: now() - TimeDelta::hours(h),
        value: kwh,
    });
    let mut source = InMemorySource::default();
    source.add_sensor(Sensor {
        id: sensor_id,
        building_id,
        active: true,
    });
    source.extend_readings(readings);
    source
}

/// Sum of optimized loads.
pub fn total(values: &[f64]) -> f64 {
    values.iter().sum()
}
