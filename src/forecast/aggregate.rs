//! Hourly aggregation of raw sensor readings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::source::ReadingSource;
use crate::types::{BuildingId, Reading, SeriesPoint, floor_to_hour};

/// Reads every active sensor of `building_id` over `since..=until` and sums
/// the readings into one building-level series.
///
/// Readings stamped after `until` are not history and are dropped.
///
/// An empty result (no active sensors, or no readings in the window) is a
/// normal outcome, not an error.
///
/// # Errors
///
/// Propagates failures of the underlying [`ReadingSource`].
pub fn building_series<S: ReadingSource + ?Sized>(
    source: &S,
    building_id: BuildingId,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<SeriesPoint>, SourceError> {
    let sensor_ids = source.list_active_sensors(building_id)?;
    if sensor_ids.is_empty() {
        debug!(building_id, "no active sensors");
        return Ok(Vec::new());
    }

    let mut readings = source.read_energy_readings(&sensor_ids, since)?;
    readings.retain(|r| r.timestamp <= until);
    let series = hourly_series(&readings);
    debug!(
        building_id,
        sensors = sensor_ids.len(),
        readings = readings.len(),
        buckets = series.len(),
        "aggregated building series"
    );
    Ok(series)
}

/// Floors each reading to its hour and sums readings sharing a bucket.
///
/// Output is sorted ascending by timestamp and contains one point per
/// non-empty bucket. Non-finite or negative readings are skipped.
pub fn hourly_series(readings: &[Reading]) -> Vec<SeriesPoint> {
    let mut buckets: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
    for r in readings {
        if !r.value.is_finite() || r.value < 0.0 {
            warn!(
                sensor_id = r.sensor_id,
                timestamp = %r.timestamp,
                value = r.value,
                "skipping invalid reading"
            );
            continue;
        }
        *buckets.entry(floor_to_hour(r.timestamp)).or_insert(0.0) += r.value;
    }

    buckets
        .into_iter()
        .map(|(timestamp, value)| SeriesPoint { timestamp, value })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySource;
    use crate::types::Sensor;
    use chrono::{TimeDelta, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, h, m, 0).unwrap()
    }

    fn reading(sensor_id: u64, ts: DateTime<Utc>, value: f64) -> Reading {
        Reading {
            sensor_id,
            timestamp: ts,
            value,
        }
    }

    #[test]
    fn sums_readings_in_same_hour_across_sensors() {
        let readings = vec![
            reading(1, at(9, 5), 1.5),
            reading(2, at(9, 55), 2.0),
            reading(1, at(10, 0), 4.0),
        ];
        let series = hourly_series(&readings);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].timestamp, at(9, 0));
        assert_eq!(series[0].value, 3.5);
        assert_eq!(series[1].timestamp, at(10, 0));
        assert_eq!(series[1].value, 4.0);
    }

    #[test]
    fn output_is_sorted_and_sparse() {
        let readings = vec![
            reading(1, at(15, 30), 1.0),
            reading(1, at(3, 10), 1.0),
            reading(1, at(8, 45), 1.0),
        ];
        let series = hourly_series(&readings);
        let hours: Vec<_> = series.iter().map(|p| p.timestamp).collect();
        assert_eq!(hours, vec![at(3, 0), at(8, 0), at(15, 0)]);
    }

    #[test]
    fn skips_invalid_values() {
        let readings = vec![
            reading(1, at(1, 0), f64::NAN),
            reading(1, at(1, 0), -2.0),
            reading(1, at(1, 0), 0.5),
        ];
        let series = hourly_series(&readings);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].value, 0.5);
    }

    #[test]
    fn no_active_sensors_yields_empty_series() {
        let mut source = InMemorySource::default();
        source.add_sensor(Sensor {
            id: 1,
            building_id: 7,
            active: false,
        });
        source.push_reading(reading(1, at(4, 0), 3.0));

        let series = building_series(&source, 7, at(0, 0) - TimeDelta::days(1), at(23, 0));
        assert_eq!(series.ok(), Some(Vec::new()));
    }

    #[test]
    fn window_excludes_old_readings() {
        let mut source = InMemorySource::default();
        source.add_sensor(Sensor {
            id: 1,
            building_id: 7,
            active: true,
        });
        source.push_reading(reading(1, at(2, 0), 3.0));
        source.push_reading(reading(1, at(6, 0), 5.0));

        let series = building_series(&source, 7, at(4, 0), at(23, 0)).unwrap_or_default();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].value, 5.0);
    }

    #[test]
    fn window_excludes_readings_after_until() {
        let mut source = InMemorySource::default();
        source.add_sensor(Sensor {
            id: 1,
            building_id: 7,
            active: true,
        });
        source.push_reading(reading(1, at(3, 0), 2.0));
        source.push_reading(reading(1, at(5, 0), 6.0));
        source.push_reading(reading(1, at(9, 0), 8.0));

        let series = building_series(&source, 7, at(0, 0), at(5, 0)).unwrap_or_default();
        let values: Vec<f64> = series.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![2.0, 6.0]);
    }
}
