//! CSV import of sensor readings into an [`InMemorySource`].
//!
//! Expected columns: `sensor_id,building_id,timestamp,value[,active]`.
//! Timestamps are RFC 3339; `active` defaults to `true` when the column is
//! absent or empty. One row per reading; sensors are derived from the rows.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::SourceError;
use crate::source::InMemorySource;
use crate::types::{BuildingId, Reading, Sensor, SensorId};

#[derive(Debug, Deserialize)]
struct ReadingRow {
    sensor_id: SensorId,
    building_id: BuildingId,
    timestamp: DateTime<Utc>,
    value: f64,
    #[serde(default)]
    active: Option<bool>,
}

/// Loads a readings CSV file.
///
/// # Errors
///
/// Returns a [`SourceError`] if the file cannot be opened or any row is
/// malformed.
pub fn load_readings_csv(path: &Path) -> Result<InMemorySource, SourceError> {
    let file = File::open(path)?;
    read_readings_csv(io::BufReader::new(file))
}

/// Parses readings CSV from any reader.
///
/// # Errors
///
/// Returns [`SourceError::Csv`] for unparseable rows and
/// [`SourceError::InvalidRecord`] when a sensor id appears under two
/// different buildings.
pub fn read_readings_csv(reader: impl Read) -> Result<InMemorySource, SourceError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut sensors: HashMap<SensorId, Sensor> = HashMap::new();
    let mut readings = Vec::new();

    for row in rdr.deserialize::<ReadingRow>() {
        let row = row?;
        let active = row.active.unwrap_or(true);
        match sensors.entry(row.sensor_id) {
            Entry::Occupied(entry) if entry.get().building_id != row.building_id => {
                return Err(SourceError::InvalidRecord {
                    line: readings.len() as u64 + 2,
                    message: format!(
                        "sensor {} belongs to building {} but row says {}",
                        row.sensor_id,
                        entry.get().building_id,
                        row.building_id
                    ),
                });
            }
            // Any inactive row deactivates the sensor.
            Entry::Occupied(mut entry) => entry.get_mut().active &= active,
            Entry::Vacant(entry) => {
                entry.insert(Sensor {
                    id: row.sensor_id,
                    building_id: row.building_id,
                    active,
                });
            }
        }
        readings.push(Reading {
            sensor_id: row.sensor_id,
            timestamp: row.timestamp,
            value: row.value,
        });
    }

    let mut sensors: Vec<Sensor> = sensors.into_values().collect();
    sensors.sort_by_key(|s| s.id);
    debug!(sensors = sensors.len(), readings = readings.len(), "loaded readings csv");
    Ok(InMemorySource::new(sensors, readings))
}
