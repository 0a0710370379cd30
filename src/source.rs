//! Read-only access to building sensors and their readings.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::error::SourceError;
use crate::types::{BuildingId, Reading, Sensor, SensorId};

/// Trait implemented by whatever stores sensors and readings.
///
/// The engine only ever reads through this seam; transaction and
/// consistency discipline belong to the implementor.
pub trait ReadingSource {
    /// Returns the ids of all active sensors attached to `building_id`.
    fn list_active_sensors(&self, building_id: BuildingId) -> Result<Vec<SensorId>, SourceError>;

    /// Returns every reading of `sensor_ids` taken at or after `since`.
    fn read_energy_readings(
        &self,
        sensor_ids: &[SensorId],
        since: DateTime<Utc>,
    ) -> Result<Vec<Reading>, SourceError>;
}

/// Vector-backed reading source.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    sensors: Vec<Sensor>,
    readings: Vec<Reading>,
}

impl InMemorySource {
    pub fn new(sensors: Vec<Sensor>, readings: Vec<Reading>) -> Self {
        Self { sensors, readings }
    }

    /// Registers a sensor, replacing any previous sensor with the same id.
    pub fn add_sensor(&mut self, sensor: Sensor) {
        self.sensors.retain(|s| s.id != sensor.id);
        self.sensors.push(sensor);
    }

    pub fn push_reading(&mut self, reading: Reading) {
        self.readings.push(reading);
    }

    pub fn extend_readings(&mut self, readings: impl IntoIterator<Item = Reading>) {
        self.readings.extend(readings);
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// Distinct building ids in ascending order.
    pub fn building_ids(&self) -> Vec<BuildingId> {
        self.sensors
            .iter()
            .map(|s| s.building_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl ReadingSource for InMemorySource {
    fn list_active_sensors(&self, building_id: BuildingId) -> Result<Vec<SensorId>, SourceError> {
        Ok(self
            .sensors
            .iter()
            .filter(|s| s.active && s.building_id == building_id)
            .map(|s| s.id)
            .collect())
    }

    fn read_energy_readings(
        &self,
        sensor_ids: &[SensorId],
        since: DateTime<Utc>,
    ) -> Result<Vec<Reading>, SourceError> {
        Ok(self
            .readings
            .iter()
            .filter(|r| r.timestamp >= since && sensor_ids.contains(&r.sensor_id))
            .cloned()
            .collect())
    }
}
