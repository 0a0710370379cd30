//! Synthetic hourly meter data for a handful of building archetypes.
//!
//! Each building gets a main meter; offices and colleges also get an HVAC
//! sub-meter. Values carry up to ±10% uniform noise and never drop below
//! [`MIN_READING_KWH`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::source::InMemorySource;
use crate::types::{BuildingId, Reading, Sensor, SensorId, floor_to_hour};

/// Floor applied to every generated reading (kWh).
pub const MIN_READING_KWH: f64 = 0.5;

const NOISE: f64 = 0.1;

/// Building usage pattern.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    School,
    College,
    #[default]
    Office,
    Residential,
}

impl Archetype {
    pub const ALL: [Self; 4] = [Self::School, Self::College, Self::Office, Self::Residential];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::School => "school",
            Self::College => "college",
            Self::Office => "office",
            Self::Residential => "residential",
        }
    }

    /// Main-meter load before noise (kWh for the hour).
    pub fn main_load(self, hour: u32) -> f64 {
        match self {
            Self::School if (8..=15).contains(&hour) => 15.0,
            Self::School => 3.0,
            Self::College if (8..=18).contains(&hour) => 35.0,
            Self::College => 5.0,
            Self::Office if (9..=19).contains(&hour) => 50.0,
            Self::Office => 10.0,
            Self::Residential if (6..=9).contains(&hour) || (18..=23).contains(&hour) => 25.0,
            Self::Residential => 8.0,
        }
    }

    /// HVAC sub-meter load before noise, if the archetype has one.
    pub fn hvac_load(self, hour: u32) -> Option<f64> {
        match self {
            Self::Office | Self::College => Some(if (9..=18).contains(&hour) {
                self.main_load(hour) * 0.4
            } else {
                0.5
            }),
            Self::School | Self::Residential => None,
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Archetype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == wanted)
            .ok_or_else(|| {
                format!("unknown archetype \"{s}\" (expected school, college, office or residential)")
            })
    }
}

/// Sensors and readings generated for one building.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoBuilding {
    pub building_id: BuildingId,
    pub archetype: Archetype,
    pub sensors: Vec<Sensor>,
    pub readings: Vec<Reading>,
}

impl DemoBuilding {
    pub fn into_source(self) -> InMemorySource {
        InMemorySource::new(self.sensors, self.readings)
    }
}

fn jitter(rng: &mut StdRng, value: f64) -> f64 {
    (value * rng.random_range(1.0 - NOISE..=1.0 + NOISE)).max(MIN_READING_KWH)
}

/// Generates `days` of hourly readings ending just before `end`.
///
/// Sensor ids are `building_id * 10 + 1` (main) and `+ 2` (HVAC). The same
/// arguments always produce the same readings.
///
/// # Arguments
///
/// * `archetype` - Usage pattern
/// * `building_id` - Building the sensors belong to
/// * `days` - Days of history
/// * `end` - Exclusive end of the history; floored to the hour
/// * `seed` - Noise seed
///
/// # Errors
///
/// [`EngineError::InvalidRequest`] when `building_id` is too large to derive
/// sensor ids from, or when `days` reaches past the representable time range.
pub fn generate_building(
    archetype: Archetype,
    building_id: BuildingId,
    days: u32,
    end: DateTime<Utc>,
    seed: u64,
) -> Result<DemoBuilding, EngineError> {
    let sensor_id = |offset: u64| -> Result<SensorId, EngineError> {
        building_id
            .checked_mul(10)
            .and_then(|base| base.checked_add(offset))
            .ok_or_else(|| EngineError::InvalidRequest {
                field: "building_id",
                message: format!("{building_id} is too large for demo sensor ids"),
            })
    };
    let main_id = sensor_id(1)?;
    let hvac_id = sensor_id(2)?;
    let has_hvac = archetype.hvac_load(0).is_some();

    let mut sensors = vec![Sensor {
        id: main_id,
        building_id,
        active: true,
    }];
    if has_hvac {
        sensors.push(Sensor {
            id: hvac_id,
            building_id,
            active: true,
        });
    }

    let hours = i64::from(days) * 24;
    let start = floor_to_hour(end)
        .checked_sub_signed(TimeDelta::hours(hours))
        .ok_or_else(|| EngineError::InvalidRequest {
            field: "days",
            message: format!("{days} days of history reach past the supported time range"),
        })?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut readings = Vec::with_capacity(hours as usize * sensors.len());

    for h in 0..hours {
        let timestamp = start + TimeDelta::hours(h);
        let hour = timestamp.hour();
        readings.push(Reading {
            sensor_id: main_id,
            timestamp,
            value: jitter(&mut rng, archetype.main_load(hour)),
        });
        if let Some(hvac) = archetype.hvac_load(hour) {
            readings.push(Reading {
                sensor_id: hvac_id,
                timestamp,
                value: jitter(&mut rng, hvac),
            });
        }
    }

    Ok(DemoBuilding {
        building_id,
        archetype,
        sensors,
        readings,
    })
}
