//! CSV export for forecasts, optimized schedules and raw readings.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::optimize::ScheduleItem;
use crate::types::{ForecastPoint, Reading, Sensor};

const FORECAST_HEADER: [&str; 3] = ["horizon_index", "timestamp", "predicted_kwh"];
const SCHEDULE_HEADER: [&str; 4] = ["hour_index", "timestamp", "baseline_kw", "optimized_kw"];
const READINGS_HEADER: [&str; 5] = ["sensor_id", "building_id", "timestamp", "value", "active"];

fn create(path: &Path) -> io::Result<io::BufWriter<File>> {
    Ok(io::BufWriter::new(File::create(path)?))
}

/// Writes a forecast as CSV to a file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_forecast_csv(points: &[ForecastPoint], path: &Path) -> io::Result<()> {
    write_forecast_csv(points, create(path)?)
}

/// Writes a forecast as CSV to any writer.
///
/// # Arguments
///
/// * `points` - Forecast points in horizon order
/// * `writer` - Destination implementing `Write`
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_forecast_csv(points: &[ForecastPoint], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(FORECAST_HEADER)?;
    for p in points {
        wtr.write_record(&[
            p.horizon_index.to_string(),
            p.timestamp.to_rfc3339(),
            format!("{:.4}", p.predicted_value),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes an optimized schedule as CSV to a file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_schedule_csv(schedule: &[ScheduleItem], path: &Path) -> io::Result<()> {
    write_schedule_csv(schedule, create(path)?)
}

/// Writes an optimized schedule as CSV to any writer.
///
/// Produces deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_schedule_csv(schedule: &[ScheduleItem], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(SCHEDULE_HEADER)?;
    for item in schedule {
        wtr.write_record(&[
            item.hour_index.to_string(),
            item.timestamp.to_rfc3339(),
            format!("{:.4}", item.baseline_kw),
            format!("{:.4}", item.optimized_kw),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes readings in the import layout read by
/// [`read_readings_csv`](super::readings::read_readings_csv).
///
/// Readings whose sensor is unknown are skipped.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_readings_csv(
    sensors: &[Sensor],
    readings: &[Reading],
    writer: impl Write,
) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(READINGS_HEADER)?;
    for r in readings {
        let Some(sensor) = sensors.iter().find(|s| s.id == r.sensor_id) else {
            continue;
        };
        wtr.write_record(&[
            r.sensor_id.to_string(),
            sensor.building_id.to_string(),
            r.timestamp.to_rfc3339(),
            format!("{:.4}", r.value),
            sensor.active.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes readings to a file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_readings_csv(sensors: &[Sensor], readings: &[Reading], path: &Path) -> io::Result<()> {
    write_readings_csv(sensors, readings, create(path)?)
}
