//! TOML-based engine configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level engine configuration parsed from TOML.
///
/// Every numeric constant the forecaster and optimizer rely on lives here so
/// callers can swap in synthetic regimes. All fields default to the standard
/// values; load from TOML with [`EngineConfig::from_toml_file`] or use
/// [`EngineConfig::baseline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// History window and blend weights.
    #[serde(default)]
    pub forecast: ForecastConfig,
    /// Gradient-boosting hyperparameters.
    #[serde(default)]
    pub model: ModelConfig,
    /// Linear program parameters.
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    /// Time-of-day tariff defaults.
    #[serde(default)]
    pub tariff: TariffConfig,
    /// Grid emission factor bands.
    #[serde(default)]
    pub emissions: EmissionConfig,
}

/// History window and blend weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForecastConfig {
    /// Days of readings fed to aggregation (must be > 0).
    pub lookback_days: u32,
    /// Weight of the hour-of-day baseline in the blend.
    pub baseline_weight: f64,
    /// Weight of the trained model in the blend; ignored when untrained.
    pub model_weight: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            lookback_days: 14,
            baseline_weight: 0.6,
            model_weight: 0.4,
        }
    }
}

/// Gradient-boosting hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Minimum series length required before training.
    pub min_training_points: usize,
    /// Number of boosting stages.
    pub n_estimators: usize,
    /// Maximum depth of each regression tree.
    pub max_depth: usize,
    /// Shrinkage applied to every stage.
    pub learning_rate: f64,
    /// Minimum number of samples in a leaf.
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn for each stage, in `(0, 1]`.
    pub subsample: f64,
    /// Seed for feature permutation and row subsampling.
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            min_training_points: 24,
            n_estimators: 100,
            max_depth: 3,
            learning_rate: 0.05,
            min_samples_leaf: 1,
            subsample: 1.0,
            seed: 42,
        }
    }
}

/// Linear program parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerConfig {
    /// Minimum fraction of forecast energy the schedule must retain.
    pub service_factor: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            service_factor: 0.9,
        }
    }
}

/// Time-of-day tariff defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    /// Price per kWh inside the day window.
    pub day_tariff: f64,
    /// Price per kWh outside the day window.
    pub night_tariff: f64,
    /// First hour billed at the day tariff (inclusive).
    pub day_start_hour: u32,
    /// First hour billed at the night tariff again (exclusive end).
    pub day_end_hour: u32,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            day_tariff: 8.0,
            night_tariff: 5.0,
            day_start_hour: 8,
            day_end_hour: 22,
        }
    }
}

/// One hour range with a fixed grid carbon intensity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmissionBand {
    /// First hour of the band (inclusive).
    pub start_hour: u32,
    /// End of the band (exclusive).
    pub end_hour: u32,
    /// kg CO2 per kWh.
    pub factor: f64,
}

impl EmissionBand {
    pub const fn new(start_hour: u32, end_hour: u32, factor: f64) -> Self {
        Self {
            start_hour,
            end_hour,
            factor,
        }
    }

    pub fn contains(&self, hour: u32) -> bool {
        (self.start_hour..self.end_hour).contains(&hour)
    }
}

/// Grid emission factor bands, matched in order, first hit wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmissionConfig {
    pub bands: Vec<EmissionBand>,
    /// Factor for hours no band covers (late night).
    pub fallback_factor: f64,
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            bands: vec![
                // evening peak
                EmissionBand::new(18, 22, 0.95),
                // solar-heavy daytime
                EmissionBand::new(10, 17, 0.65),
                // shoulders
                EmissionBand::new(6, 10, 0.80),
                EmissionBand::new(17, 18, 0.80),
            ],
            fallback_factor: 0.50,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"optimizer.service_factor"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::baseline()
    }
}

impl EngineConfig {
    /// Returns the standard configuration.
    pub fn baseline() -> Self {
        Self {
            forecast: ForecastConfig::default(),
            model: ModelConfig::default(),
            optimizer: OptimizerConfig::default(),
            tariff: TariffConfig::default(),
            emissions: EmissionConfig::default(),
        }
    }

    /// Returns a preset with a wider day/night price spread.
    pub fn wide_tariff() -> Self {
        Self {
            tariff: TariffConfig {
                day_tariff: 12.0,
                night_tariff: 4.0,
                ..TariffConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Returns a preset that forbids shedding any forecast energy.
    pub fn strict_retention() -> Self {
        Self {
            optimizer: OptimizerConfig {
                service_factor: 1.0,
            },
            ..Self::baseline()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "wide_tariff", "strict_retention"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "wide_tariff" => Ok(Self::wide_tariff()),
            "strict_retention" => Ok(Self::strict_retention()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let f = &self.forecast;
        if f.lookback_days == 0 {
            errors.push(ConfigError::new("forecast.lookback_days", "must be > 0"));
        }
        for (field, w) in [
            ("forecast.baseline_weight", f.baseline_weight),
            ("forecast.model_weight", f.model_weight),
        ] {
            if !w.is_finite() || w < 0.0 {
                errors.push(ConfigError::new(field, format!("must be >= 0, got {w}")));
            }
        }

        let m = &self.model;
        if m.n_estimators == 0 {
            errors.push(ConfigError::new("model.n_estimators", "must be > 0"));
        }
        if m.max_depth == 0 {
            errors.push(ConfigError::new("model.max_depth", "must be > 0"));
        }
        if m.min_samples_leaf == 0 {
            errors.push(ConfigError::new("model.min_samples_leaf", "must be > 0"));
        }
        if !(m.learning_rate.is_finite() && m.learning_rate > 0.0) {
            errors.push(ConfigError::new(
                "model.learning_rate",
                format!("must be > 0, got {}", m.learning_rate),
            ));
        }
        if !(m.subsample > 0.0 && m.subsample <= 1.0) {
            errors.push(ConfigError::new(
                "model.subsample",
                format!("must be in (0.0, 1.0], got {}", m.subsample),
            ));
        }

        let sf = self.optimizer.service_factor;
        if !(sf > 0.0 && sf <= 1.0) {
            errors.push(ConfigError::new(
                "optimizer.service_factor",
                format!("must be in (0.0, 1.0], got {sf}"),
            ));
        }

        let t = &self.tariff;
        if t.day_start_hour >= t.day_end_hour || t.day_end_hour > 24 {
            errors.push(ConfigError::new(
                "tariff.day_start_hour",
                "must satisfy day_start_hour < day_end_hour <= 24",
            ));
        }
        for (field, price) in [
            ("tariff.day_tariff", t.day_tariff),
            ("tariff.night_tariff", t.night_tariff),
        ] {
            if !price.is_finite() || price < 0.0 {
                errors.push(ConfigError::new(field, format!("must be >= 0, got {price}")));
            }
        }

        let e = &self.emissions;
        for (i, band) in e.bands.iter().enumerate() {
            if band.start_hour >= band.end_hour || band.end_hour > 24 {
                errors.push(ConfigError::new(
                    format!("emissions.bands[{i}]"),
                    "must satisfy start_hour < end_hour <= 24",
                ));
            }
            if !band.factor.is_finite() || band.factor < 0.0 {
                errors.push(ConfigError::new(
                    format!("emissions.bands[{i}].factor"),
                    format!("must be >= 0, got {}", band.factor),
                ));
            }
        }
        if !e.fallback_factor.is_finite() || e.fallback_factor < 0.0 {
            errors.push(ConfigError::new(
                "emissions.fallback_factor",
                format!("must be >= 0, got {}", e.fallback_factor),
            ));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = EngineConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn baseline_carries_standard_constants() {
        let cfg = EngineConfig::baseline();
        assert_eq!(cfg.forecast.lookback_days, 14);
        assert_eq!(cfg.forecast.baseline_weight, 0.6);
        assert_eq!(cfg.forecast.model_weight, 0.4);
        assert_eq!(cfg.optimizer.service_factor, 0.9);
        assert_eq!(cfg.tariff.day_tariff, 8.0);
        assert_eq!(cfg.tariff.night_tariff, 5.0);
        assert_eq!(cfg.model.n_estimators, 100);
        assert_eq!(cfg.model.max_depth, 3);
        assert_eq!(cfg.model.learning_rate, 0.05);
    }

    #[test]
    fn from_preset_unknown() {
        let err = EngineConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in EngineConfig::PRESETS {
            let cfg = EngineConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn wide_tariff_widens_spread() {
        let base = EngineConfig::baseline();
        let wide = EngineConfig::wide_tariff();
        assert!(
            wide.tariff.day_tariff - wide.tariff.night_tariff
                > base.tariff.day_tariff - base.tariff.night_tariff
        );
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[forecast]
lookback_days = 7
baseline_weight = 0.5
model_weight = 0.5

[model]
n_estimators = 50
max_depth = 2
learning_rate = 0.1
subsample = 0.8
seed = 7

[optimizer]
service_factor = 0.95

[tariff]
day_tariff = 10.0
night_tariff = 3.0
day_start_hour = 7
day_end_hour = 23

[emissions]
fallback_factor = 0.4

[[emissions.bands]]
start_hour = 17
end_hour = 21
factor = 1.1
"#;
        let cfg = EngineConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.forecast.lookback_days), Some(7));
        assert_eq!(cfg.as_ref().map(|c| c.model.subsample), Some(0.8));
        assert_eq!(cfg.as_ref().map(|c| c.emissions.bands.len()), Some(1));
        assert_eq!(cfg.as_ref().map(|c| c.tariff.day_start_hour), Some(7));
        let errors = cfg.map(|c| c.validate()).unwrap_or_default();
        assert!(errors.is_empty(), "parsed config should be valid: {errors:?}");
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[optimizer]
service_factor = 1.0
"#;
        let cfg = EngineConfig::from_toml_str(toml).ok();
        assert_eq!(cfg.as_ref().map(|c| c.optimizer.service_factor), Some(1.0));
        assert_eq!(cfg.as_ref().map(|c| c.forecast.lookback_days), Some(14));
        assert_eq!(cfg.as_ref().map(|c| c.emissions.bands.len()), Some(4));
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[optimizer]
service_factor = 0.9
bogus_field = true
"#;
        assert!(EngineConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn validation_catches_bad_service_factor() {
        let mut cfg = EngineConfig::baseline();
        cfg.optimizer.service_factor = 1.5;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "optimizer.service_factor"));
    }

    #[test]
    fn validation_catches_bad_tariff_window() {
        let mut cfg = EngineConfig::baseline();
        cfg.tariff.day_start_hour = 22;
        cfg.tariff.day_end_hour = 8;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "tariff.day_start_hour"));
    }

    #[test]
    fn validation_catches_bad_band_and_model() {
        let mut cfg = EngineConfig::baseline();
        cfg.emissions.bands.push(EmissionBand::new(20, 25, 0.7));
        cfg.model.n_estimators = 0;
        cfg.model.subsample = 0.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "emissions.bands[4]"));
        assert!(errors.iter().any(|e| e.field == "model.n_estimators"));
        assert!(errors.iter().any(|e| e.field == "model.subsample"));
    }

    #[test]
    fn config_error_display_names_field() {
        let e = ConfigError::new("forecast.lookback_days", "must be > 0");
        assert_eq!(
            e.to_string(),
            "config error: forecast.lookback_days: must be > 0"
        );
    }
}
