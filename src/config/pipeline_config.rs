//! Pipeline configuration - topology, simulation, envelopes, and thresholds
//! as operator-tunable TOML values
//!
//! Every struct implements `Default` with values matching the reference
//! dataset parameters, ensuring zero-change behavior when no config file is
//! present.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::types::SensorChannel;

// ============================================================================
// Errors
// ============================================================================

/// Fatal configuration error. Raised before any generation begins.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("invalid simulation horizon: {0} hours (must be > 0)")]
    InvalidHorizon(u32),

    #[error("invalid fleet topology: {substations} substations x {per_substation} units")]
    InvalidTopology {
        substations: u32,
        per_substation: u32,
    },

    #[error("degradation fraction {0} outside [0, 1]")]
    InvalidDegradationFraction(f64),

    #[error("invalid chunk size: {0} hours (must be > 0)")]
    InvalidChunkHours(u32),

    #[error("equipment registry is empty")]
    EmptyRegistry,

    #[error("channel {channel}: envelope min {min} >= max {max}")]
    InvalidEnvelope {
        channel: &'static str,
        min: f64,
        max: f64,
    },

    #[error("risk threshold ordering violated for {axis}: warning {warning} >= critical {critical}")]
    InvalidRiskThresholds {
        axis: &'static str,
        warning: f64,
        critical: f64,
    },

    #[error("rolling windows must be non-empty, strictly ascending, and > 0 (got {0:?})")]
    InvalidRollingWindows(Vec<u32>),
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a pipeline run.
///
/// Load with `PipelineConfig::load()` which searches:
/// 1. `$GRIDGUARD_CONFIG` env var
/// 2. `./gridguard.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Fleet topology
    #[serde(default)]
    pub fleet: FleetConfig,

    /// Simulation horizon, seeding, degradation schedule
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Per-channel physical envelopes
    #[serde(default)]
    pub envelope: EnvelopeConfig,

    /// Risk classification thresholds
    #[serde(default)]
    pub risk: RiskThresholds,

    /// Preprocessing policy
    #[serde(default)]
    pub preprocess: PreprocessConfig,

    /// Feature engineering windows
    #[serde(default)]
    pub features: FeatureConfig,

    /// Stratified sampler settings
    #[serde(default)]
    pub sampler: SamplerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fleet: FleetConfig::default(),
            simulation: SimulationConfig::default(),
            envelope: EnvelopeConfig::default(),
            risk: RiskThresholds::default(),
            preprocess: PreprocessConfig::default(),
            features: FeatureConfig::default(),
            sampler: SamplerConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$GRIDGUARD_CONFIG` environment variable
    /// 2. `./gridguard.toml` in the current working directory
    /// 3. Built-in defaults (reference dataset parameters)
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("GRIDGUARD_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                let config = Self::load_from_file(&p)?;
                info!(path = %p.display(), "Loaded pipeline config from GRIDGUARD_CONFIG");
                return Ok(config);
            }
            warn!(path = %path, "GRIDGUARD_CONFIG points to non-existent file, falling back");
        }

        let local = PathBuf::from("gridguard.toml");
        if local.exists() {
            let config = Self::load_from_file(&local)?;
            info!("Loaded pipeline config from ./gridguard.toml");
            return Ok(config);
        }

        info!("No gridguard.toml found — using built-in defaults");
        Ok(Self::default())
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Range-check every tunable. Called on every load path; call again after
    /// applying CLI overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.horizon_hours == 0 {
            return Err(ConfigError::InvalidHorizon(self.simulation.horizon_hours));
        }
        if self.fleet.substations == 0 || self.fleet.equipment_per_substation == 0 {
            return Err(ConfigError::InvalidTopology {
                substations: self.fleet.substations,
                per_substation: self.fleet.equipment_per_substation,
            });
        }
        if !(0.0..=1.0).contains(&self.simulation.degradation_fraction) {
            return Err(ConfigError::InvalidDegradationFraction(
                self.simulation.degradation_fraction,
            ));
        }
        if self.simulation.chunk_hours == 0 {
            return Err(ConfigError::InvalidChunkHours(self.simulation.chunk_hours));
        }
        self.envelope.validate()?;
        self.risk.validate()?;

        let windows = &self.features.rolling_windows;
        let ascending = windows.windows(2).all(|w| w[0] < w[1]);
        if windows.is_empty() || !ascending || windows.contains(&0) {
            return Err(ConfigError::InvalidRollingWindows(windows.clone()));
        }
        Ok(())
    }
}

// ============================================================================
// Fleet Topology
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Number of substations
    #[serde(default = "defaults::substations")]
    pub substations: u32,
    /// Equipment units per substation
    #[serde(default = "defaults::equipment_per_substation")]
    pub equipment_per_substation: u32,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            substations: defaults::substations(),
            equipment_per_substation: defaults::equipment_per_substation(),
        }
    }
}

impl FleetConfig {
    /// Total unit count across the fleet.
    pub fn total_units(&self) -> usize {
        self.substations as usize * self.equipment_per_substation as usize
    }
}

// ============================================================================
// Simulation
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Simulation horizon in hours (17,520 = 2 years)
    #[serde(default = "defaults::horizon_hours")]
    pub horizon_hours: u32,
    /// First timestamp of the horizon (UTC)
    #[serde(default = "defaults::start_timestamp")]
    pub start_timestamp: DateTime<Utc>,
    /// Master seed; registry, per-unit simulation streams, and the sampler
    /// all derive from it
    #[serde(default = "defaults::seed")]
    pub seed: u64,
    /// Fraction of units pre-selected for a degradation episode
    #[serde(default = "defaults::degradation_fraction")]
    pub degradation_fraction: f64,
    /// Time-chunk size (hours) for streamed generation
    #[serde(default = "defaults::chunk_hours")]
    pub chunk_hours: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            horizon_hours: defaults::horizon_hours(),
            start_timestamp: defaults::start_timestamp(),
            seed: defaults::seed(),
            degradation_fraction: defaults::degradation_fraction(),
            chunk_hours: defaults::chunk_hours(),
        }
    }
}

// ============================================================================
// Channel Envelopes
// ============================================================================

/// Inclusive physical bounds for one sensor channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChannelEnvelope {
    pub min: f64,
    pub max: f64,
}

impl ChannelEnvelope {
    pub fn clip(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Per-channel physical envelope table. Phases of the same modality share an
/// envelope (there is one `voltage` bound for all three phases).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    #[serde(default = "defaults::env_temperature_top")]
    pub temperature_top: ChannelEnvelope,
    #[serde(default = "defaults::env_temperature_oil")]
    pub temperature_oil: ChannelEnvelope,
    #[serde(default = "defaults::env_voltage")]
    pub voltage: ChannelEnvelope,
    #[serde(default = "defaults::env_current")]
    pub current: ChannelEnvelope,
    #[serde(default = "defaults::env_gas_h2")]
    pub gas_h2: ChannelEnvelope,
    #[serde(default = "defaults::env_gas_ch4")]
    pub gas_ch4: ChannelEnvelope,
    #[serde(default = "defaults::env_gas_c2h2")]
    pub gas_c2h2: ChannelEnvelope,
    #[serde(default = "defaults::env_vibration")]
    pub vibration: ChannelEnvelope,
    #[serde(default = "defaults::env_humidity")]
    pub humidity: ChannelEnvelope,
    #[serde(default = "defaults::env_load_percentage")]
    pub load_percentage: ChannelEnvelope,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            temperature_top: defaults::env_temperature_top(),
            temperature_oil: defaults::env_temperature_oil(),
            voltage: defaults::env_voltage(),
            current: defaults::env_current(),
            gas_h2: defaults::env_gas_h2(),
            gas_ch4: defaults::env_gas_ch4(),
            gas_c2h2: defaults::env_gas_c2h2(),
            vibration: defaults::env_vibration(),
            humidity: defaults::env_humidity(),
            load_percentage: defaults::env_load_percentage(),
        }
    }
}

impl EnvelopeConfig {
    /// Envelope for a catalogue channel.
    pub fn for_channel(&self, ch: SensorChannel) -> ChannelEnvelope {
        match ch {
            SensorChannel::TemperatureTop => self.temperature_top,
            SensorChannel::TemperatureOil => self.temperature_oil,
            SensorChannel::VoltagePhaseA
            | SensorChannel::VoltagePhaseB
            | SensorChannel::VoltagePhaseC => self.voltage,
            SensorChannel::CurrentPhaseA
            | SensorChannel::CurrentPhaseB
            | SensorChannel::CurrentPhaseC => self.current,
            SensorChannel::GasH2 => self.gas_h2,
            SensorChannel::GasCh4 => self.gas_ch4,
            SensorChannel::GasC2h2 => self.gas_c2h2,
            SensorChannel::VibrationX | SensorChannel::VibrationY | SensorChannel::VibrationZ => {
                self.vibration
            }
            SensorChannel::Humidity => self.humidity,
            SensorChannel::LoadPercentage => self.load_percentage,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let table: [(&'static str, ChannelEnvelope); 10] = [
            ("temperature_top", self.temperature_top),
            ("temperature_oil", self.temperature_oil),
            ("voltage", self.voltage),
            ("current", self.current),
            ("gas_h2", self.gas_h2),
            ("gas_ch4", self.gas_ch4),
            ("gas_c2h2", self.gas_c2h2),
            ("vibration", self.vibration),
            ("humidity", self.humidity),
            ("load_percentage", self.load_percentage),
        ];
        for (channel, env) in table {
            if env.min >= env.max {
                return Err(ConfigError::InvalidEnvelope {
                    channel,
                    min: env.min,
                    max: env.max,
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Risk Thresholds
// ============================================================================

/// Disjunctive risk-fusion thresholds. The High (critical) tier is checked
/// first and short-circuits; Medium (warning) only applies when High is false.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Top-oil temperature warning (°C)
    #[serde(default = "defaults::temperature_warning")]
    pub temperature_warning: f64,
    /// Top-oil temperature critical (°C)
    #[serde(default = "defaults::temperature_critical")]
    pub temperature_critical: f64,
    /// Dissolved acetylene warning (ppm)
    #[serde(default = "defaults::acetylene_warning")]
    pub acetylene_warning: f64,
    /// Dissolved acetylene critical (ppm)
    #[serde(default = "defaults::acetylene_critical")]
    pub acetylene_critical: f64,
    /// Any-axis vibration warning (mm/s)
    #[serde(default = "defaults::vibration_warning")]
    pub vibration_warning: f64,
    /// Any-axis vibration critical (mm/s)
    #[serde(default = "defaults::vibration_critical")]
    pub vibration_critical: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            temperature_warning: defaults::temperature_warning(),
            temperature_critical: defaults::temperature_critical(),
            acetylene_warning: defaults::acetylene_warning(),
            acetylene_critical: defaults::acetylene_critical(),
            vibration_warning: defaults::vibration_warning(),
            vibration_critical: defaults::vibration_critical(),
        }
    }
}

impl RiskThresholds {
    fn validate(&self) -> Result<(), ConfigError> {
        let axes: [(&'static str, f64, f64); 3] = [
            (
                "temperature",
                self.temperature_warning,
                self.temperature_critical,
            ),
            ("acetylene", self.acetylene_warning, self.acetylene_critical),
            ("vibration", self.vibration_warning, self.vibration_critical),
        ];
        for (axis, warning, critical) in axes {
            if warning >= critical {
                return Err(ConfigError::InvalidRiskThresholds {
                    axis,
                    warning,
                    critical,
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Preprocessing / Features / Sampler
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Maximum consecutive nulls forward-filled per channel before the row is
    /// dropped instead
    #[serde(default = "defaults::max_forward_fill_gap")]
    pub max_forward_fill_gap: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            max_forward_fill_gap: defaults::max_forward_fill_gap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Trailing rolling-window lengths in hours, strictly ascending
    #[serde(default = "defaults::rolling_windows")]
    pub rolling_windows: Vec<u32>,
    /// Lag offsets in hours for the key channels
    #[serde(default = "defaults::lag_hours")]
    pub lag_hours: Vec<u32>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            rolling_windows: defaults::rolling_windows(),
            lag_hours: defaults::lag_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Target sample size for interactive consumption
    #[serde(default = "defaults::sample_rows")]
    pub sample_rows: usize,
    /// Sampler seed (independent of the simulation seed so resampling does
    /// not perturb generation)
    #[serde(default = "defaults::seed")]
    pub seed: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            sample_rows: defaults::sample_rows(),
            seed: defaults::seed(),
        }
    }
}

// ============================================================================
// Defaults — reference dataset parameters
// ============================================================================

mod defaults {
    use super::ChannelEnvelope;
    use chrono::{DateTime, TimeZone, Utc};

    pub fn substations() -> u32 {
        5
    }
    pub fn equipment_per_substation() -> u32 {
        10
    }
    /// 2 years of hourly data
    pub fn horizon_hours() -> u32 {
        17_520
    }
    pub fn start_timestamp() -> DateTime<Utc> {
        // .single() cannot fail for a fixed UTC calendar date
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default()
    }
    pub fn seed() -> u64 {
        42
    }
    pub fn degradation_fraction() -> f64 {
        0.05
    }
    /// One week per chunk
    pub fn chunk_hours() -> u32 {
        168
    }

    pub fn env_temperature_top() -> ChannelEnvelope {
        ChannelEnvelope {
            min: 20.0,
            max: 150.0,
        }
    }
    pub fn env_temperature_oil() -> ChannelEnvelope {
        ChannelEnvelope {
            min: 20.0,
            max: 120.0,
        }
    }
    pub fn env_voltage() -> ChannelEnvelope {
        ChannelEnvelope {
            min: 200.0,
            max: 250.0,
        }
    }
    pub fn env_current() -> ChannelEnvelope {
        ChannelEnvelope {
            min: 0.0,
            max: 800.0,
        }
    }
    pub fn env_gas_h2() -> ChannelEnvelope {
        ChannelEnvelope {
            min: 0.0,
            max: 500.0,
        }
    }
    pub fn env_gas_ch4() -> ChannelEnvelope {
        ChannelEnvelope {
            min: 0.0,
            max: 300.0,
        }
    }
    pub fn env_gas_c2h2() -> ChannelEnvelope {
        ChannelEnvelope {
            min: 0.0,
            max: 200.0,
        }
    }
    pub fn env_vibration() -> ChannelEnvelope {
        ChannelEnvelope {
            min: 0.0,
            max: 20.0,
        }
    }
    pub fn env_humidity() -> ChannelEnvelope {
        ChannelEnvelope {
            min: 10.0,
            max: 95.0,
        }
    }
    pub fn env_load_percentage() -> ChannelEnvelope {
        ChannelEnvelope {
            min: 30.0,
            max: 100.0,
        }
    }

    pub fn temperature_warning() -> f64 {
        85.0
    }
    pub fn temperature_critical() -> f64 {
        100.0
    }
    pub fn acetylene_warning() -> f64 {
        50.0
    }
    pub fn acetylene_critical() -> f64 {
        100.0
    }
    pub fn vibration_warning() -> f64 {
        5.0
    }
    pub fn vibration_critical() -> f64 {
        8.0
    }

    pub fn max_forward_fill_gap() -> u32 {
        3
    }
    pub fn rolling_windows() -> Vec<u32> {
        vec![3, 6, 12, 24]
    }
    pub fn lag_hours() -> Vec<u32> {
        vec![1, 3, 6, 12]
    }
    pub fn sample_rows() -> usize {
        10_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let mut config = PipelineConfig::default();
        config.simulation.horizon_hours = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidHorizon(0))
        ));
    }

    #[test]
    fn test_empty_topology_rejected() {
        let mut config = PipelineConfig::default();
        config.fleet.substations = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTopology { .. })
        ));
    }

    #[test]
    fn test_threshold_ordering_rejected() {
        let mut config = PipelineConfig::default();
        config.risk.temperature_warning = 110.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRiskThresholds { .. })
        ));
    }

    #[test]
    fn test_unsorted_windows_rejected() {
        let mut config = PipelineConfig::default();
        config.features.rolling_windows = vec![6, 3];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRollingWindows(_))
        ));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[fleet]\nsubstations = 2\n\n[simulation]\nhorizon_hours = 48\nseed = 7"
        )
        .unwrap();
        let config = PipelineConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.fleet.substations, 2);
        assert_eq!(config.fleet.equipment_per_substation, 10);
        assert_eq!(config.simulation.horizon_hours, 48);
        assert_eq!(config.simulation.seed, 7);
        assert_eq!(config.risk.temperature_critical, 100.0);
    }

    #[test]
    fn test_invalid_toml_value_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[simulation]\nhorizon_hours = 0").unwrap();
        assert!(PipelineConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_envelope_lookup_shares_phase_bounds() {
        let env = EnvelopeConfig::default();
        let a = env.for_channel(SensorChannel::VoltagePhaseA);
        let c = env.for_channel(SensorChannel::VoltagePhaseC);
        assert_eq!(a.min, c.min);
        assert_eq!(a.max, c.max);
    }
}
