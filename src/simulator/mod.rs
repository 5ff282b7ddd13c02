//! Telemetry Simulator
//!
//! Generates one multivariate sensor reading per equipment unit per hour
//! across the simulation horizon. Channels follow a load-coupled physical
//! model: a diurnal/weekly load cycle drives the thermal and electrical
//! channels, dissolved-gas and vibration channels sit at their nominal bands,
//! and units flagged in the degradation schedule have every failure-indicator
//! channel blended with a convex severity ramp until the failure hour.
//!
//! Determinism: every record's noise draws come from an RNG seeded by
//! (master seed, equipment id, hour offset), so generation is reproducible
//! regardless of parallel scheduling and any time-slice of a unit's series
//! can be regenerated independently (`simulate_unit_range`).

use chrono::{Datelike, Duration, Timelike, Weekday};
use rand::prelude::*;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

use crate::config::{ConfigError, PipelineConfig};
use crate::registry::EquipmentRegistry;
use crate::types::{EquipmentId, EquipmentUnit, SensorChannel, TelemetryRecord, CHANNEL_COUNT};

// ============================================================================
// Channel Model Constants
// ============================================================================

/// Mean load fraction of the diurnal cycle
const LOAD_BASE: f64 = 0.6;
/// Diurnal swing amplitude (fraction), peaking mid-afternoon
const LOAD_DIURNAL_AMPLITUDE: f64 = 0.3;
/// Weekend demand dip (fraction)
const WEEKEND_LOAD_DIP: f64 = 0.06;
const LOAD_NOISE_SIGMA: f64 = 0.05;
/// Internal load fraction bounds before export as a percentage
const LOAD_FRACTION_MIN: f64 = 0.3;
const LOAD_FRACTION_MAX: f64 = 1.0;

/// Top-oil temperature (°C): base + load gain + severity gain
const TEMP_TOP_BASE: f64 = 65.0;
const TEMP_TOP_LOAD_GAIN: f64 = 15.0;
const TEMP_TOP_SEVERITY_GAIN: f64 = 30.0;
const TEMP_TOP_NOISE_SIGMA: f64 = 3.0;

/// Bulk oil temperature (°C)
const TEMP_OIL_BASE: f64 = 55.0;
const TEMP_OIL_LOAD_GAIN: f64 = 12.0;
const TEMP_OIL_SEVERITY_GAIN: f64 = 25.0;
const TEMP_OIL_NOISE_SIGMA: f64 = 2.0;

/// Nominal phase voltage (V); degradation pulls phases apart (imbalance)
const VOLTAGE_NOMINAL: f64 = 230.0;
const VOLTAGE_NOISE_SIGMA: f64 = 2.0;
const VOLTAGE_SEVERITY_DROP: [f64; 3] = [5.0, 4.0, 6.0];

/// Phase current (A) tracks load
const CURRENT_LOAD_GAIN: f64 = 400.0;
const CURRENT_NOISE_SIGMA: f64 = 10.0;
const CURRENT_SEVERITY_GAIN: [f64; 3] = [50.0, 45.0, 55.0];

/// Dissolved gas (ppm): hydrogen, methane, acetylene
const GAS_H2_BASE: f64 = 50.0;
const GAS_H2_SEVERITY_GAIN: f64 = 200.0;
const GAS_H2_NOISE_SIGMA: f64 = 10.0;
const GAS_CH4_BASE: f64 = 30.0;
const GAS_CH4_SEVERITY_GAIN: f64 = 150.0;
const GAS_CH4_NOISE_SIGMA: f64 = 8.0;
const GAS_C2H2_BASE: f64 = 5.0;
const GAS_C2H2_SEVERITY_GAIN: f64 = 100.0;
const GAS_C2H2_NOISE_SIGMA: f64 = 5.0;

/// Vibration (mm/s) per axis
const VIBRATION_BASE: f64 = 2.0;
const VIBRATION_SEVERITY_GAIN: [f64; 3] = [5.0, 4.0, 6.0];
const VIBRATION_NOISE_SIGMA: f64 = 0.3;

/// Ambient humidity (%)
const HUMIDITY_BASE: f64 = 45.0;
const HUMIDITY_SEVERITY_GAIN: f64 = 20.0;
const HUMIDITY_NOISE_SIGMA: f64 = 5.0;

// ============================================================================
// Simulator
// ============================================================================

/// Batch telemetry generator over an immutable registry and schedule.
pub struct TelemetrySimulator<'a> {
    registry: &'a EquipmentRegistry,
    config: &'a PipelineConfig,
}

impl<'a> TelemetrySimulator<'a> {
    /// Fail-fast construction: invalid configuration or an empty registry is
    /// rejected before any generation begins.
    pub fn new(
        registry: &'a EquipmentRegistry,
        config: &'a PipelineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if registry.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }
        Ok(Self { registry, config })
    }

    /// Generate the full batch: every unit, every hour of the horizon, in
    /// ascending (equipment_id, timestamp) order. Units are generated in
    /// parallel; ordering is restored by collecting in registry order.
    pub fn simulate(&self) -> Vec<TelemetryRecord> {
        let units = self.registry.units();
        let total = units.len();
        let progress_step = (total / 10).max(1);
        let done = AtomicUsize::new(0);

        info!(
            units = total,
            horizon_hours = self.config.simulation.horizon_hours,
            "Starting telemetry generation"
        );

        let per_unit: Vec<Vec<TelemetryRecord>> = units
            .par_iter()
            .map(|unit| {
                let series = self.simulate_unit(unit);
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                if n % progress_step == 0 {
                    info!(
                        progress_percent = n * 100 / total,
                        units_done = n,
                        "Generation progress"
                    );
                }
                series
            })
            .collect();

        let records: Vec<TelemetryRecord> = per_unit.into_iter().flatten().collect();
        info!(rows = records.len(), "Telemetry generation complete");
        records
    }

    /// Generate one unit's complete series in strictly increasing hourly order.
    pub fn simulate_unit(&self, unit: &EquipmentUnit) -> Vec<TelemetryRecord> {
        self.simulate_unit_range(unit, 0, self.config.simulation.horizon_hours)
    }

    /// Generate a time-slice of one unit's series: hours
    /// `[start_hour, start_hour + hours)` clipped to the horizon. Produces
    /// exactly the same values as the corresponding slice of the full series,
    /// which is what makes chunked streaming safe.
    pub fn simulate_unit_range(
        &self,
        unit: &EquipmentUnit,
        start_hour: u32,
        hours: u32,
    ) -> Vec<TelemetryRecord> {
        let horizon = self.config.simulation.horizon_hours;
        let end = start_hour.saturating_add(hours).min(horizon);
        if start_hour >= end {
            return Vec::new();
        }

        let episode = self.registry.schedule().episode(unit.id);
        if let Some(episode) = episode {
            debug!(
                equipment = %unit.id,
                onset = episode.onset_hour,
                failure = episode.failure_hour,
                "Unit carries a degradation episode"
            );
        }

        (start_hour..end)
            .map(|hour| self.generate_record(unit, hour))
            .collect()
    }

    /// One reading for one unit at one hour offset.
    fn generate_record(&self, unit: &EquipmentUnit, hour: u32) -> TelemetryRecord {
        let sim = &self.config.simulation;
        let severity = self.registry.schedule().severity_at(unit.id, hour);
        let timestamp = sim.start_timestamp + Duration::hours(i64::from(hour));
        let mut rng = record_rng(sim.seed, unit.id, hour);

        // Load cycle: diurnal sinusoid peaking mid-afternoon, weekend dip
        let hour_of_day = f64::from(timestamp.hour());
        let diurnal = LOAD_BASE + LOAD_DIURNAL_AMPLITUDE * ((hour_of_day - 6.0) * PI / 12.0).sin();
        let weekly = if is_weekend(timestamp.weekday()) {
            -WEEKEND_LOAD_DIP
        } else {
            0.0
        };
        let load = (diurnal + weekly + noise(&mut rng, LOAD_NOISE_SIGMA))
            .clamp(LOAD_FRACTION_MIN, LOAD_FRACTION_MAX);

        // Thermal channels couple to load and severity
        let temperature_top = TEMP_TOP_BASE
            + TEMP_TOP_LOAD_GAIN * load
            + TEMP_TOP_SEVERITY_GAIN * severity
            + noise(&mut rng, TEMP_TOP_NOISE_SIGMA);
        let temperature_oil = TEMP_OIL_BASE
            + TEMP_OIL_LOAD_GAIN * load
            + TEMP_OIL_SEVERITY_GAIN * severity
            + noise(&mut rng, TEMP_OIL_NOISE_SIGMA);

        // Three-phase voltage: shared variation, per-phase severity sag
        let voltage_variation = noise(&mut rng, VOLTAGE_NOISE_SIGMA);
        let voltage =
            |phase: usize| VOLTAGE_NOMINAL + voltage_variation - VOLTAGE_SEVERITY_DROP[phase] * severity;

        // Three-phase current tracks load
        let current_base = CURRENT_LOAD_GAIN * load;
        let current_phase_a =
            current_base + noise(&mut rng, CURRENT_NOISE_SIGMA) + CURRENT_SEVERITY_GAIN[0] * severity;
        let current_phase_b =
            current_base + noise(&mut rng, CURRENT_NOISE_SIGMA) + CURRENT_SEVERITY_GAIN[1] * severity;
        let current_phase_c =
            current_base + noise(&mut rng, CURRENT_NOISE_SIGMA) + CURRENT_SEVERITY_GAIN[2] * severity;

        // Dissolved gas: the primary failure indicators
        let gas_h2 =
            GAS_H2_BASE + GAS_H2_SEVERITY_GAIN * severity + noise(&mut rng, GAS_H2_NOISE_SIGMA);
        let gas_ch4 =
            GAS_CH4_BASE + GAS_CH4_SEVERITY_GAIN * severity + noise(&mut rng, GAS_CH4_NOISE_SIGMA);
        let gas_c2h2 =
            GAS_C2H2_BASE + GAS_C2H2_SEVERITY_GAIN * severity + noise(&mut rng, GAS_C2H2_NOISE_SIGMA);

        // Vibration per axis
        let vibration = |axis: usize, rng: &mut StdRng| {
            VIBRATION_BASE
                + VIBRATION_SEVERITY_GAIN[axis] * severity
                + noise(rng, VIBRATION_NOISE_SIGMA)
        };
        let vibration_x = vibration(0, &mut rng);
        let vibration_y = vibration(1, &mut rng);
        let vibration_z = vibration(2, &mut rng);

        let humidity =
            HUMIDITY_BASE + HUMIDITY_SEVERITY_GAIN * severity + noise(&mut rng, HUMIDITY_NOISE_SIGMA);

        let mut channels = [0.0; CHANNEL_COUNT];
        channels[SensorChannel::TemperatureTop.index()] = temperature_top;
        channels[SensorChannel::TemperatureOil.index()] = temperature_oil;
        channels[SensorChannel::VoltagePhaseA.index()] = voltage(0);
        channels[SensorChannel::VoltagePhaseB.index()] = voltage(1);
        channels[SensorChannel::VoltagePhaseC.index()] = voltage(2);
        channels[SensorChannel::CurrentPhaseA.index()] = current_phase_a;
        channels[SensorChannel::CurrentPhaseB.index()] = current_phase_b;
        channels[SensorChannel::CurrentPhaseC.index()] = current_phase_c;
        channels[SensorChannel::GasH2.index()] = gas_h2;
        channels[SensorChannel::GasCh4.index()] = gas_ch4;
        channels[SensorChannel::GasC2h2.index()] = gas_c2h2;
        channels[SensorChannel::VibrationX.index()] = vibration_x;
        channels[SensorChannel::VibrationY.index()] = vibration_y;
        channels[SensorChannel::VibrationZ.index()] = vibration_z;
        channels[SensorChannel::Humidity.index()] = humidity;
        channels[SensorChannel::LoadPercentage.index()] = load * 100.0;

        // Every channel stays inside its physical envelope
        for ch in SensorChannel::ALL {
            let env = self.config.envelope.for_channel(ch);
            channels[ch.index()] = env.clip(channels[ch.index()]);
        }

        TelemetryRecord::from_channels(unit.id, timestamp, channels)
    }
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Noise draws are truncated at ±2σ so a spike alone cannot carry a channel
/// outside its plausible band
const NOISE_CLAMP_SIGMA: f64 = 2.0;

/// Zero-mean, bounded Gaussian noise draw.
fn noise(rng: &mut StdRng, sigma: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    sigma * z.clamp(-NOISE_CLAMP_SIGMA, NOISE_CLAMP_SIGMA)
}

/// Per-record RNG stream derived from (seed, equipment id, hour offset).
fn record_rng(seed: u64, id: EquipmentId, hour: u32) -> StdRng {
    let unit_key = (u64::from(id.substation) << 32) | u64::from(id.slot);
    let mixed = splitmix64(seed ^ splitmix64(unit_key) ^ splitmix64(u64::from(hour) ^ 0x9e37_79b9_7f4a_7c15));
    StdRng::seed_from_u64(mixed)
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
