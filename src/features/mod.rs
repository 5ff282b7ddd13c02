//! Feature Engine - temporal, rolling, categorical, and risk derivation
//!
//! Turns a cleaned, sorted telemetry batch into a feature batch of identical
//! row count. Rolling statistics are computed per unit over an arena of
//! append-only channel buffers (strictly causal: a row only ever sees rows at
//! or before its own timestamp). Units are independent, so the per-unit passes
//! fan out across the rayon pool and are re-assembled in batch order.
//!
//! Risk labeling and the failure-probability proxy are pure per-record
//! functions in the `risk` submodule; equipment identity is one-hot encoded
//! at the width fixed by the registry at build time.

mod encoder;
pub mod risk;
mod rolling;

pub use encoder::OneHotEncoder;
pub use rolling::{ChannelArena, WindowStats};

use chrono::{Datelike, Timelike, Weekday};
use rayon::prelude::*;
use std::f64::consts::PI;
use tracing::info;

use crate::config::{ConfigError, PipelineConfig, RiskThresholds};
use crate::registry::EquipmentRegistry;
use crate::types::{
    FeatureRecord, RiskLevel, SensorChannel, TelemetryRecord, TemporalFeatures,
};

/// Channels given lag and rate-of-change supplements. One representative per
/// modality that moves on the failure path.
pub const LAG_CHANNELS: [SensorChannel; 4] = [
    SensorChannel::TemperatureTop,
    SensorChannel::VibrationX,
    SensorChannel::CurrentPhaseA,
    SensorChannel::VoltagePhaseA,
];

/// Statistic names in rolling-vector order.
const ROLLING_STATS: [&str; 4] = ["mean", "std", "min", "max"];

// ============================================================================
// Schema
// ============================================================================

/// Column names for the variable-width feature blocks, in vector order.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    pub rolling_columns: Vec<String>,
    pub lag_columns: Vec<String>,
    pub roc_columns: Vec<String>,
    pub one_hot_columns: Vec<String>,
}

impl FeatureSchema {
    fn build(windows: &[u32], lags: &[u32], encoder: &OneHotEncoder) -> Self {
        let mut rolling_columns =
            Vec::with_capacity(SensorChannel::ALL.len() * windows.len() * ROLLING_STATS.len());
        for ch in SensorChannel::ALL {
            for w in windows {
                for stat in ROLLING_STATS {
                    rolling_columns.push(format!("{}_rolling_{stat}_{w}h", ch.name()));
                }
            }
        }

        let mut lag_columns = Vec::with_capacity(LAG_CHANNELS.len() * lags.len());
        for ch in LAG_CHANNELS {
            for lag in lags {
                lag_columns.push(format!("{}_lag_{lag}", ch.name()));
            }
        }

        let roc_columns = LAG_CHANNELS
            .iter()
            .map(|ch| format!("{}_roc", ch.name()))
            .collect();

        Self {
            rolling_columns,
            lag_columns,
            roc_columns,
            one_hot_columns: encoder.columns().to_vec(),
        }
    }
}

/// Feature rows plus the schema describing their vector blocks.
#[derive(Debug, Clone)]
pub struct FeatureBatch {
    pub records: Vec<FeatureRecord>,
    pub schema: FeatureSchema,
}

impl FeatureBatch {
    /// One-hot encoding width.
    pub fn one_hot_width(&self) -> usize {
        self.schema.one_hot_columns.len()
    }

    /// Row counts per risk class, indexed by `RiskLevel` code.
    pub fn risk_distribution(&self) -> [usize; 3] {
        let mut counts = [0usize; 3];
        for record in &self.records {
            counts[record.risk_level.code() as usize] += 1;
        }
        counts
    }
}

// ============================================================================
// Engine
// ============================================================================

pub struct FeatureEngine {
    thresholds: RiskThresholds,
    windows: Vec<u32>,
    lags: Vec<u32>,
    encoder: OneHotEncoder,
}

impl FeatureEngine {
    /// Build the engine against a registry. The one-hot width is fixed here;
    /// identities outside the registry encode as all zeros at derive time.
    pub fn new(config: &PipelineConfig, registry: &EquipmentRegistry) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            thresholds: config.risk,
            windows: config.features.rolling_windows.clone(),
            lags: config.features.lag_hours.clone(),
            encoder: OneHotEncoder::fit(registry.units()),
        })
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    /// Derive one feature record per input record. Rows are never dropped:
    /// the output has identical row count and order.
    ///
    /// Input must be sorted ascending by (equipment_id, timestamp) with
    /// unit-local series contiguous, which is what the preprocessor emits.
    pub fn derive(&self, records: &[TelemetryRecord]) -> FeatureBatch {
        let ranges = unit_ranges(records);
        info!(
            rows = records.len(),
            units = ranges.len(),
            windows = ?self.windows,
            "Deriving features"
        );

        let per_unit: Vec<Vec<FeatureRecord>> = ranges
            .par_iter()
            .map(|range| self.derive_unit(&records[range.clone()]))
            .collect();
        let records: Vec<FeatureRecord> = per_unit.into_iter().flatten().collect();

        let batch = FeatureBatch {
            records,
            schema: FeatureSchema::build(&self.windows, &self.lags, &self.encoder),
        };
        let [low, medium, high] = batch.risk_distribution();
        info!(low, medium, high, "Feature derivation complete");
        batch
    }

    /// Causal single-unit pass: append to the arena, then read windows that
    /// end at the current position.
    fn derive_unit(&self, series: &[TelemetryRecord]) -> Vec<FeatureRecord> {
        let mut arena = ChannelArena::with_capacity(series.len());
        let mut out = Vec::with_capacity(series.len());

        for (position, record) in series.iter().enumerate() {
            arena.push(record);

            let mut rolling = Vec::with_capacity(
                SensorChannel::ALL.len() * self.windows.len() * ROLLING_STATS.len(),
            );
            for ch in SensorChannel::ALL {
                for window in &self.windows {
                    let stats = arena.window_stats(ch, position, *window as usize);
                    rolling.extend_from_slice(&[stats.mean, stats.std, stats.min, stats.max]);
                }
            }

            let mut lags = Vec::with_capacity(LAG_CHANNELS.len() * self.lags.len());
            for ch in LAG_CHANNELS {
                for lag in &self.lags {
                    lags.push(arena.lagged(ch, position, *lag as usize));
                }
            }
            let rate_of_change = LAG_CHANNELS
                .iter()
                .map(|ch| arena.rate_of_change(*ch, position))
                .collect();

            let risk_level = risk::classify_risk(record, &self.thresholds);

            out.push(FeatureRecord {
                temporal: temporal_features(record),
                rolling,
                lags,
                rate_of_change,
                temp_vibration_interaction: record.temperature_top * record.vibration_max(),
                current_voltage_interaction: record.current_phase_a * record.voltage_phase_a,
                equipment_slot: self.encoder.slot(record.equipment_id),
                risk_level,
                failure: risk_level == RiskLevel::High,
                failure_probability: risk::failure_probability(record),
                base: record.clone(),
            });
        }
        out
    }
}

/// Calendar encodings for one record.
fn temporal_features(record: &TelemetryRecord) -> TemporalFeatures {
    let hour = record.timestamp.hour();
    let day_of_week = record.timestamp.weekday().num_days_from_monday();
    let hour_angle = 2.0 * PI * f64::from(hour) / 24.0;
    let day_angle = 2.0 * PI * f64::from(day_of_week) / 7.0;

    TemporalFeatures {
        hour,
        day_of_week,
        month: record.timestamp.month(),
        is_weekend: matches!(record.timestamp.weekday(), Weekday::Sat | Weekday::Sun),
        hour_sin: hour_angle.sin(),
        hour_cos: hour_angle.cos(),
        day_sin: day_angle.sin(),
        day_cos: day_angle.cos(),
    }
}

/// Contiguous index ranges of each unit's series within a sorted batch.
fn unit_ranges(records: &[TelemetryRecord]) -> Vec<std::ops::Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for i in 1..=records.len() {
        let boundary =
            i == records.len() || records[i].equipment_id != records[start].equipment_id;
        if boundary {
            ranges.push(start..i);
            start = i;
        }
    }
    ranges
}
