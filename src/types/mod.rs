//! Shared data structures for the grid telemetry pipeline
//!
//! This module defines the core types flowing through the pipeline stages:
//! - Registry: Substation, EquipmentUnit (static fleet metadata)
//! - Simulator: TelemetryRecord (one multivariate reading per unit per hour)
//! - Preprocessor: RawTelemetryRecord (nullable channels from external batches)
//! - FeatureEngine: TemporalFeatures, FeatureRecord, RiskLevel

mod equipment;
mod telemetry;
mod feature;

pub use equipment::*;
pub use telemetry::*;
pub use feature::*;
