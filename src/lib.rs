//! GridGuard: Power-Grid Telemetry Simulation & Predictive-Risk Pipeline
//!
//! Batch pipeline producing the three tables behind the monitoring dashboard
//! and the model-training scripts.
//!
//! ## Architecture
//!
//! - **Registry**: immutable fleet metadata + degradation schedule
//! - **Simulator**: per-unit hourly multivariate sensor synthesis
//! - **Preprocessor**: cleaning with per-unit integrity diagnostics
//! - **Feature Engine**: temporal/rolling/categorical features + risk labels
//! - **Sampler**: stratified, proportion-preserving bounded samples
//!
//! Data flows strictly left to right:
//! Registry → Simulator → Preprocessor → FeatureEngine → Sampler.

pub mod config;
pub mod types;
pub mod registry;
pub mod simulator;
pub mod preprocess;
pub mod features;
pub mod sampler;
pub mod tables;

// Re-export configuration
pub use config::{ConfigError, PipelineConfig, RiskThresholds};

// Re-export commonly used types
pub use types::{
    EquipmentId, EquipmentType, EquipmentUnit, FeatureRecord, RawTelemetryRecord, RiskLevel,
    SensorChannel, Substation, TelemetryRecord, TemporalFeatures, CHANNEL_COUNT,
};

// Re-export pipeline stages
pub use features::{FeatureBatch, FeatureEngine, OneHotEncoder};
pub use preprocess::{CleaningOutcome, CleaningReport, IntegrityIssue, Preprocessor};
pub use registry::{DegradationEpisode, DegradationSchedule, EquipmentRegistry};
pub use sampler::{SampleOutcome, SampleReport, StratifiedSampler};
pub use simulator::TelemetrySimulator;
