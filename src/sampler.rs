//! Stratified Sampler - bounded samples preserving risk-class proportions
//!
//! Draws at most N rows from a feature batch so that per-RiskLevel
//! proportions match the source within rounding: each class gets
//! floor(N·p_c) rows, and the flooring remainder goes to the largest classes
//! first. Draws are uniform without replacement and reproducible from the
//! configured seed. A class with zero source rows simply receives zero rows;
//! a request larger than the source degrades to the full source. Shortfalls
//! are reported, never raised as errors.

use rand::prelude::*;
use tracing::{info, warn};

use crate::config::SamplerConfig;
use crate::features::FeatureBatch;
use crate::types::{FeatureRecord, RiskLevel};

/// Allocation outcome for one risk class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassAllocation {
    pub risk: RiskLevel,
    /// Rows of this class in the source
    pub available: usize,
    /// Rows drawn into the sample
    pub allocated: usize,
}

/// What the sampler drew and why.
#[derive(Debug, Clone)]
pub struct SampleReport {
    pub requested: usize,
    pub source_rows: usize,
    pub allocations: [ClassAllocation; 3],
}

impl SampleReport {
    pub fn total_allocated(&self) -> usize {
        self.allocations.iter().map(|a| a.allocated).sum()
    }
}

/// Sampled rows plus the allocation report.
#[derive(Debug, Clone)]
pub struct SampleOutcome {
    pub records: Vec<FeatureRecord>,
    pub report: SampleReport,
}

pub struct StratifiedSampler {
    target_rows: usize,
    seed: u64,
}

impl StratifiedSampler {
    pub fn new(config: &SamplerConfig) -> Self {
        Self {
            target_rows: config.sample_rows,
            seed: config.seed,
        }
    }

    /// Override the configured target size.
    pub fn with_target(mut self, target_rows: usize) -> Self {
        self.target_rows = target_rows;
        self
    }

    /// Draw the stratified sample. Deterministic given (seed, source batch).
    /// Output rows keep the source's (equipment_id, timestamp) order.
    pub fn sample(&self, batch: &FeatureBatch) -> SampleOutcome {
        let source_rows = batch.records.len();
        let total = self.target_rows.min(source_rows);

        // Indices per class, in source order
        let mut class_indices: [Vec<usize>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        for (i, record) in batch.records.iter().enumerate() {
            class_indices[record.risk_level.code() as usize].push(i);
        }

        // Floor allocation, exact when the full source is requested
        let mut allocated = [0usize; 3];
        if source_rows > 0 {
            for (c, indices) in class_indices.iter().enumerate() {
                allocated[c] = total * indices.len() / source_rows;
            }
        }

        // Flooring remainder goes to the largest classes first
        let mut remainder = total - allocated.iter().sum::<usize>();
        let mut by_size: Vec<usize> = (0..3).collect();
        by_size.sort_by_key(|c| std::cmp::Reverse(class_indices[*c].len()));
        for &c in by_size.iter().cycle().take(by_size.len() * 2) {
            if remainder == 0 {
                break;
            }
            if allocated[c] < class_indices[c].len() {
                allocated[c] += 1;
                remainder -= 1;
            }
        }
        if remainder > 0 {
            warn!(remainder, "Sample shortfall: source classes exhausted");
        }

        // Uniform draw without replacement within each class
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut selected: Vec<usize> = Vec::with_capacity(total);
        for (c, indices) in class_indices.iter().enumerate() {
            for pick in rand::seq::index::sample(&mut rng, indices.len(), allocated[c]) {
                selected.push(indices[pick]);
            }
        }
        selected.sort_unstable();

        let records: Vec<FeatureRecord> = selected
            .iter()
            .map(|&i| batch.records[i].clone())
            .collect();

        let report = SampleReport {
            requested: self.target_rows,
            source_rows,
            allocations: [
                ClassAllocation {
                    risk: RiskLevel::Low,
                    available: class_indices[0].len(),
                    allocated: allocated[0],
                },
                ClassAllocation {
                    risk: RiskLevel::Medium,
                    available: class_indices[1].len(),
                    allocated: allocated[1],
                },
                ClassAllocation {
                    risk: RiskLevel::High,
                    available: class_indices[2].len(),
                    allocated: allocated[2],
                },
            ],
        };

        info!(
            requested = report.requested,
            drawn = report.total_allocated(),
            low = allocated[0],
            medium = allocated[1],
            high = allocated[2],
            "Stratified sample drawn"
        );

        SampleOutcome { records, report }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::features::FeatureEngine;
    use crate::registry::EquipmentRegistry;
    use crate::types::{EquipmentId, TelemetryRecord, CHANNEL_COUNT};
    use chrono::{Duration, TimeZone, Utc};

    /// Build a feature batch with exact class counts by steering the
    /// temperature channel across the risk thresholds.
    fn make_batch(low: usize, medium: usize, high: usize) -> FeatureBatch {
        let mut config = PipelineConfig::default();
        config.fleet.substations = 1;
        config.fleet.equipment_per_substation = 1;
        config.simulation.horizon_hours = 24;
        let registry = EquipmentRegistry::build(&config).unwrap();
        let engine = FeatureEngine::new(&config, &registry).unwrap();

        let base = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let mut records = Vec::new();
        let nominal: [f64; CHANNEL_COUNT] = [
            70.0, 60.0, 230.0, 230.0, 230.0, 300.0, 300.0, 300.0, 50.0, 30.0, 5.0, 2.0, 2.0, 2.0,
            45.0, 60.0,
        ];
        for (count, temperature) in [(low, 70.0), (medium, 90.0), (high, 120.0)] {
            for _ in 0..count {
                let mut channels = nominal;
                channels[0] = temperature;
                records.push(TelemetryRecord::from_channels(
                    EquipmentId::new(1, 1),
                    base + Duration::hours(records.len() as i64),
                    channels,
                ));
            }
        }
        engine.derive(&records)
    }

    fn sampler(target: usize, seed: u64) -> StratifiedSampler {
        StratifiedSampler::new(&SamplerConfig {
            sample_rows: target,
            seed,
        })
    }

    #[test]
    fn test_proportions_preserved_within_rounding() {
        let batch = make_batch(750, 200, 50);
        let outcome = sampler(100, 42).sample(&batch);

        let a = outcome.report.allocations;
        assert!(a[0].allocated.abs_diff(75) <= 1, "low = {}", a[0].allocated);
        assert!(a[1].allocated.abs_diff(20) <= 1, "medium = {}", a[1].allocated);
        assert!(a[2].allocated.abs_diff(5) <= 1, "high = {}", a[2].allocated);
        assert_eq!(outcome.report.total_allocated(), 100);
        assert_eq!(outcome.records.len(), 100);
    }

    #[test]
    fn test_oversize_request_returns_full_source_without_duplication() {
        let batch = make_batch(750, 200, 50);
        let outcome = sampler(2_000, 42).sample(&batch);

        assert_eq!(outcome.records.len(), 1_000);
        let mut keys: Vec<_> = outcome
            .records
            .iter()
            .map(|r| (r.base.equipment_id, r.base.timestamp))
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 1_000);
    }

    #[test]
    fn test_zero_row_class_allocates_zero() {
        let batch = make_batch(90, 10, 0);
        let outcome = sampler(50, 42).sample(&batch);

        assert_eq!(outcome.report.allocations[2].available, 0);
        assert_eq!(outcome.report.allocations[2].allocated, 0);
        assert_eq!(outcome.records.len(), 50);
    }

    #[test]
    fn test_deterministic_given_seed() {
        let batch = make_batch(80, 15, 5);
        let a = sampler(30, 7).sample(&batch);
        let b = sampler(30, 7).sample(&batch);
        let keys = |o: &SampleOutcome| {
            o.records
                .iter()
                .map(|r| r.base.timestamp)
                .collect::<Vec<_>>()
        };
        assert_eq!(keys(&a), keys(&b));

        // A different seed draws a different subset (same allocation)
        let c = sampler(30, 8).sample(&batch);
        assert_eq!(a.report.total_allocated(), c.report.total_allocated());
        assert_ne!(keys(&a), keys(&c));
    }

    #[test]
    fn test_output_keeps_source_order() {
        let batch = make_batch(40, 10, 10);
        let outcome = sampler(20, 42).sample(&batch);
        for pair in outcome.records.windows(2) {
            assert!(pair[0].base.timestamp < pair[1].base.timestamp);
        }
    }

    #[test]
    fn test_empty_source_yields_empty_sample() {
        let schema_batch = make_batch(1, 0, 0);
        let empty = FeatureBatch {
            records: Vec::new(),
            schema: schema_batch.schema,
        };
        let outcome = sampler(10, 42).sample(&empty);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.report.total_allocated(), 0);
    }
}
