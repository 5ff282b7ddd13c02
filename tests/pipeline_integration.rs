//! Pipeline Integration Tests
//!
//! Exercises the full pipeline — registry, simulator, preprocessor, feature
//! engine, sampler — on a small prescribed scenario: two equipment units over
//! a 48-hour horizon, one pre-selected for a 24-hour degradation episode
//! starting at hour 12. Asserts risk-transition behavior, envelope
//! containment through both stages, row-count preservation, and end-to-end
//! determinism.

use gridguard::config::PipelineConfig;
use gridguard::features::{FeatureBatch, FeatureEngine};
use gridguard::preprocess::Preprocessor;
use gridguard::registry::{DegradationEpisode, DegradationSchedule, EquipmentRegistry};
use gridguard::sampler::StratifiedSampler;
use gridguard::simulator::TelemetrySimulator;
use gridguard::types::{EquipmentId, RawTelemetryRecord, RiskLevel, SensorChannel};

const HEALTHY_UNIT: EquipmentId = EquipmentId {
    substation: 1,
    slot: 1,
};
const DEGRADING_UNIT: EquipmentId = EquipmentId {
    substation: 1,
    slot: 2,
};

fn scenario_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.fleet.substations = 1;
    config.fleet.equipment_per_substation = 2;
    config.simulation.horizon_hours = 48;
    // The scenario prescribes its own schedule below
    config.simulation.degradation_fraction = 0.0;
    config
}

/// Registry with the prescribed 24-hour episode on the second unit,
/// starting at hour 12.
fn scenario_registry(config: &PipelineConfig) -> EquipmentRegistry {
    EquipmentRegistry::build(config)
        .expect("registry build")
        .with_schedule(DegradationSchedule::from_episodes([(
            DEGRADING_UNIT,
            DegradationEpisode {
                onset_hour: 12,
                failure_hour: 36,
            },
        )]))
}

fn run_scenario() -> (PipelineConfig, FeatureBatch) {
    let config = scenario_config();
    let registry = scenario_registry(&config);
    let simulator = TelemetrySimulator::new(&registry, &config).expect("simulator");

    let raw: Vec<RawTelemetryRecord> = simulator.simulate().into_iter().map(Into::into).collect();
    let outcome = Preprocessor::new(&config.envelope, &config.preprocess).clean(raw);
    assert!(outcome.report.is_clean(), "synthetic batch needed repairs");

    let engine = FeatureEngine::new(&config, &registry).expect("feature engine");
    let batch = engine.derive(&outcome.records);
    (config, batch)
}

fn risk_series(batch: &FeatureBatch, unit: EquipmentId) -> Vec<RiskLevel> {
    batch
        .records
        .iter()
        .filter(|r| r.base.equipment_id == unit)
        .map(|r| r.risk_level)
        .collect()
}

#[test]
fn scenario_healthy_unit_stays_low() {
    let (_, batch) = run_scenario();
    let risks = risk_series(&batch, HEALTHY_UNIT);
    assert_eq!(risks.len(), 48);
    assert!(
        risks.iter().all(|r| *r == RiskLevel::Low),
        "healthy unit left Low: {risks:?}"
    );
}

#[test]
fn scenario_degrading_unit_escalates_and_never_falls_back() {
    let (_, batch) = run_scenario();
    let risks = risk_series(&batch, DEGRADING_UNIT);
    assert_eq!(risks.len(), 48);

    // Starts healthy
    assert_eq!(risks[0], RiskLevel::Low);

    // The first departure from Low is a Medium, not a jump to High
    let first_elevated = risks
        .iter()
        .position(|r| *r > RiskLevel::Low)
        .expect("episode never raised the risk level");
    assert_eq!(risks[first_elevated], RiskLevel::Medium);

    // High is reached before the end of the horizon
    let first_high = risks
        .iter()
        .position(|r| *r == RiskLevel::High)
        .expect("episode never reached High");
    assert!(first_high > first_elevated);

    // Once High, the unit never regresses to Low
    assert!(
        risks[first_high..].iter().all(|r| *r > RiskLevel::Low),
        "risk regressed to Low after first High: {risks:?}"
    );
}

#[test]
fn scenario_failure_probability_tracks_escalation() {
    let (_, batch) = run_scenario();
    let probs: Vec<f64> = batch
        .records
        .iter()
        .filter(|r| r.base.equipment_id == DEGRADING_UNIT)
        .map(|r| r.failure_probability)
        .collect();

    assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    // Pre-episode average well below the failed-state average
    let early: f64 = probs[..12].iter().sum::<f64>() / 12.0;
    let failed: f64 = probs[36..].iter().sum::<f64>() / 12.0;
    assert!(failed > early + 0.2, "early {early}, failed {failed}");
}

#[test]
fn envelope_holds_before_and_after_preprocessing() {
    let config = scenario_config();
    let registry = scenario_registry(&config);
    let simulator = TelemetrySimulator::new(&registry, &config).expect("simulator");
    let records = simulator.simulate();

    let in_envelope = |records: &[gridguard::types::TelemetryRecord]| {
        records.iter().all(|r| {
            SensorChannel::ALL
                .iter()
                .all(|ch| config.envelope.for_channel(*ch).contains(r.channel(*ch)))
        })
    };
    assert!(in_envelope(&records));

    let raw: Vec<RawTelemetryRecord> = records.into_iter().map(Into::into).collect();
    let outcome = Preprocessor::new(&config.envelope, &config.preprocess).clean(raw);
    assert!(in_envelope(&outcome.records));
}

#[test]
fn feature_rows_match_cleaned_rows_and_sampler_is_bounded() {
    let (config, batch) = run_scenario();
    assert_eq!(batch.records.len(), 2 * 48);

    // Oversize request returns the whole batch without duplication
    let full = StratifiedSampler::new(&config.sampler)
        .with_target(10_000)
        .sample(&batch);
    assert_eq!(full.records.len(), batch.records.len());

    // Bounded request: total exactly N, proportions within rounding
    let bounded = StratifiedSampler::new(&config.sampler)
        .with_target(24)
        .sample(&batch);
    assert_eq!(bounded.records.len(), 24);
    let [low, medium, high] = batch.risk_distribution();
    for (allocation, available) in bounded.report.allocations.iter().zip([low, medium, high]) {
        assert!(allocation.allocated <= available);
        let exact = 24.0 * available as f64 / batch.records.len() as f64;
        assert!(
            (allocation.allocated as f64 - exact).abs() <= 1.0,
            "allocation {} drifted from {exact}",
            allocation.allocated
        );
    }
}

#[test]
fn pipeline_is_deterministic_end_to_end() {
    let (_, a) = run_scenario();
    let (_, b) = run_scenario();

    assert_eq!(a.records.len(), b.records.len());
    for (ra, rb) in a.records.iter().zip(&b.records) {
        assert_eq!(ra.base, rb.base);
        assert_eq!(ra.risk_level, rb.risk_level);
        assert_eq!(ra.rolling, rb.rolling);
        assert_eq!(ra.failure_probability, rb.failure_probability);
    }
}
