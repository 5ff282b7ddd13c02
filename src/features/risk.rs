//! Risk classification and failure-probability proxy
//!
//! Pure functions of a single record's channel values: recomputing on the
//! same input always yields the same result, and no other record is ever
//! consulted. The High tier is checked first and short-circuits, so a record
//! satisfying both tiers resolves High.

use crate::config::RiskThresholds;
use crate::types::{RiskLevel, TelemetryRecord};

// Normalizers and weights for the composite failure-probability proxy.
// Denominators are the channel envelope maxima, so each term is a fraction
// of full-scale; weights sum to 1.0 which bounds the proxy to [0, 1].
const PROB_WEIGHT_C2H2: f64 = 0.25;
const PROB_SCALE_C2H2: f64 = 200.0;
const PROB_WEIGHT_H2: f64 = 0.20;
const PROB_SCALE_H2: f64 = 500.0;
const PROB_WEIGHT_CH4: f64 = 0.15;
const PROB_SCALE_CH4: f64 = 300.0;
const PROB_WEIGHT_TEMP: f64 = 0.20;
const PROB_SCALE_TEMP: f64 = 150.0;
const PROB_WEIGHT_VIBRATION: f64 = 0.20;
const PROB_SCALE_VIBRATION: f64 = 10.0;

/// Classify one record by disjunctive threshold fusion.
///
/// High iff top-oil temperature, dissolved acetylene, or any vibration axis
/// exceeds its critical threshold; else Medium against the warning
/// thresholds; else Low.
pub fn classify_risk(record: &TelemetryRecord, thresholds: &RiskThresholds) -> RiskLevel {
    let vibration = record.vibration_max();

    if record.temperature_top > thresholds.temperature_critical
        || record.gas_c2h2 > thresholds.acetylene_critical
        || vibration > thresholds.vibration_critical
    {
        return RiskLevel::High;
    }
    if record.temperature_top > thresholds.temperature_warning
        || record.gas_c2h2 > thresholds.acetylene_warning
        || vibration > thresholds.vibration_warning
    {
        return RiskLevel::Medium;
    }
    RiskLevel::Low
}

/// Bounded failure-probability proxy in [0, 1].
///
/// A weighted sum of full-scale fractions of the failure-indicator channels.
/// Monotonically non-decreasing in each indicator and deterministic; used
/// only as an auxiliary regression target, not a calibrated probability.
pub fn failure_probability(record: &TelemetryRecord) -> f64 {
    PROB_WEIGHT_C2H2 * clamp01(record.gas_c2h2 / PROB_SCALE_C2H2)
        + PROB_WEIGHT_H2 * clamp01(record.gas_h2 / PROB_SCALE_H2)
        + PROB_WEIGHT_CH4 * clamp01(record.gas_ch4 / PROB_SCALE_CH4)
        + PROB_WEIGHT_TEMP * clamp01(record.temperature_top / PROB_SCALE_TEMP)
        + PROB_WEIGHT_VIBRATION * clamp01(record.vibration_max() / PROB_SCALE_VIBRATION)
}

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}
