//! Feature record types and the risk classification enum

use serde::{Deserialize, Serialize};

use super::TelemetryRecord;

/// Discrete risk classification derived per record from sensor thresholds.
///
/// Totally ordered Low < Medium < High. The numeric discriminants (0/1/2) are
/// the stable values used as join keys by downstream consumers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskLevel {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    /// Stable numeric code used in exported tables.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Low
    }
}

/// Calendar encodings of a record's timestamp.
///
/// Hour and day-of-week carry both the integer form and a sine/cosine pair so
/// models see the cyclical wrap (23:00 is adjacent to 00:00).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalFeatures {
    /// Hour of day, 0-23
    pub hour: u32,
    /// Day of week, 0 = Monday .. 6 = Sunday
    pub day_of_week: u32,
    /// Month, 1-12
    pub month: u32,
    pub is_weekend: bool,
    pub hour_sin: f64,
    pub hour_cos: f64,
    pub day_sin: f64,
    pub day_cos: f64,
}

/// One feature row per telemetry record.
///
/// Extends the cleaned record with temporal encodings, rolling-window
/// statistics, lag/rate-of-change supplements, the one-hot slot of the
/// equipment identity, and the derived risk label. Rolling/lag/roc vectors are
/// laid out in the column order published by the feature schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub base: TelemetryRecord,
    pub temporal: TemporalFeatures,
    /// Rolling statistics: channel-major, then window, then mean/std/min/max
    pub rolling: Vec<f64>,
    /// Lagged values for the key channels, zero-filled before series start
    pub lags: Vec<f64>,
    /// First differences for the key channels, zero at series start
    pub rate_of_change: Vec<f64>,
    /// temperature_top × max vibration axis
    pub temp_vibration_interaction: f64,
    /// current_phase_a × voltage_phase_a
    pub current_voltage_interaction: f64,
    /// One-hot slot of the equipment identity; `None` for identities unseen at
    /// pipeline build, which encode as the all-zeros vector
    pub equipment_slot: Option<usize>,
    pub risk_level: RiskLevel,
    /// Supervised-learning target: true iff the record classifies High
    pub failure: bool,
    /// Monotonic failure-probability proxy in [0, 1]
    pub failure_probability: f64,
}

impl FeatureRecord {
    /// Materialize the one-hot equipment encoding at the given width.
    /// Unseen identities produce the all-zeros vector.
    pub fn one_hot(&self, width: usize) -> Vec<f64> {
        let mut v = vec![0.0; width];
        if let Some(slot) = self.equipment_slot {
            if slot < width {
                v[slot] = 1.0;
            }
        }
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert_eq!(RiskLevel::High.code(), 2);
        assert_eq!(RiskLevel::default(), RiskLevel::Low);
    }

    #[test]
    fn test_risk_level_display() {
        assert_eq!(RiskLevel::Low.to_string(), "LOW");
        assert_eq!(RiskLevel::High.to_string(), "HIGH");
    }
}
