//! Preprocessor - batch cleaning with a per-unit diagnostic report
//!
//! Takes a raw batch (possibly unsorted, with duplicates, nulls, and
//! out-of-envelope values — whether from a generator defect or an externally
//! supplied file) and returns a cleaned batch plus a `CleaningReport`. A pure
//! function of (raw batch, policy): nothing is mutated in place and no state
//! survives a call.
//!
//! Cleaning passes, in order:
//! 1. Sort by (equipment_id, timestamp); resolve duplicate keys keeping the
//!    most recently generated row.
//! 2. Per channel: clip out-of-envelope values; forward-fill nulls within the
//!    configured gap bound, dropping the row beyond it.
//! 3. Per unit: verify the surviving series is a contiguous hourly sequence;
//!    units with un-repairable gaps are excluded wholesale with a diagnostic,
//!    never silently truncated.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::config::{EnvelopeConfig, PreprocessConfig};
use crate::types::{
    EquipmentId, RawTelemetryRecord, SensorChannel, TelemetryRecord, CHANNEL_COUNT,
};

// ============================================================================
// Diagnostics
// ============================================================================

/// Why a unit was excluded from the cleaned batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityIssue {
    #[error("non-contiguous series: {gap_hours} h gap after {last_valid}")]
    NonContiguousSeries {
        last_valid: DateTime<Utc>,
        gap_hours: i64,
    },

    #[error("no rows survived cleaning")]
    EmptySeries,
}

/// Per-unit data-integrity diagnostic. Accumulated alongside the cleaned
/// output; the caller decides whether partial output is acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDiagnostic {
    pub equipment_id: EquipmentId,
    pub issue: IntegrityIssue,
}

/// What the cleaning pass did, by count, plus per-unit exclusions.
#[derive(Debug, Clone, Default)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub output_rows: usize,
    pub duplicates_removed: usize,
    pub values_clipped: usize,
    pub nulls_filled: usize,
    pub rows_dropped: usize,
    pub excluded_units: Vec<UnitDiagnostic>,
}

impl CleaningReport {
    /// True when every row survived untouched.
    pub fn is_clean(&self) -> bool {
        self.duplicates_removed == 0
            && self.values_clipped == 0
            && self.nulls_filled == 0
            && self.rows_dropped == 0
            && self.excluded_units.is_empty()
    }
}

/// Cleaned batch plus its report.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub records: Vec<TelemetryRecord>,
    pub report: CleaningReport,
}

// ============================================================================
// Preprocessor
// ============================================================================

/// Batch cleaner. Holds the envelope table and the null policy; stateless
/// across calls.
pub struct Preprocessor<'a> {
    envelope: &'a EnvelopeConfig,
    policy: &'a PreprocessConfig,
}

impl<'a> Preprocessor<'a> {
    pub fn new(envelope: &'a EnvelopeConfig, policy: &'a PreprocessConfig) -> Self {
        Self { envelope, policy }
    }

    /// Clean a raw batch. The returned records are in ascending
    /// (equipment_id, timestamp) order with every unit's series contiguous.
    pub fn clean(&self, mut raw: Vec<RawTelemetryRecord>) -> CleaningOutcome {
        let mut report = CleaningReport {
            input_rows: raw.len(),
            ..CleaningReport::default()
        };

        // Stable sort so ties keep batch order: within a duplicate run the
        // last element is the most recently generated row.
        raw.sort_by_key(|r| (r.equipment_id, r.timestamp));

        let deduped = self.resolve_duplicates(raw, &mut report);
        let mut input_units: Vec<EquipmentId> = deduped.iter().map(|r| r.equipment_id).collect();
        input_units.dedup();

        let cleaned = self.repair_and_clip(deduped, &mut report);
        let records = self.validate_contiguity(cleaned, &mut report);

        // Units whose every row was dropped never reach the contiguity pass;
        // they are excluded with their own diagnostic rather than vanishing.
        for unit in input_units {
            let survived = records.iter().any(|r| r.equipment_id == unit);
            let already_excluded = report
                .excluded_units
                .iter()
                .any(|d| d.equipment_id == unit);
            if !survived && !already_excluded {
                warn!(equipment = %unit, "Excluding unit: no rows survived cleaning");
                report.excluded_units.push(UnitDiagnostic {
                    equipment_id: unit,
                    issue: IntegrityIssue::EmptySeries,
                });
            }
        }

        report.output_rows = records.len();
        debug!(
            input = report.input_rows,
            output = report.output_rows,
            duplicates = report.duplicates_removed,
            clipped = report.values_clipped,
            filled = report.nulls_filled,
            dropped = report.rows_dropped,
            excluded_units = report.excluded_units.len(),
            "Cleaning pass complete"
        );

        CleaningOutcome { records, report }
    }

    /// Keep the last row of every (equipment_id, timestamp) run.
    fn resolve_duplicates(
        &self,
        sorted: Vec<RawTelemetryRecord>,
        report: &mut CleaningReport,
    ) -> Vec<RawTelemetryRecord> {
        let mut out: Vec<RawTelemetryRecord> = Vec::with_capacity(sorted.len());
        for record in sorted {
            let duplicate = out.last().is_some_and(|prev| {
                prev.equipment_id == record.equipment_id && prev.timestamp == record.timestamp
            });
            if duplicate {
                report.duplicates_removed += 1;
                // Later row wins
                let last = out.len() - 1;
                out[last] = record;
            } else {
                out.push(record);
            }
        }
        out
    }

    /// Clip channel values to their envelopes and forward-fill nulls within
    /// the gap bound. Rows with an unfillable null are dropped.
    fn repair_and_clip(
        &self,
        rows: Vec<RawTelemetryRecord>,
        report: &mut CleaningReport,
    ) -> Vec<TelemetryRecord> {
        let max_gap = self.policy.max_forward_fill_gap as usize;
        let mut out = Vec::with_capacity(rows.len());

        // Fill state is unit-local
        let mut current_unit: Option<EquipmentId> = None;
        let mut last_valid: [Option<f64>; CHANNEL_COUNT] = [None; CHANNEL_COUNT];
        let mut fill_run: [usize; CHANNEL_COUNT] = [0; CHANNEL_COUNT];

        for row in rows {
            if current_unit != Some(row.equipment_id) {
                current_unit = Some(row.equipment_id);
                last_valid = [None; CHANNEL_COUNT];
                fill_run = [0; CHANNEL_COUNT];
            }

            let mut channels = [0.0; CHANNEL_COUNT];
            let mut droppable = false;
            let mut clipped = 0usize;
            let mut filled = 0usize;

            for ch in SensorChannel::ALL {
                let i = ch.index();
                match row.channels[i] {
                    Some(value) => {
                        let env = self.envelope.for_channel(ch);
                        let clipped_value = env.clip(value);
                        if clipped_value != value {
                            clipped += 1;
                        }
                        channels[i] = clipped_value;
                        last_valid[i] = Some(clipped_value);
                        fill_run[i] = 0;
                    }
                    None => match last_valid[i] {
                        Some(prev) if fill_run[i] < max_gap => {
                            channels[i] = prev;
                            fill_run[i] += 1;
                            filled += 1;
                        }
                        _ => {
                            droppable = true;
                            break;
                        }
                    },
                }
            }

            if droppable {
                report.rows_dropped += 1;
                continue;
            }
            report.values_clipped += clipped;
            report.nulls_filled += filled;
            out.push(TelemetryRecord::from_channels(
                row.equipment_id,
                row.timestamp,
                channels,
            ));
        }
        out
    }

    /// Exclude any unit whose surviving series is not a contiguous hourly
    /// sequence, reporting the first gap found.
    fn validate_contiguity(
        &self,
        rows: Vec<TelemetryRecord>,
        report: &mut CleaningReport,
    ) -> Vec<TelemetryRecord> {
        let mut out = Vec::with_capacity(rows.len());
        let mut start = 0;

        for i in 1..=rows.len() {
            let boundary = i == rows.len() || rows[i].equipment_id != rows[start].equipment_id;
            if !boundary {
                continue;
            }
            let series = &rows[start..i];
            let unit = series[0].equipment_id;

            match find_gap(series) {
                Some((last_valid, gap_hours)) => {
                    warn!(
                        equipment = %unit,
                        gap_hours,
                        after = %last_valid,
                        "Excluding unit: non-contiguous series after cleaning"
                    );
                    report.excluded_units.push(UnitDiagnostic {
                        equipment_id: unit,
                        issue: IntegrityIssue::NonContiguousSeries {
                            last_valid,
                            gap_hours,
                        },
                    });
                }
                None => out.extend_from_slice(series),
            }
            start = i;
        }
        out
    }
}

/// First non-hourly step in a sorted unit series, if any.
fn find_gap(series: &[TelemetryRecord]) -> Option<(DateTime<Utc>, i64)> {
    for pair in series.windows(2) {
        let delta = pair[1].timestamp - pair[0].timestamp;
        if delta != Duration::hours(1) {
            return Some((pair[0].timestamp, delta.num_hours()));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + Duration::hours(i64::from(hour))
    }

    /// A nominal in-envelope raw row.
    fn make_raw(unit: EquipmentId, hour: u32) -> RawTelemetryRecord {
        let mut channels = [None; CHANNEL_COUNT];
        let nominal: [f64; CHANNEL_COUNT] = [
            70.0, 60.0, 230.0, 230.0, 230.0, 300.0, 300.0, 300.0, 50.0, 30.0, 5.0, 2.0, 2.0, 2.0,
            45.0, 60.0,
        ];
        for (i, v) in nominal.iter().enumerate() {
            channels[i] = Some(*v);
        }
        RawTelemetryRecord {
            equipment_id: unit,
            timestamp: ts(hour),
            channels,
        }
    }

    fn clean_with_defaults(raw: Vec<RawTelemetryRecord>) -> CleaningOutcome {
        let config = PipelineConfig::default();
        Preprocessor::new(&config.envelope, &config.preprocess).clean(raw)
    }

    #[test]
    fn test_clean_batch_passes_through() {
        let unit = EquipmentId::new(1, 1);
        let raw: Vec<_> = (0..24).map(|h| make_raw(unit, h)).collect();
        let outcome = clean_with_defaults(raw);

        assert_eq!(outcome.records.len(), 24);
        assert!(outcome.report.is_clean());
    }

    #[test]
    fn test_duplicates_keep_most_recent() {
        let unit = EquipmentId::new(1, 1);
        let mut raw: Vec<_> = (0..4).map(|h| make_raw(unit, h)).collect();
        let mut dup = make_raw(unit, 2);
        dup.channels[SensorChannel::TemperatureTop.index()] = Some(99.0);
        raw.push(dup);

        let outcome = clean_with_defaults(raw);
        assert_eq!(outcome.report.duplicates_removed, 1);
        assert_eq!(outcome.records.len(), 4);
        assert_eq!(outcome.records[2].temperature_top, 99.0);
    }

    #[test]
    fn test_out_of_envelope_values_clipped() {
        let unit = EquipmentId::new(1, 1);
        let mut raw: Vec<_> = (0..3).map(|h| make_raw(unit, h)).collect();
        raw[1].channels[SensorChannel::TemperatureTop.index()] = Some(500.0);
        raw[1].channels[SensorChannel::VibrationX.index()] = Some(-3.0);

        let outcome = clean_with_defaults(raw);
        assert_eq!(outcome.report.values_clipped, 2);
        assert_eq!(outcome.records[1].temperature_top, 150.0);
        assert_eq!(outcome.records[1].vibration_x, 0.0);
    }

    #[test]
    fn test_null_forward_filled_within_bound() {
        let unit = EquipmentId::new(1, 1);
        let mut raw: Vec<_> = (0..6).map(|h| make_raw(unit, h)).collect();
        raw[0].channels[SensorChannel::Humidity.index()] = Some(52.0);
        for row in raw.iter_mut().take(4).skip(1) {
            row.channels[SensorChannel::Humidity.index()] = None;
        }

        let outcome = clean_with_defaults(raw);
        assert_eq!(outcome.report.nulls_filled, 3);
        assert_eq!(outcome.report.rows_dropped, 0);
        for record in &outcome.records[1..4] {
            assert_eq!(record.humidity, 52.0);
        }
    }

    #[test]
    fn test_null_beyond_gap_bound_drops_row_and_excludes_unit() {
        let unit = EquipmentId::new(1, 1);
        let mut raw: Vec<_> = (0..8).map(|h| make_raw(unit, h)).collect();
        // 4 consecutive nulls exceeds the default bound of 3: row 5 dropped,
        // leaving an interior gap that excludes the whole unit
        for row in raw.iter_mut().take(5).skip(1) {
            row.channels[SensorChannel::GasH2.index()] = None;
        }

        let outcome = clean_with_defaults(raw);
        assert_eq!(outcome.report.rows_dropped, 1);
        assert_eq!(outcome.report.excluded_units.len(), 1);
        assert!(matches!(
            outcome.report.excluded_units[0].issue,
            IntegrityIssue::NonContiguousSeries { gap_hours: 2, .. }
        ));
        assert!(outcome.records.is_empty());
    }

    #[test]
    fn test_leading_null_drops_row() {
        let unit = EquipmentId::new(1, 1);
        let mut raw: Vec<_> = (0..3).map(|h| make_raw(unit, h)).collect();
        // No prior value to carry forward
        raw[0].channels[SensorChannel::TemperatureTop.index()] = None;

        let outcome = clean_with_defaults(raw);
        assert_eq!(outcome.report.rows_dropped, 1);
        // Remaining series starts at hour 1 and is contiguous, so it survives
        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.report.excluded_units.is_empty());
    }

    #[test]
    fn test_unit_with_no_surviving_rows_reported() {
        let unit = EquipmentId::new(1, 1);
        let mut row = make_raw(unit, 0);
        row.channels[SensorChannel::TemperatureTop.index()] = None;

        let outcome = clean_with_defaults(vec![row]);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.report.excluded_units.len(), 1);
        assert_eq!(
            outcome.report.excluded_units[0].issue,
            IntegrityIssue::EmptySeries
        );
    }

    #[test]
    fn test_gap_excludes_only_offending_unit() {
        let good = EquipmentId::new(1, 1);
        let bad = EquipmentId::new(1, 2);
        let mut raw: Vec<_> = (0..6).map(|h| make_raw(good, h)).collect();
        raw.extend((0..6).filter(|h| *h != 3).map(|h| make_raw(bad, h)));

        let outcome = clean_with_defaults(raw);
        assert_eq!(outcome.records.len(), 6);
        assert!(outcome.records.iter().all(|r| r.equipment_id == good));
        assert_eq!(outcome.report.excluded_units.len(), 1);
        assert_eq!(outcome.report.excluded_units[0].equipment_id, bad);
    }

    #[test]
    fn test_unsorted_input_sorted_on_output() {
        let a = EquipmentId::new(1, 1);
        let b = EquipmentId::new(1, 2);
        let raw = vec![make_raw(b, 1), make_raw(a, 0), make_raw(b, 0), make_raw(a, 1)];

        let outcome = clean_with_defaults(raw);
        let keys: Vec<_> = outcome
            .records
            .iter()
            .map(|r| (r.equipment_id, r.timestamp))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_fill_state_does_not_leak_across_units() {
        let a = EquipmentId::new(1, 1);
        let b = EquipmentId::new(1, 2);
        let mut raw = vec![make_raw(a, 0), make_raw(b, 0)];
        raw[0].channels[SensorChannel::Humidity.index()] = Some(90.0);
        // First row of unit b is null: must drop, not borrow unit a's value
        raw[1].channels[SensorChannel::Humidity.index()] = None;

        let outcome = clean_with_defaults(raw);
        assert_eq!(outcome.report.rows_dropped, 1);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].equipment_id, a);
    }
}
