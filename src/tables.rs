//! Table I/O - CSV/JSON export of the three interface tables and tolerant
//! CSV import of externally supplied raw batches
//!
//! The exported column sets and key invariants are the pipeline's only
//! load-bearing interface; CSV and JSON-lines are convenience encodings of
//! the same tables. The importer follows the same contract as the rest of the
//! ingestion path: rows with unparseable keys are skipped with a warning,
//! missing or blank sensor fields become nulls for the preprocessor to repair.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};

use crate::features::FeatureBatch;
use crate::registry::EquipmentRegistry;
use crate::types::{
    EquipmentId, RawTelemetryRecord, SensorChannel, TelemetryRecord, CHANNEL_COUNT,
};

// ============================================================================
// Raw Telemetry Table
// ============================================================================

/// Header of the 18-column raw telemetry table.
pub fn telemetry_header() -> String {
    let mut cols = vec!["timestamp".to_string(), "equipment_id".to_string()];
    cols.extend(SensorChannel::ALL.iter().map(|ch| ch.name().to_string()));
    cols.join(",")
}

/// Write the raw telemetry table as CSV.
pub fn write_telemetry_csv<W: Write>(
    out: &mut W,
    records: &[TelemetryRecord],
) -> std::io::Result<()> {
    writeln!(out, "{}", telemetry_header())?;
    for record in records {
        write_telemetry_row(out, record)?;
    }
    Ok(())
}

/// Write one telemetry CSV row (used by the chunk-streaming export path).
pub fn write_telemetry_row<W: Write>(out: &mut W, record: &TelemetryRecord) -> std::io::Result<()> {
    write!(
        out,
        "{},{}",
        record.timestamp.to_rfc3339(),
        record.equipment_id
    )?;
    for ch in SensorChannel::ALL {
        write!(out, ",{}", record.channel(ch))?;
    }
    writeln!(out)
}

/// Write the raw telemetry table as JSON lines.
pub fn write_telemetry_jsonl<W: Write>(
    out: &mut W,
    records: &[TelemetryRecord],
) -> std::io::Result<()> {
    for record in records {
        let json = serde_json::to_string(record).map_err(std::io::Error::other)?;
        writeln!(out, "{json}")?;
    }
    Ok(())
}

// ============================================================================
// Equipment Location Table
// ============================================================================

/// Write the static equipment-location table: one row per unit, joined with
/// its substation metadata.
pub fn write_locations_csv<W: Write>(
    out: &mut W,
    registry: &EquipmentRegistry,
) -> std::io::Result<()> {
    writeln!(
        out,
        "equipment_id,substation_id,substation_name,region,federal_district,latitude,longitude,\
         equipment_type,capacity_mw,voltage_class_kv,substation_role,commissioning_year,installation_year"
    )?;
    for unit in registry.units() {
        let Some(substation) = registry.substation_of(unit.id) else {
            continue;
        };
        writeln!(
            out,
            "{},{},{},{},{},{:.6},{:.6},{},{},{},{},{},{}",
            unit.id,
            substation.tag(),
            substation.name,
            substation.region,
            substation.federal_district,
            unit.latitude,
            unit.longitude,
            unit.equipment_type,
            unit.capacity_mw,
            substation.voltage_class_kv,
            substation.role,
            substation.commissioning_year,
            unit.installation_year,
        )?;
    }
    Ok(())
}

// ============================================================================
// Feature Table
// ============================================================================

const TEMPORAL_COLUMNS: [&str; 8] = [
    "hour", "day_of_week", "month", "is_weekend", "hour_sin", "hour_cos", "day_sin", "day_cos",
];
const INTERACTION_COLUMNS: [&str; 2] =
    ["temp_vibration_interaction", "current_voltage_interaction"];
const TARGET_COLUMNS: [&str; 3] = ["risk_level", "failure", "failure_probability"];

/// Header of the feature table: raw schema extended with temporal, rolling,
/// lag/roc, interaction, one-hot, and target columns.
pub fn feature_header(batch: &FeatureBatch) -> String {
    let mut cols = vec!["timestamp".to_string(), "equipment_id".to_string()];
    cols.extend(SensorChannel::ALL.iter().map(|ch| ch.name().to_string()));
    cols.extend(TEMPORAL_COLUMNS.iter().map(|c| (*c).to_string()));
    cols.extend(batch.schema.rolling_columns.iter().cloned());
    cols.extend(batch.schema.lag_columns.iter().cloned());
    cols.extend(batch.schema.roc_columns.iter().cloned());
    cols.extend(INTERACTION_COLUMNS.iter().map(|c| (*c).to_string()));
    cols.extend(batch.schema.one_hot_columns.iter().cloned());
    cols.extend(TARGET_COLUMNS.iter().map(|c| (*c).to_string()));
    cols.join(",")
}

/// Write the feature table as CSV.
pub fn write_features_csv<W: Write>(out: &mut W, batch: &FeatureBatch) -> std::io::Result<()> {
    writeln!(out, "{}", feature_header(batch))?;
    let width = batch.one_hot_width();

    for record in &batch.records {
        write!(
            out,
            "{},{}",
            record.base.timestamp.to_rfc3339(),
            record.base.equipment_id
        )?;
        for ch in SensorChannel::ALL {
            write!(out, ",{}", record.base.channel(ch))?;
        }

        let t = &record.temporal;
        write!(
            out,
            ",{},{},{},{},{},{},{},{}",
            t.hour,
            t.day_of_week,
            t.month,
            u8::from(t.is_weekend),
            t.hour_sin,
            t.hour_cos,
            t.day_sin,
            t.day_cos
        )?;

        for v in record
            .rolling
            .iter()
            .chain(record.lags.iter())
            .chain(record.rate_of_change.iter())
        {
            write!(out, ",{v}")?;
        }
        write!(
            out,
            ",{},{}",
            record.temp_vibration_interaction, record.current_voltage_interaction
        )?;
        for v in record.one_hot(width) {
            write!(out, ",{v}")?;
        }
        writeln!(
            out,
            ",{},{},{}",
            record.risk_level.code(),
            u8::from(record.failure),
            record.failure_probability
        )?;
    }
    Ok(())
}

// ============================================================================
// Raw Telemetry Import
// ============================================================================

/// Read an externally supplied raw telemetry CSV.
///
/// Expected column order matches `telemetry_header()`. Rows with unparseable
/// keys (timestamp or equipment_id) are skipped and counted; blank or
/// unparseable sensor fields become nulls. Returns (rows, skipped count).
pub fn read_raw_csv(path: &str) -> std::io::Result<(Vec<RawTelemetryRecord>, usize)> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut rows = Vec::new();
    let mut skipped = 0usize;
    let mut line_num = 0usize;

    for line_result in reader.lines() {
        line_num += 1;
        let line = match line_result {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(line = line_num, error = %e, "Error reading CSV line");
                skipped += 1;
                continue;
            }
        };

        // Skip header line
        if line_num == 1 && line.starts_with("timestamp") {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        match parse_raw_line(&line) {
            Ok(row) => rows.push(row),
            Err(e) => {
                tracing::warn!(line = line_num, error = %e, "Skipping unparseable CSV row");
                skipped += 1;
            }
        }
    }

    tracing::info!(rows = rows.len(), skipped, path = %path, "Loaded raw telemetry CSV");
    Ok((rows, skipped))
}

fn parse_raw_line(line: &str) -> Result<RawTelemetryRecord, String> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 2 + CHANNEL_COUNT {
        return Err(format!(
            "expected {} fields, got {}",
            2 + CHANNEL_COUNT,
            fields.len()
        ));
    }

    let timestamp = parse_timestamp(fields[0])?;
    let equipment_id = EquipmentId::parse(fields[1].trim())
        .ok_or_else(|| format!("invalid equipment id '{}'", fields[1]))?;

    let mut channels = [None; CHANNEL_COUNT];
    for ch in SensorChannel::ALL {
        let raw = fields[2 + ch.index()].trim();
        channels[ch.index()] = if raw.is_empty() {
            None
        } else {
            // An unparseable value is treated as a null reading, not a fatal row
            raw.parse::<f64>().ok()
        };
    }

    Ok(RawTelemetryRecord {
        equipment_id,
        timestamp,
        channels,
    })
}

/// Parse an RFC 3339 timestamp, falling back to the naive
/// `YYYY-MM-DD HH:MM:SS` form (interpreted as UTC).
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|naive| naive.and_utc())
                .map_err(|e| format!("cannot parse timestamp '{s}': {e}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::features::FeatureEngine;
    use crate::simulator::TelemetrySimulator;
    use std::io::Write as _;

    fn small_setup() -> (PipelineConfig, EquipmentRegistry, Vec<TelemetryRecord>) {
        let mut config = PipelineConfig::default();
        config.fleet.substations = 1;
        config.fleet.equipment_per_substation = 2;
        config.simulation.horizon_hours = 6;
        let registry = EquipmentRegistry::build(&config).unwrap();
        let records = TelemetrySimulator::new(&registry, &config)
            .unwrap()
            .simulate();
        (config, registry, records)
    }

    #[test]
    fn test_telemetry_header_has_18_columns() {
        assert_eq!(telemetry_header().split(',').count(), 18);
    }

    #[test]
    fn test_telemetry_csv_roundtrip() {
        let (_, _, records) = small_setup();
        let mut buf = Vec::new();
        write_telemetry_csv(&mut buf, &records).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&buf).unwrap();
        let (rows, skipped) = read_raw_csv(file.path().to_str().unwrap()).unwrap();

        assert_eq!(skipped, 0);
        assert_eq!(rows.len(), records.len());
        assert_eq!(rows[0].equipment_id, records[0].equipment_id);
        assert_eq!(rows[0].timestamp, records[0].timestamp);
        let i = SensorChannel::TemperatureTop.index();
        assert!((rows[0].channels[i].unwrap() - records[0].temperature_top).abs() < 1e-9);
    }

    #[test]
    fn test_reader_skips_bad_rows_and_nulls_blank_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", telemetry_header()).unwrap();
        // Bad equipment id
        writeln!(
            file,
            "2023-01-01T00:00:00+00:00,BOGUS,1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16"
        )
        .unwrap();
        // Blank humidity (15th channel) -> null
        writeln!(
            file,
            "2023-01-01T00:00:00+00:00,SUB001_EQ01,1,2,3,4,5,6,7,8,9,10,11,12,13,14,,16"
        )
        .unwrap();

        let (rows, skipped) = read_raw_csv(file.path().to_str().unwrap()).unwrap();
        assert_eq!(skipped, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].channels[SensorChannel::Humidity.index()], None);
        assert_eq!(
            rows[0].channels[SensorChannel::LoadPercentage.index()],
            Some(16.0)
        );
    }

    #[test]
    fn test_naive_timestamp_accepted() {
        let ts = parse_timestamp("2023-01-01 12:00:00").unwrap();
        assert_eq!(ts, parse_timestamp("2023-01-01T12:00:00Z").unwrap());
    }

    #[test]
    fn test_locations_table_one_row_per_unit() {
        let (_, registry, _) = small_setup();
        let mut buf = Vec::new();
        write_locations_csv(&mut buf, &registry).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 1 + registry.len());
        assert!(lines[1].starts_with("SUB001_EQ01,SUB001,Podolsk"));
    }

    #[test]
    fn test_feature_csv_column_count_matches_header() {
        let (config, registry, records) = small_setup();
        let engine = FeatureEngine::new(&config, &registry).unwrap();
        let batch = engine.derive(&records);

        let mut buf = Vec::new();
        write_features_csv(&mut buf, &batch).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        let header_cols = lines.next().unwrap().split(',').count();
        for line in lines {
            assert_eq!(line.split(',').count(), header_cols);
        }

        // 18 raw + 8 temporal + 256 rolling + 16 lag + 4 roc + 2 interaction
        // + 2 one-hot + 3 targets
        assert_eq!(header_cols, 18 + 8 + 256 + 16 + 4 + 2 + 2 + 3);
    }

    #[test]
    fn test_jsonl_rows_parse_back() {
        let (_, _, records) = small_setup();
        let mut buf = Vec::new();
        write_telemetry_jsonl(&mut buf, &records[..3]).unwrap();
        let text = String::from_utf8(buf).unwrap();

        for (line, original) in text.lines().zip(&records[..3]) {
            let parsed: TelemetryRecord = serde_json::from_str(line).unwrap();
            assert_eq!(parsed.equipment_id, original.equipment_id);
            assert_eq!(parsed.timestamp, original.timestamp);
        }
    }
}
