//! Telemetry record types and the fixed sensor channel catalogue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EquipmentId;

/// Number of sensor channels in the fixed telemetry schema.
pub const CHANNEL_COUNT: usize = 16;

/// The fixed sensor channel catalogue, grouped by modality.
///
/// The discriminant order is the column order of the exported telemetry table
/// and the index into channel-array representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorChannel {
    // === Thermal ===
    TemperatureTop,
    TemperatureOil,
    // === Electrical (three-phase) ===
    VoltagePhaseA,
    VoltagePhaseB,
    VoltagePhaseC,
    CurrentPhaseA,
    CurrentPhaseB,
    CurrentPhaseC,
    // === Dissolved gas ===
    GasH2,
    GasCh4,
    GasC2h2,
    // === Mechanical vibration ===
    VibrationX,
    VibrationY,
    VibrationZ,
    // === Ambient / load ===
    Humidity,
    LoadPercentage,
}

impl SensorChannel {
    /// All channels in schema order.
    pub const ALL: [SensorChannel; CHANNEL_COUNT] = [
        SensorChannel::TemperatureTop,
        SensorChannel::TemperatureOil,
        SensorChannel::VoltagePhaseA,
        SensorChannel::VoltagePhaseB,
        SensorChannel::VoltagePhaseC,
        SensorChannel::CurrentPhaseA,
        SensorChannel::CurrentPhaseB,
        SensorChannel::CurrentPhaseC,
        SensorChannel::GasH2,
        SensorChannel::GasCh4,
        SensorChannel::GasC2h2,
        SensorChannel::VibrationX,
        SensorChannel::VibrationY,
        SensorChannel::VibrationZ,
        SensorChannel::Humidity,
        SensorChannel::LoadPercentage,
    ];

    /// Index into channel-array representations (schema order).
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Column name in the exported tables.
    pub fn name(&self) -> &'static str {
        match self {
            SensorChannel::TemperatureTop => "temperature_top",
            SensorChannel::TemperatureOil => "temperature_oil",
            SensorChannel::VoltagePhaseA => "voltage_phase_a",
            SensorChannel::VoltagePhaseB => "voltage_phase_b",
            SensorChannel::VoltagePhaseC => "voltage_phase_c",
            SensorChannel::CurrentPhaseA => "current_phase_a",
            SensorChannel::CurrentPhaseB => "current_phase_b",
            SensorChannel::CurrentPhaseC => "current_phase_c",
            SensorChannel::GasH2 => "gas_h2",
            SensorChannel::GasCh4 => "gas_ch4",
            SensorChannel::GasC2h2 => "gas_c2h2",
            SensorChannel::VibrationX => "vibration_x",
            SensorChannel::VibrationY => "vibration_y",
            SensorChannel::VibrationZ => "vibration_z",
            SensorChannel::Humidity => "humidity",
            SensorChannel::LoadPercentage => "load_percentage",
        }
    }
}

/// One multivariate sensor reading for one equipment unit at one hour.
///
/// Timestamps within a unit's series are strictly increasing and hourly-spaced
/// with no gaps across the simulation horizon. Records are immutable after
/// creation; the preprocessor produces cleaned copies rather than mutating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub equipment_id: EquipmentId,
    pub timestamp: DateTime<Utc>,

    // === Thermal ===
    /// Top-oil temperature (°C) - primary thermal failure indicator
    pub temperature_top: f64,
    /// Bulk oil temperature (°C)
    pub temperature_oil: f64,

    // === Electrical ===
    /// Phase A voltage (V)
    pub voltage_phase_a: f64,
    /// Phase B voltage (V)
    pub voltage_phase_b: f64,
    /// Phase C voltage (V)
    pub voltage_phase_c: f64,
    /// Phase A current (A)
    pub current_phase_a: f64,
    /// Phase B current (A)
    pub current_phase_b: f64,
    /// Phase C current (A)
    pub current_phase_c: f64,

    // === Dissolved gas analysis ===
    /// Hydrogen (ppm)
    pub gas_h2: f64,
    /// Methane (ppm)
    pub gas_ch4: f64,
    /// Acetylene (ppm) - critical failure indicator
    pub gas_c2h2: f64,

    // === Vibration ===
    /// X-axis vibration (mm/s)
    pub vibration_x: f64,
    /// Y-axis vibration (mm/s)
    pub vibration_y: f64,
    /// Z-axis vibration (mm/s)
    pub vibration_z: f64,

    // === Ambient / load ===
    /// Ambient humidity (%)
    pub humidity: f64,
    /// Load factor (%), 30-100
    pub load_percentage: f64,
}

impl TelemetryRecord {
    /// Build a record from a channel array in schema order.
    pub fn from_channels(
        equipment_id: EquipmentId,
        timestamp: DateTime<Utc>,
        channels: [f64; CHANNEL_COUNT],
    ) -> Self {
        Self {
            equipment_id,
            timestamp,
            temperature_top: channels[0],
            temperature_oil: channels[1],
            voltage_phase_a: channels[2],
            voltage_phase_b: channels[3],
            voltage_phase_c: channels[4],
            current_phase_a: channels[5],
            current_phase_b: channels[6],
            current_phase_c: channels[7],
            gas_h2: channels[8],
            gas_ch4: channels[9],
            gas_c2h2: channels[10],
            vibration_x: channels[11],
            vibration_y: channels[12],
            vibration_z: channels[13],
            humidity: channels[14],
            load_percentage: channels[15],
        }
    }

    /// Read a channel value by catalogue entry.
    pub fn channel(&self, ch: SensorChannel) -> f64 {
        match ch {
            SensorChannel::TemperatureTop => self.temperature_top,
            SensorChannel::TemperatureOil => self.temperature_oil,
            SensorChannel::VoltagePhaseA => self.voltage_phase_a,
            SensorChannel::VoltagePhaseB => self.voltage_phase_b,
            SensorChannel::VoltagePhaseC => self.voltage_phase_c,
            SensorChannel::CurrentPhaseA => self.current_phase_a,
            SensorChannel::CurrentPhaseB => self.current_phase_b,
            SensorChannel::CurrentPhaseC => self.current_phase_c,
            SensorChannel::GasH2 => self.gas_h2,
            SensorChannel::GasCh4 => self.gas_ch4,
            SensorChannel::GasC2h2 => self.gas_c2h2,
            SensorChannel::VibrationX => self.vibration_x,
            SensorChannel::VibrationY => self.vibration_y,
            SensorChannel::VibrationZ => self.vibration_z,
            SensorChannel::Humidity => self.humidity,
            SensorChannel::LoadPercentage => self.load_percentage,
        }
    }

    /// All channel values in schema order.
    pub fn channels(&self) -> [f64; CHANNEL_COUNT] {
        let mut out = [0.0; CHANNEL_COUNT];
        for ch in SensorChannel::ALL {
            out[ch.index()] = self.channel(ch);
        }
        out
    }

    /// Largest vibration reading across the three axes.
    pub fn vibration_max(&self) -> f64 {
        self.vibration_x.max(self.vibration_y).max(self.vibration_z)
    }
}

/// A telemetry row as received from an external source: sensor channels may be
/// missing. The preprocessor repairs or drops these rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTelemetryRecord {
    pub equipment_id: EquipmentId,
    pub timestamp: DateTime<Utc>,
    /// Channel values in schema order; `None` marks a null reading
    pub channels: [Option<f64>; CHANNEL_COUNT],
}

impl From<TelemetryRecord> for RawTelemetryRecord {
    fn from(record: TelemetryRecord) -> Self {
        let mut channels = [None; CHANNEL_COUNT];
        for ch in SensorChannel::ALL {
            channels[ch.index()] = Some(record.channel(ch));
        }
        Self {
            equipment_id: record.equipment_id,
            timestamp: record.timestamp,
            channels,
        }
    }
}
