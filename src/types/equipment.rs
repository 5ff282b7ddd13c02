//! Equipment identity and static fleet metadata

use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite equipment key: substation number + slot index within the substation.
///
/// Both components are 1-based. The canonical string form is `SUB{:03}_EQ{:02}`,
/// e.g. `SUB001_EQ07`, which is the stable join key across all exported tables
/// and the serde representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EquipmentId {
    /// Substation number (1-based)
    pub substation: u32,
    /// Slot index within the substation (1-based)
    pub slot: u32,
}

impl Serialize for EquipmentId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EquipmentId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid equipment id '{s}'")))
    }
}

impl EquipmentId {
    pub fn new(substation: u32, slot: u32) -> Self {
        Self { substation, slot }
    }

    /// Canonical substation tag, e.g. `SUB001`
    pub fn substation_tag(&self) -> String {
        format!("SUB{:03}", self.substation)
    }

    /// Parse the canonical `SUBxxx_EQyy` form.
    pub fn parse(s: &str) -> Option<Self> {
        let (sub, eq) = s.split_once('_')?;
        let substation = sub.strip_prefix("SUB")?.parse().ok()?;
        let slot = eq.strip_prefix("EQ")?.parse().ok()?;
        Some(Self { substation, slot })
    }
}

impl fmt::Display for EquipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SUB{:03}_EQ{:02}", self.substation, self.slot)
    }
}

/// Equipment category, assigned by slot position within a substation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquipmentType {
    PowerTransformer,
    DistributionTransformer,
    CircuitBreaker,
    VoltageRegulator,
}

impl EquipmentType {
    /// Human-readable label used in the location table.
    pub fn label(&self) -> &'static str {
        match self {
            EquipmentType::PowerTransformer => "Power Transformer",
            EquipmentType::DistributionTransformer => "Distribution Transformer",
            EquipmentType::CircuitBreaker => "Circuit Breaker",
            EquipmentType::VoltageRegulator => "Voltage Regulator",
        }
    }
}

impl fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Substation role in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubstationRole {
    Distribution,
    Transit,
}

impl fmt::Display for SubstationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubstationRole::Distribution => write!(f, "Distribution"),
            SubstationRole::Transit => write!(f, "Transit"),
        }
    }
}

/// Static substation metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Substation {
    /// Substation number (1-based), matches `EquipmentId::substation`
    pub number: u32,
    /// Station name, e.g. "Podolsk"
    pub name: String,
    /// Administrative region
    pub region: String,
    /// Federal district grouping used by the dashboard map
    pub federal_district: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Nominal voltage class (kV)
    pub voltage_class_kv: u32,
    pub commissioning_year: u32,
    pub role: SubstationRole,
}

impl Substation {
    /// Canonical substation tag, e.g. `SUB001`
    pub fn tag(&self) -> String {
        format!("SUB{:03}", self.number)
    }
}

/// One monitored piece of grid hardware. Immutable once the registry is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentUnit {
    pub id: EquipmentId,
    pub equipment_type: EquipmentType,
    /// Rated capacity (MW)
    pub capacity_mw: f64,
    /// Unit position: substation coordinates plus a small per-unit offset
    pub latitude: f64,
    pub longitude: f64,
    pub installation_year: u32,
}
