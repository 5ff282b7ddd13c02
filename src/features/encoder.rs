//! One-hot equipment identity encoder
//!
//! Width is fixed at pipeline build from the registry cardinality. Identities
//! unseen at build time map to the explicit all-zeros default instead of
//! widening the encoding or failing.

use std::collections::HashMap;
use tracing::debug;

use crate::types::{EquipmentId, EquipmentUnit};

#[derive(Debug, Clone)]
pub struct OneHotEncoder {
    slots: HashMap<EquipmentId, usize>,
    /// Column names in slot order, e.g. `equipment_SUB001_EQ01`
    columns: Vec<String>,
}

impl OneHotEncoder {
    /// Fit the encoder to the registry's units, in registry order.
    pub fn fit(units: &[EquipmentUnit]) -> Self {
        let slots = units
            .iter()
            .enumerate()
            .map(|(slot, unit)| (unit.id, slot))
            .collect();
        let columns = units
            .iter()
            .map(|unit| format!("equipment_{}", unit.id))
            .collect();
        Self { slots, columns }
    }

    /// Encoding width (registry cardinality at build time).
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Slot for an identity, or `None` for identities unseen at build time
    /// (which encode as all zeros).
    pub fn slot(&self, id: EquipmentId) -> Option<usize> {
        let slot = self.slots.get(&id).copied();
        if slot.is_none() {
            debug!(equipment = %id, "Unseen equipment identity encodes as all zeros");
        }
        slot
    }

    /// One-hot column names in slot order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::registry::EquipmentRegistry;

    fn make_encoder() -> OneHotEncoder {
        let mut config = PipelineConfig::default();
        config.fleet.substations = 2;
        config.fleet.equipment_per_substation = 3;
        config.simulation.horizon_hours = 48;
        let registry = EquipmentRegistry::build(&config).unwrap();
        OneHotEncoder::fit(registry.units())
    }

    #[test]
    fn test_width_matches_registry_cardinality() {
        let encoder = make_encoder();
        assert_eq!(encoder.width(), 6);
        assert_eq!(encoder.columns().len(), 6);
        assert_eq!(encoder.columns()[0], "equipment_SUB001_EQ01");
    }

    #[test]
    fn test_known_identities_get_distinct_slots() {
        let encoder = make_encoder();
        let a = encoder.slot(EquipmentId::new(1, 1));
        let b = encoder.slot(EquipmentId::new(2, 3));
        assert!(a.is_some());
        assert!(b.is_some());
        assert_ne!(a, b);
    }

    #[test]
    fn test_unseen_identity_is_none_not_panic() {
        let encoder = make_encoder();
        assert_eq!(encoder.slot(EquipmentId::new(99, 1)), None);
    }
}
