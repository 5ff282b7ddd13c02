//! Equipment Registry - fleet construction and the degradation schedule
//!
//! Builds the immutable fleet exactly once: substation catalogue, per-slot
//! equipment units, and the `DegradationSchedule` that pre-selects which units
//! receive a degradation episode within the horizon. The schedule is computed
//! here, at registry-build time, and threaded as a parameter into the
//! simulator — episode state is never mutated during generation.
//!
//! The first ten substations come from a named catalogue with real geographic
//! coordinates (spanning hot southern to arctic climates, which the dashboard
//! map uses to show regional spread); fleets larger than the catalogue are
//! laid out on a jittered geographic grid.

use rand::prelude::*;
use std::collections::HashMap;
use tracing::info;

use crate::config::{ConfigError, PipelineConfig};
use crate::types::{EquipmentId, EquipmentType, EquipmentUnit, Substation, SubstationRole};

// ============================================================================
// Degradation Schedule
// ============================================================================

/// One pre-failure degradation interval `[onset_hour, failure_hour)`.
///
/// Severity follows a convex ramp: 0 before onset, `progress²` inside the
/// episode, 1.0 at and after the failure hour. At most one episode exists per
/// unit per simulated lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DegradationEpisode {
    /// First hour of degraded behavior (offset into the horizon)
    pub onset_hour: u32,
    /// Hour of simulated failure
    pub failure_hour: u32,
}

impl DegradationEpisode {
    /// Severity multiplier in [0, 1] at the given hour offset.
    pub fn severity_at(&self, hour: u32) -> f64 {
        if hour < self.onset_hour {
            return 0.0;
        }
        if hour >= self.failure_hour {
            return 1.0;
        }
        let span = f64::from(self.failure_hour - self.onset_hour);
        let progress = f64::from(hour - self.onset_hour) / span;
        progress * progress
    }

    /// Episode length in hours.
    pub fn duration_hours(&self) -> u32 {
        self.failure_hour - self.onset_hour
    }
}

/// Immutable map from flagged units to their episode. Computed once at
/// registry build; units absent from the map run normally for the whole
/// horizon (a normal branch, not an error).
#[derive(Debug, Clone, Default)]
pub struct DegradationSchedule {
    episodes: HashMap<EquipmentId, DegradationEpisode>,
}

impl DegradationSchedule {
    /// Build a schedule from explicit episodes. The registry draws its own
    /// schedule at build time; this constructor exists for scenario work
    /// where the episode geometry is prescribed.
    pub fn from_episodes(
        episodes: impl IntoIterator<Item = (EquipmentId, DegradationEpisode)>,
    ) -> Self {
        Self {
            episodes: episodes.into_iter().collect(),
        }
    }

    pub fn episode(&self, id: EquipmentId) -> Option<&DegradationEpisode> {
        self.episodes.get(&id)
    }

    /// Severity for a unit at an hour offset; 0.0 for unflagged units.
    pub fn severity_at(&self, id: EquipmentId, hour: u32) -> f64 {
        self.episodes
            .get(&id)
            .map_or(0.0, |episode| episode.severity_at(hour))
    }

    /// Number of units flagged with an episode.
    pub fn flagged_count(&self) -> usize {
        self.episodes.len()
    }

    pub fn flagged_units(&self) -> impl Iterator<Item = (&EquipmentId, &DegradationEpisode)> {
        self.episodes.iter()
    }
}

// Episode geometry (hours). Onset precedes failure by one week to one month.
const ONSET_LEAD_MIN_HOURS: u32 = 168;
const ONSET_LEAD_MAX_HOURS: u32 = 720;
/// Failures never occur in the first fifth of the horizon, so every flagged
/// unit has a healthy baseline period.
const FAILURE_EARLIEST_FRACTION: f64 = 0.2;

// ============================================================================
// Substation Catalogue
// ============================================================================

struct CatalogueEntry {
    name: &'static str,
    region: &'static str,
    federal_district: &'static str,
    latitude: f64,
    longitude: f64,
    voltage_class_kv: u32,
    commissioning_year: u32,
    role: SubstationRole,
}

/// Ten named substations across five federal districts, two per district.
const SUBSTATION_CATALOGUE: [CatalogueEntry; 10] = [
    CatalogueEntry {
        name: "Podolsk",
        region: "Moscow Oblast",
        federal_district: "Central",
        latitude: 55.424,
        longitude: 37.547,
        voltage_class_kv: 110,
        commissioning_year: 1985,
        role: SubstationRole::Distribution,
    },
    CatalogueEntry {
        name: "Tula",
        region: "Tula Oblast",
        federal_district: "Central",
        latitude: 54.193,
        longitude: 37.618,
        voltage_class_kv: 110,
        commissioning_year: 1989,
        role: SubstationRole::Distribution,
    },
    CatalogueEntry {
        name: "Krasnodar",
        region: "Krasnodar Krai",
        federal_district: "Southern",
        latitude: 45.035,
        longitude: 38.975,
        voltage_class_kv: 110,
        commissioning_year: 1988,
        role: SubstationRole::Transit,
    },
    CatalogueEntry {
        name: "Rostov-on-Don",
        region: "Rostov Oblast",
        federal_district: "Southern",
        latitude: 47.222,
        longitude: 39.720,
        voltage_class_kv: 220,
        commissioning_year: 1990,
        role: SubstationRole::Distribution,
    },
    CatalogueEntry {
        name: "Kazan",
        region: "Tatarstan",
        federal_district: "Volga",
        latitude: 55.796,
        longitude: 49.108,
        voltage_class_kv: 220,
        commissioning_year: 1992,
        role: SubstationRole::Distribution,
    },
    CatalogueEntry {
        name: "Nizhny Novgorod",
        region: "Nizhny Novgorod Oblast",
        federal_district: "Volga",
        latitude: 56.326,
        longitude: 44.006,
        voltage_class_kv: 110,
        commissioning_year: 1987,
        role: SubstationRole::Transit,
    },
    CatalogueEntry {
        name: "Novosibirsk",
        region: "Novosibirsk Oblast",
        federal_district: "Siberian",
        latitude: 55.030,
        longitude: 82.920,
        voltage_class_kv: 110,
        commissioning_year: 1978,
        role: SubstationRole::Transit,
    },
    CatalogueEntry {
        name: "Krasnoyarsk",
        region: "Krasnoyarsk Krai",
        federal_district: "Siberian",
        latitude: 56.010,
        longitude: 92.852,
        voltage_class_kv: 220,
        commissioning_year: 1982,
        role: SubstationRole::Distribution,
    },
    CatalogueEntry {
        name: "Saint Petersburg",
        region: "Leningrad Oblast",
        federal_district: "Northwestern",
        latitude: 59.939,
        longitude: 30.316,
        voltage_class_kv: 220,
        commissioning_year: 1995,
        role: SubstationRole::Distribution,
    },
    CatalogueEntry {
        name: "Murmansk",
        region: "Murmansk Oblast",
        federal_district: "Northwestern",
        latitude: 68.970,
        longitude: 33.075,
        voltage_class_kv: 110,
        commissioning_year: 1993,
        role: SubstationRole::Transit,
    },
];

// Synthesized-grid layout for fleets beyond the catalogue
const GRID_BASE_LATITUDE: f64 = 50.0;
const GRID_BASE_LONGITUDE: f64 = 40.0;
const GRID_LATITUDE_SPAN: f64 = 2.0;
const GRID_LONGITUDE_SPAN: f64 = 3.0;

// ============================================================================
// Registry
// ============================================================================

/// The immutable fleet: substations, equipment units, and the degradation
/// schedule. Built once from configuration; read-only thereafter.
#[derive(Debug, Clone)]
pub struct EquipmentRegistry {
    substations: Vec<Substation>,
    units: Vec<EquipmentUnit>,
    schedule: DegradationSchedule,
}

impl EquipmentRegistry {
    /// Build the fleet from configuration. Deterministic given the seed.
    pub fn build(config: &PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(config.simulation.seed);
        let substations = build_substations(config.fleet.substations, &mut rng);
        let units = build_units(&substations, config.fleet.equipment_per_substation, &mut rng);
        let schedule = build_schedule(
            &units,
            config.simulation.horizon_hours,
            config.simulation.degradation_fraction,
            &mut rng,
        );

        info!(
            substations = substations.len(),
            units = units.len(),
            flagged = schedule.flagged_count(),
            "Equipment registry built"
        );

        Ok(Self {
            substations,
            units,
            schedule,
        })
    }

    pub fn substations(&self) -> &[Substation] {
        &self.substations
    }

    /// Units in ascending `EquipmentId` order.
    pub fn units(&self) -> &[EquipmentUnit] {
        &self.units
    }

    pub fn schedule(&self) -> &DegradationSchedule {
        &self.schedule
    }

    /// Replace the drawn schedule with a prescribed one (scenario runs).
    pub fn with_schedule(mut self, schedule: DegradationSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Substation owning a unit. Substation numbers are 1-based and contiguous.
    pub fn substation_of(&self, id: EquipmentId) -> Option<&Substation> {
        self.substations.get(id.substation as usize - 1)
    }
}

fn build_substations(count: u32, rng: &mut StdRng) -> Vec<Substation> {
    let grid_size = (f64::from(count).sqrt().floor() as usize).max(1);

    (1..=count)
        .map(|number| {
            let idx = (number - 1) as usize;
            if let Some(entry) = SUBSTATION_CATALOGUE.get(idx) {
                return Substation {
                    number,
                    name: entry.name.to_string(),
                    region: entry.region.to_string(),
                    federal_district: entry.federal_district.to_string(),
                    latitude: entry.latitude,
                    longitude: entry.longitude,
                    voltage_class_kv: entry.voltage_class_kv,
                    commissioning_year: entry.commissioning_year,
                    role: entry.role,
                };
            }

            // Beyond the catalogue: jittered grid positions
            let row = idx / grid_size;
            let col = idx % grid_size;
            let latitude = GRID_BASE_LATITUDE
                + (row as f64 / grid_size as f64) * GRID_LATITUDE_SPAN
                + rng.gen_range(-0.05..0.05);
            let longitude = GRID_BASE_LONGITUDE
                + (col as f64 / grid_size as f64) * GRID_LONGITUDE_SPAN
                + rng.gen_range(-0.05..0.05);

            Substation {
                number,
                name: format!("SUB{number:03}"),
                region: "Synthesized".to_string(),
                federal_district: "Synthesized".to_string(),
                latitude,
                longitude,
                voltage_class_kv: if number % 3 == 0 { 220 } else { 110 },
                commissioning_year: 1975 + (number % 40),
                role: if number % 2 == 0 {
                    SubstationRole::Distribution
                } else {
                    SubstationRole::Transit
                },
            }
        })
        .collect()
}

fn build_units(
    substations: &[Substation],
    per_substation: u32,
    rng: &mut StdRng,
) -> Vec<EquipmentUnit> {
    let mut units = Vec::with_capacity(substations.len() * per_substation as usize);

    for substation in substations {
        for slot in 1..=per_substation {
            let (equipment_type, capacities): (EquipmentType, &[f64]) = match slot {
                1..=3 => (EquipmentType::PowerTransformer, &[50.0, 100.0, 150.0, 200.0]),
                4..=6 => (EquipmentType::DistributionTransformer, &[10.0, 25.0, 50.0]),
                7..=8 => (EquipmentType::CircuitBreaker, &[100.0, 150.0, 200.0]),
                _ => (EquipmentType::VoltageRegulator, &[50.0, 75.0, 100.0]),
            };
            let capacity_mw = *capacities.choose(rng).unwrap_or(&capacities[0]);

            units.push(EquipmentUnit {
                id: EquipmentId::new(substation.number, slot),
                equipment_type,
                capacity_mw,
                latitude: substation.latitude + rng.gen_range(-0.001..0.001),
                longitude: substation.longitude + rng.gen_range(-0.001..0.001),
                installation_year: rng.gen_range(1990..2023),
            });
        }
    }

    units
}

fn build_schedule(
    units: &[EquipmentUnit],
    horizon_hours: u32,
    degradation_fraction: f64,
    rng: &mut StdRng,
) -> DegradationSchedule {
    let mut episodes = HashMap::new();
    let earliest_failure = (f64::from(horizon_hours) * FAILURE_EARLIEST_FRACTION) as u32;

    for unit in units {
        if rng.gen::<f64>() >= degradation_fraction {
            continue;
        }
        // Horizons too short to fit an episode past the baseline period leave
        // the unit unflagged rather than producing a degenerate interval.
        if earliest_failure >= horizon_hours {
            continue;
        }
        let failure_hour = rng.gen_range(earliest_failure..horizon_hours);
        let lead = rng.gen_range(ONSET_LEAD_MIN_HOURS..ONSET_LEAD_MAX_HOURS);
        let onset_hour = failure_hour.saturating_sub(lead);
        episodes.insert(
            unit.id,
            DegradationEpisode {
                onset_hour,
                failure_hour,
            },
        );
    }

    DegradationSchedule { episodes }
}
