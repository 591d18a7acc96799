//! Mapping from demanded bandwidth (or transmission distance) to FSU demand.

use crate::units::Fsus;

/// Modulation family named by the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModulationKind {
    #[default]
    Passband,
    Gigabits,
    Terabits,
}

/// A concrete modulation format. Passband converts bandwidth through the
/// spectral efficiency of the request's modulation; the adaptive families
/// step on transmission distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModulationFormat {
    Passband {
        slot_width: f64,
        spectral_efficiency: u64,
    },
    Gigabits,
    Terabits,
}

const GIGABITS_STEPS: [(f64, u64); 7] = [
    (160.0, 5),
    (880.0, 6),
    (2480.0, 7),
    (3120.0, 9),
    (5000.0, 10),
    (6080.0, 12),
    (8000.0, 13),
];

const TERABITS_STEPS: [(f64, u64); 7] = [
    (400.0, 14),
    (800.0, 15),
    (1600.0, 17),
    (3040.0, 19),
    (4160.0, 22),
    (6400.0, 25),
    (8000.0, 28),
];

impl ModulationFormat {
    pub fn from_kind(kind: ModulationKind, slot_width: f64, spectral_efficiency: u64) -> Self {
        match kind {
            ModulationKind::Passband => Self::Passband {
                slot_width,
                spectral_efficiency,
            },
            ModulationKind::Gigabits => Self::Gigabits,
            ModulationKind::Terabits => Self::Terabits,
        }
    }

    /// FSU demand for one request. Passband consumes a bandwidth in GHz;
    /// the adaptive families consume a distance and answer [`Fsus::MAX`]
    /// beyond their reach (callers without a per-request distance pass the
    /// infinite worst case).
    pub fn demand(self, input: f64) -> Fsus {
        match self {
            Self::Passband {
                slot_width,
                spectral_efficiency,
            } => {
                let slots = (input / (spectral_efficiency as f64 * slot_width)).ceil();
                Fsus::new(slots as u64)
            }
            Self::Gigabits => step(input, &GIGABITS_STEPS),
            Self::Terabits => step(input, &TERABITS_STEPS),
        }
    }
}

fn step(distance: f64, table: &[(f64, u64)]) -> Fsus {
    table
        .iter()
        .find(|&&(limit, _)| distance <= limit)
        .map(|&(_, fsus)| Fsus::new(fsus))
        .unwrap_or(Fsus::MAX)
}
