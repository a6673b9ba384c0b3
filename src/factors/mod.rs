//! Risk factors and their analyzers.
//!
//! Each analyzer is a pure function of the current frame (plus track history
//! where needed) returning a contribution in [0, 1]. The factor set is closed:
//! `RiskFactor` enumerates it and `RiskFactors` always carries every entry.

mod crowd;
mod loitering;
mod posture;
mod weapon;

pub use crowd::{crowd_density, unattended_object};
pub use loitering::loitering;
pub use posture::{aggression_score, aggressive_posture, proximity_violation, score_poses};
pub use weapon::weapon_presence;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    WeaponDetection,
    AggressivePosture,
    ProximityViolation,
    Loitering,
    UnattendedObject,
    CrowdDensity,
    Contextual,
}

pub const FACTOR_COUNT: usize = 7;

impl RiskFactor {
    pub const ALL: [RiskFactor; FACTOR_COUNT] = [
        RiskFactor::WeaponDetection,
        RiskFactor::AggressivePosture,
        RiskFactor::ProximityViolation,
        RiskFactor::Loitering,
        RiskFactor::UnattendedObject,
        RiskFactor::CrowdDensity,
        RiskFactor::Contextual,
    ];

    /// Fusion weight. Weights sum to 1.0.
    pub fn weight(self) -> f64 {
        match self {
            RiskFactor::WeaponDetection => 0.45,
            RiskFactor::AggressivePosture => 0.15,
            RiskFactor::ProximityViolation => 0.10,
            RiskFactor::Loitering => 0.05,
            RiskFactor::UnattendedObject => 0.15,
            RiskFactor::CrowdDensity => 0.05,
            RiskFactor::Contextual => 0.05,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RiskFactor::WeaponDetection => "weapon_detection",
            RiskFactor::AggressivePosture => "aggressive_posture",
            RiskFactor::ProximityViolation => "proximity_violation",
            RiskFactor::Loitering => "loitering",
            RiskFactor::UnattendedObject => "unattended_object",
            RiskFactor::CrowdDensity => "crowd_density",
            RiskFactor::Contextual => "contextual",
        }
    }

    /// Display title, e.g. "Weapon Detection".
    pub fn title(self) -> &'static str {
        match self {
            RiskFactor::WeaponDetection => "Weapon Detection",
            RiskFactor::AggressivePosture => "Aggressive Posture",
            RiskFactor::ProximityViolation => "Proximity Violation",
            RiskFactor::Loitering => "Loitering",
            RiskFactor::UnattendedObject => "Unattended Object",
            RiskFactor::CrowdDensity => "Crowd Density",
            RiskFactor::Contextual => "Contextual",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value for every `RiskFactor`, each clamped to [0, 1].
///
/// Serialized as a `{ name: value }` map; missing names deserialize as 0.0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<RiskFactor, f64>", into = "BTreeMap<RiskFactor, f64>")]
pub struct RiskFactors {
    values: [f64; FACTOR_COUNT],
}

impl RiskFactors {
    pub fn zeroed() -> Self {
        Self::default()
    }

    pub fn get(&self, factor: RiskFactor) -> f64 {
        self.values[factor.index()]
    }

    /// Store a value, clamping to [0, 1]. Non-finite values count as 0.
    pub fn set(&mut self, factor: RiskFactor, value: f64) {
        self.values[factor.index()] = if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    pub fn with(mut self, factor: RiskFactor, value: f64) -> Self {
        self.set(factor, value);
        self
    }

    /// Entries in `RiskFactor::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (RiskFactor, f64)> + '_ {
        RiskFactor::ALL.iter().map(move |f| (*f, self.get(*f)))
    }

    pub fn count_above(&self, threshold: f64) -> usize {
        self.values.iter().filter(|v| **v > threshold).count()
    }

    pub fn weighted_sum(&self) -> f64 {
        self.iter().map(|(f, v)| v * f.weight()).sum()
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }
}

impl From<BTreeMap<RiskFactor, f64>> for RiskFactors {
    fn from(map: BTreeMap<RiskFactor, f64>) -> Self {
        let mut factors = RiskFactors::zeroed();
        for (factor, value) in map {
            factors.set(factor, value);
        }
        factors
    }
}

impl From<RiskFactors> for BTreeMap<RiskFactor, f64> {
    fn from(factors: RiskFactors) -> Self {
        factors.iter().collect()
    }
}

/// Fraction of `count` over `population`, 0.0 for an empty population.
pub(crate) fn ratio(count: usize, population: usize) -> f64 {
    if population == 0 {
        0.0
    } else {
        count as f64 / population as f64
    }
}
