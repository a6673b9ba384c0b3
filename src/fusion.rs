//! Weighted factor fusion with single-signal suppression and weapon escalation.

use serde::Serialize;

use crate::factors::{RiskFactor, RiskFactors};

/// Weapon confidence above this escalates the frame.
pub const WEAPON_ESCALATION_THRESHOLD: f64 = 0.3;
const ESCALATION_FLOOR: f64 = 0.8;
const ESCALATION_SPAN: f64 = 0.2;

const SUPPRESSION_MULTIPLIER: f64 = 0.7;
const STRONG_SIGNAL: f64 = 0.5;
const WEAPON_CORROBORATION: f64 = 0.5;
const AGGRESSION_CORROBORATION: f64 = 0.75;
const UNATTENDED_CORROBORATION: f64 = 0.5;

/// Per-frame fusion result. `score` is in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FusionOutcome {
    /// Plain weighted sum before suppression, sensitivity and escalation.
    pub raw: f64,
    pub multiplier: f64,
    pub escalated: bool,
    pub score: f64,
}

/// True when the frame carries only a single weak signal.
fn is_weakly_corroborated(factors: &RiskFactors) -> bool {
    factors.get(RiskFactor::WeaponDetection) <= WEAPON_CORROBORATION
        && factors.get(RiskFactor::AggressivePosture) <= AGGRESSION_CORROBORATION
        && factors.count_above(STRONG_SIGNAL) < 2
        && factors.get(RiskFactor::UnattendedObject) < UNATTENDED_CORROBORATION
}

pub fn is_weapon_escalated(factors: &RiskFactors) -> bool {
    factors.get(RiskFactor::WeaponDetection) > WEAPON_ESCALATION_THRESHOLD
}

/// Fuse one frame's factors.
///
/// `sensitivity` scales the fused value before the weapon floor is applied,
/// so a low sensitivity never hides a weapon.
pub fn fuse(factors: &RiskFactors, sensitivity: f64) -> FusionOutcome {
    let raw = factors.weighted_sum();
    let weapon = factors.get(RiskFactor::WeaponDetection);
    let escalated = is_weapon_escalated(factors);

    let multiplier = if !escalated && is_weakly_corroborated(factors) {
        SUPPRESSION_MULTIPLIER
    } else {
        1.0
    };

    let mut score = (raw * multiplier * sensitivity).min(1.0);
    if escalated {
        score = score.max(ESCALATION_FLOOR + weapon * ESCALATION_SPAN);
    }

    FusionOutcome {
        raw,
        multiplier,
        escalated,
        score: score.clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_frame_fuses_to_zero() {
        let out = fuse(&RiskFactors::zeroed(), 1.0);
        assert_eq!(out.score, 0.0);
        assert!(!out.escalated);
    }

    #[test]
    fn single_weak_signal_is_suppressed() {
        let factors = RiskFactors::zeroed().with(RiskFactor::Loitering, 1.0);
        let out = fuse(&factors, 1.0);
        assert!(approx(out.raw, 0.05));
        assert_eq!(out.multiplier, 0.7);
        assert!(approx(out.score, 0.05 * 0.7));
    }

    #[test]
    fn two_strong_signals_lift_suppression() {
        let factors = RiskFactors::zeroed()
            .with(RiskFactor::Loitering, 0.9)
            .with(RiskFactor::CrowdDensity, 0.9);
        let out = fuse(&factors, 1.0);
        assert_eq!(out.multiplier, 1.0);
        assert!(approx(out.score, 0.09));
    }

    #[test]
    fn strong_aggression_or_unattended_lift_suppression() {
        let aggressive = RiskFactors::zeroed().with(RiskFactor::AggressivePosture, 0.8);
        assert_eq!(fuse(&aggressive, 1.0).multiplier, 1.0);

        let unattended = RiskFactors::zeroed().with(RiskFactor::UnattendedObject, 0.5);
        assert_eq!(fuse(&unattended, 1.0).multiplier, 1.0);

        let borderline = RiskFactors::zeroed().with(RiskFactor::AggressivePosture, 0.75);
        assert_eq!(fuse(&borderline, 1.0).multiplier, 0.7);
    }

    #[test]
    fn weapon_escalates_to_floor() {
        let factors = RiskFactors::zeroed().with(RiskFactor::WeaponDetection, 0.9);
        let out = fuse(&factors, 1.0);
        assert!(out.escalated);
        assert_eq!(out.multiplier, 1.0);
        assert!(approx(out.score, 0.98));
    }

    #[test]
    fn partial_weapon_confidence_is_never_suppressed() {
        let factors = RiskFactors::zeroed().with(RiskFactor::WeaponDetection, 0.31);
        let out = fuse(&factors, 1.0);
        assert!(out.escalated);
        assert!(out.score >= 0.8);

        let below = RiskFactors::zeroed().with(RiskFactor::WeaponDetection, 0.3);
        assert!(!fuse(&below, 1.0).escalated);
    }

    #[test]
    fn sensitivity_scales_but_cannot_hide_weapon() {
        let factors = RiskFactors::zeroed()
            .with(RiskFactor::AggressivePosture, 1.0)
            .with(RiskFactor::ProximityViolation, 1.0);
        let base = fuse(&factors, 1.0).score;
        assert!(approx(fuse(&factors, 2.0).score, base * 2.0));
        assert_eq!(fuse(&factors, 0.0).score, 0.0);

        let armed = RiskFactors::zeroed().with(RiskFactor::WeaponDetection, 0.5);
        assert!(approx(fuse(&armed, 0.0).score, 0.9));
    }

    #[test]
    fn score_never_exceeds_one() {
        let mut factors = RiskFactors::zeroed();
        for factor in RiskFactor::ALL {
            factors.set(factor, 1.0);
        }
        assert_eq!(fuse(&factors, 2.0).score, 1.0);
    }
}
