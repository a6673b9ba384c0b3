//! Alert records derived from a reported score and its factors.
//!
//! `generate_alert` is a pure function: identical inputs always yield
//! identical alerts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::factors::{RiskFactor, RiskFactors};

const TOP_FACTOR_MIN: f64 = 0.10;
const TOP_FACTOR_LIMIT: usize = 3;
const ACTIVE_THREAT: f64 = 0.5;
const ACTIVE_CROWD: f64 = 0.7;
/// Alerts above this score are called out in replay summaries.
const SIGNIFICANT_SCORE: f64 = 60.0;
const SIGNIFICANT_MARKER_LIMIT: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            AlertLevel::Critical
        } else if score >= 50.0 {
            AlertLevel::High
        } else if score >= 25.0 {
            AlertLevel::Medium
        } else {
            AlertLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Low => "low",
            AlertLevel::Medium => "medium",
            AlertLevel::High => "high",
            AlertLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One contributing factor, rendered as "Title: NN%".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct TopFactor {
    pub factor: RiskFactor,
    /// Truncated whole percent.
    pub percent: u32,
}

impl fmt::Display for TopFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}%", self.factor.title(), self.percent)
    }
}

impl From<TopFactor> for String {
    fn from(top: TopFactor) -> Self {
        top.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub score: f64,
    pub top_factors: Vec<TopFactor>,
    pub all_factors: RiskFactors,
    pub description: String,
}

pub fn generate_alert(score: f64, factors: &RiskFactors) -> Alert {
    Alert {
        level: AlertLevel::from_score(score),
        score,
        top_factors: top_factors(factors),
        all_factors: *factors,
        description: describe_threats(factors, score),
    }
}

/// Up to three strongest factors above 10%, strongest first. Ties keep
/// factor declaration order.
pub fn top_factors(factors: &RiskFactors) -> Vec<TopFactor> {
    let mut ranked: Vec<(RiskFactor, f64)> = factors.iter().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
        .into_iter()
        .take(TOP_FACTOR_LIMIT)
        .filter(|(_, value)| *value > TOP_FACTOR_MIN)
        .map(|(factor, value)| TopFactor {
            factor,
            percent: (value * 100.0) as u32,
        })
        .collect()
}

fn threat_phrase(factor: RiskFactor) -> &'static str {
    match factor {
        RiskFactor::WeaponDetection => "WEAPON DETECTED",
        RiskFactor::AggressivePosture => "aggressive behavior detected",
        RiskFactor::ProximityViolation => "people in close proximity",
        RiskFactor::Loitering => "suspicious loitering",
        RiskFactor::UnattendedObject => "unattended objects",
        RiskFactor::CrowdDensity => "high crowd density",
        RiskFactor::Contextual => "elevated contextual risk",
    }
}

fn is_active(factor: RiskFactor, value: f64) -> bool {
    match factor {
        RiskFactor::CrowdDensity => value > ACTIVE_CROWD,
        RiskFactor::Contextual => false,
        _ => value > ACTIVE_THREAT,
    }
}

pub fn describe_threats(factors: &RiskFactors, score: f64) -> String {
    let active: Vec<&str> = factors
        .iter()
        .filter(|(factor, value)| is_active(*factor, *value))
        .map(|(factor, _)| threat_phrase(factor))
        .collect();

    if active.is_empty() {
        return "Low risk situation".to_string();
    }

    let prefix = if factors.get(RiskFactor::WeaponDetection) > ACTIVE_THREAT {
        "CRITICAL THREAT"
    } else if score >= 75.0 {
        "CRITICAL"
    } else if score >= 50.0 {
        "HIGH RISK"
    } else {
        "Elevated risk"
    };
    format!("{}: {}", prefix, active.join(", "))
}

/// "Significant risk at N.Ns" markers for `(timestamp_seconds, score)` pairs
/// scoring above 60. Markers are deduplicated, sorted, and capped at five.
pub fn significant_risk_markers(alerts: impl IntoIterator<Item = (f64, f64)>) -> Vec<String> {
    alerts
        .into_iter()
        .filter(|(_, score)| *score > SIGNIFICANT_SCORE)
        .map(|(timestamp, _)| format!("Significant risk at {:.1}s", timestamp))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .take(SIGNIFICANT_MARKER_LIMIT)
        .collect()
}
