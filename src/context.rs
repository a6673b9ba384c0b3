//! Per-call scoring context.
//!
//! Callers pass what they know about the scene alongside each frame. Every
//! field is optional; absent fields fall back to the documented defaults.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Night window is `[22:00, 05:00)`.
const NIGHT_START_HOUR: u8 = 22;
const NIGHT_END_HOUR: u8 = 5;
const NIGHT_BONUS: f64 = 0.4;

const DEFAULT_SENSITIVITY: f64 = 1.0;
const MAX_SENSITIVITY: f64 = 2.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    #[default]
    Public,
    Transit,
    Retail,
    SecureFacility,
    #[serde(other)]
    Other,
}

impl LocationType {
    pub fn risk_bonus(self) -> f64 {
        match self {
            LocationType::Public | LocationType::Other => 0.0,
            LocationType::Transit | LocationType::Retail => 0.1,
            LocationType::SecureFacility => 0.3,
        }
    }
}

impl FromStr for LocationType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "public" => Ok(LocationType::Public),
            "transit" => Ok(LocationType::Transit),
            "retail" => Ok(LocationType::Retail),
            "secure_facility" => Ok(LocationType::SecureFacility),
            "other" => Ok(LocationType::Other),
            other => Err(anyhow!("unknown location type '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringContext {
    /// Local hour of day, 0-23.
    #[serde(default)]
    pub hour: Option<u8>,
    /// Overrides the frame timestamp for the calibration clock.
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub location_type: Option<LocationType>,
    /// Multiplier on the fused score. Defaults to 1.0, clamped to [0, 2].
    #[serde(default)]
    pub sensitivity: Option<f64>,
}

impl ScoringContext {
    pub fn at_hour(hour: u8) -> Self {
        Self {
            hour: Some(hour),
            ..Self::default()
        }
    }

    pub fn is_night(&self) -> bool {
        matches!(self.hour, Some(h) if h < 24 && (h >= NIGHT_START_HOUR || h < NIGHT_END_HOUR))
    }

    pub fn effective_sensitivity(&self) -> f64 {
        match self.sensitivity {
            Some(s) if s.is_finite() => s.clamp(0.0, MAX_SENSITIVITY),
            _ => DEFAULT_SENSITIVITY,
        }
    }

    /// Contextual risk factor in [0, 1].
    pub fn contextual_risk(&self) -> f64 {
        let night = if self.is_night() { NIGHT_BONUS } else { 0.0 };
        let location = self.location_type.unwrap_or_default().risk_bonus();
        (night + location).min(1.0)
    }
}

/// Contextual factor for an optional context; no context means no contribution.
pub fn contextual_risk(context: Option<&ScoringContext>) -> f64 {
    context.map(ScoringContext::contextual_risk).unwrap_or(0.0)
}

// ----------------------------------------------------------------------------
// Clock
// ----------------------------------------------------------------------------

/// Fallback time source used when neither context nor frame carry a timestamp.
pub trait Clock: Send {
    fn now_secs(&self) -> f64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}
