use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

use crate::track::DEFAULT_HISTORY_CAPACITY;

const DEFAULT_CALIBRATION_SECS: f64 = 30.0;
const DEFAULT_CROWD_MULTIPLIER: f64 = 2.0;
const DEFAULT_MIN_CROWD_LIMIT: usize = 5;
const DEFAULT_CROWD_LIMIT: usize = 15;
const DEFAULT_LOITERING_SECS: f64 = 5.0;
const DEFAULT_POSE_MATCH_IOU: f64 = 0.3;
const DEFAULT_SMOOTHING_WINDOW: usize = 30;
const DEFAULT_FPS: u32 = 30;

#[derive(Debug, Deserialize, Default)]
struct EngineConfigFile {
    fps: Option<u32>,
    calibration: Option<CalibrationConfigFile>,
    tracking: Option<TrackingConfigFile>,
    smoothing: Option<SmoothingConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CalibrationConfigFile {
    duration_secs: Option<f64>,
    crowd_multiplier: Option<f64>,
    min_crowd_limit: Option<usize>,
    default_crowd_limit: Option<usize>,
    bypass: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct TrackingConfigFile {
    loitering_secs: Option<f64>,
    track_ttl_secs: Option<f64>,
    history_capacity: Option<usize>,
    pose_match_iou: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct SmoothingConfigFile {
    window: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub fps: u32,
    pub calibration: CalibrationSettings,
    pub tracking: TrackingSettings,
    /// Rolling window length (frames) for temporal smoothing.
    pub smoothing_window: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSettings {
    pub duration_secs: f64,
    pub crowd_multiplier: f64,
    pub min_crowd_limit: usize,
    /// Crowd limit in force before calibration finalizes (or when bypassed).
    pub default_crowd_limit: usize,
    pub bypass: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSettings {
    pub loitering_secs: f64,
    /// Histories unseen for longer than this are evicted.
    pub track_ttl_secs: f64,
    pub history_capacity: usize,
    /// Minimum IoU for matching an untracked pose to a tracked person.
    pub pose_match_iou: f64,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_CALIBRATION_SECS,
            crowd_multiplier: DEFAULT_CROWD_MULTIPLIER,
            min_crowd_limit: DEFAULT_MIN_CROWD_LIMIT,
            default_crowd_limit: DEFAULT_CROWD_LIMIT,
            bypass: false,
        }
    }
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            loitering_secs: DEFAULT_LOITERING_SECS,
            track_ttl_secs: 2.0 * DEFAULT_LOITERING_SECS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            pose_match_iou: DEFAULT_POSE_MATCH_IOU,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            calibration: CalibrationSettings::default(),
            tracking: TrackingSettings::default(),
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
        }
    }
}

impl EngineConfig {
    /// Defaults with calibration skipped, for tests and pre-calibrated sites.
    pub fn bypassed() -> Self {
        let mut cfg = Self::default();
        cfg.calibration.bypass = true;
        cfg
    }

    /// Load from `RISK_ENGINE_CONFIG` (if set), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("RISK_ENGINE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit path without consulting the environment.
    pub fn from_path(path: &Path) -> Result<Self> {
        let cfg = Self::from_file(read_config_file(path)?);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: EngineConfigFile) -> Self {
        let calibration = file.calibration.unwrap_or_default();
        let tracking = file.tracking.unwrap_or_default();
        let loitering_secs = tracking.loitering_secs.unwrap_or(DEFAULT_LOITERING_SECS);
        Self {
            fps: file.fps.unwrap_or(DEFAULT_FPS),
            calibration: CalibrationSettings {
                duration_secs: calibration
                    .duration_secs
                    .unwrap_or(DEFAULT_CALIBRATION_SECS),
                crowd_multiplier: calibration
                    .crowd_multiplier
                    .unwrap_or(DEFAULT_CROWD_MULTIPLIER),
                min_crowd_limit: calibration
                    .min_crowd_limit
                    .unwrap_or(DEFAULT_MIN_CROWD_LIMIT),
                default_crowd_limit: calibration
                    .default_crowd_limit
                    .unwrap_or(DEFAULT_CROWD_LIMIT),
                bypass: calibration.bypass.unwrap_or(false),
            },
            tracking: TrackingSettings {
                loitering_secs,
                track_ttl_secs: tracking.track_ttl_secs.unwrap_or(2.0 * loitering_secs),
                history_capacity: tracking
                    .history_capacity
                    .unwrap_or(DEFAULT_HISTORY_CAPACITY),
                pose_match_iou: tracking.pose_match_iou.unwrap_or(DEFAULT_POSE_MATCH_IOU),
            },
            smoothing_window: file
                .smoothing
                .and_then(|smoothing| smoothing.window)
                .unwrap_or(DEFAULT_SMOOTHING_WINDOW),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(secs) = env_parse::<f64>("RISK_CALIBRATION_SECS")? {
            self.calibration.duration_secs = secs;
        }
        if let Some(bypass) = env_parse::<bool>("RISK_BYPASS_CALIBRATION")? {
            self.calibration.bypass = bypass;
        }
        if let Some(multiplier) = env_parse::<f64>("RISK_CROWD_MULTIPLIER")? {
            self.calibration.crowd_multiplier = multiplier;
        }
        if let Some(window) = env_parse::<usize>("RISK_SMOOTHING_WINDOW")? {
            self.smoothing_window = window;
        }
        if let Some(secs) = env_parse::<f64>("RISK_LOITERING_SECS")? {
            self.tracking.loitering_secs = secs;
        }
        if let Some(secs) = env_parse::<f64>("RISK_TRACK_TTL_SECS")? {
            self.tracking.track_ttl_secs = secs;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(anyhow!("fps must be >= 1"));
        }
        let cal = &self.calibration;
        if !cal.duration_secs.is_finite() || cal.duration_secs < 0.0 {
            return Err(anyhow!("calibration duration must be a non-negative number of seconds"));
        }
        if !cal.crowd_multiplier.is_finite() || cal.crowd_multiplier <= 0.0 {
            return Err(anyhow!("crowd multiplier must be greater than zero"));
        }
        if cal.min_crowd_limit == 0 || cal.default_crowd_limit == 0 {
            return Err(anyhow!("crowd limits must be greater than zero"));
        }
        let tracking = &self.tracking;
        if !tracking.loitering_secs.is_finite() || tracking.loitering_secs <= 0.0 {
            return Err(anyhow!("loitering threshold must be greater than zero"));
        }
        if !tracking.track_ttl_secs.is_finite()
            || tracking.track_ttl_secs < tracking.loitering_secs
        {
            return Err(anyhow!(
                "track ttl must be at least the loitering threshold ({}s)",
                tracking.loitering_secs
            ));
        }
        if tracking.history_capacity < 2 {
            return Err(anyhow!("history capacity must hold at least two samples"));
        }
        if !(0.0..=1.0).contains(&tracking.pose_match_iou) {
            return Err(anyhow!("pose match iou must be within 0..=1"));
        }
        if self.smoothing_window == 0 {
            return Err(anyhow!("smoothing window must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<EngineConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} has an invalid value '{}'", key, value)),
        _ => Ok(None),
    }
}
