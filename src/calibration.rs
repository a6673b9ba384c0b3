//! Environment self-calibration.
//!
//! A fresh engine spends its first `duration_secs` observing the scene to
//! learn the ambient crowd size. Nothing is scored during that window. When
//! the window closes the baseline is frozen exactly once and the crowd limit
//! used by the density factor is derived from it.

use serde::Serialize;

use crate::config::CalibrationSettings;

/// Observed environment statistics.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CalibrationBaseline {
    pub avg_crowd: f64,
    pub max_crowd: usize,
    pub sample_count: u64,
    /// Set once when calibration finalizes.
    pub crowd_limit: Option<usize>,
}

impl CalibrationBaseline {
    fn record(&mut self, num_persons: usize) {
        self.sample_count += 1;
        self.avg_crowd += (num_persons as f64 - self.avg_crowd) / self.sample_count as f64;
        self.max_crowd = self.max_crowd.max(num_persons);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum CalibrationState {
    Observing { started_at: Option<f64> },
    Calibrated,
}

/// Outcome of presenting one frame to the calibration manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationPhase {
    /// Still learning; the frame must not be scored.
    Observing,
    /// Calibration finalized on this very frame.
    JustCalibrated,
    Calibrated,
}

#[derive(Clone, Debug)]
pub struct CalibrationManager {
    settings: CalibrationSettings,
    state: CalibrationState,
    baseline: CalibrationBaseline,
    crowd_limit: usize,
}

impl CalibrationManager {
    pub fn new(settings: CalibrationSettings) -> Self {
        let state = if settings.bypass {
            CalibrationState::Calibrated
        } else {
            CalibrationState::Observing { started_at: None }
        };
        let crowd_limit = settings.default_crowd_limit;
        Self {
            settings,
            state,
            baseline: CalibrationBaseline::default(),
            crowd_limit,
        }
    }

    /// Feed one frame's person count observed at `now` (seconds).
    pub fn observe(&mut self, now: f64, num_persons: usize) -> CalibrationPhase {
        let started_at = match &mut self.state {
            CalibrationState::Calibrated => return CalibrationPhase::Calibrated,
            CalibrationState::Observing { started_at } => *started_at.get_or_insert(now),
        };

        if now - started_at < self.settings.duration_secs {
            self.baseline.record(num_persons);
            return CalibrationPhase::Observing;
        }

        self.finalize();
        CalibrationPhase::JustCalibrated
    }

    fn finalize(&mut self) {
        if self.baseline.sample_count > 0 {
            let derived = (self.baseline.avg_crowd * self.settings.crowd_multiplier).round();
            self.crowd_limit = (derived as usize).max(self.settings.min_crowd_limit);
        }
        self.baseline.crowd_limit = Some(self.crowd_limit);
        self.state = CalibrationState::Calibrated;
        log::info!(
            "calibration complete: avg crowd {:.1} (max {}, {} samples), crowd limit {}",
            self.baseline.avg_crowd,
            self.baseline.max_crowd,
            self.baseline.sample_count,
            self.crowd_limit
        );
    }

    pub fn is_calibrated(&self) -> bool {
        self.state == CalibrationState::Calibrated
    }

    pub fn crowd_limit(&self) -> usize {
        self.crowd_limit
    }

    pub fn baseline(&self) -> &CalibrationBaseline {
        &self.baseline
    }
}
