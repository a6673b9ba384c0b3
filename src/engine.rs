//! Per-session risk scoring engine.
//!
//! One `RiskEngine` owns the calibration state, track history and smoothing
//! window for a single camera or session. Calls must be serialized per
//! engine; `calculate_risk` takes `&mut self` so the borrow checker enforces
//! it. Nothing here blocks or performs I/O.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

use crate::alert::{self, Alert};
use crate::calibration::{CalibrationBaseline, CalibrationManager, CalibrationPhase};
use crate::config::EngineConfig;
use crate::context::{contextual_risk, Clock, ScoringContext, SystemClock};
use crate::detect::{DetectionFrame, PoseDetection};
use crate::factors::{self, RiskFactor, RiskFactors};
use crate::fusion;
use crate::motion::{self, MotionPattern};
use crate::smoother::TemporalSmoother;
use crate::track::TrackHistoryStore;

/// Result of scoring one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RiskAssessment {
    /// Smoothed score in [0, 100].
    pub score: f64,
    pub factors: RiskFactors,
    /// Seconds on the session timeline this frame was scored at.
    pub timestamp: f64,
    /// True while the engine is still learning its baseline.
    pub calibrating: bool,
    pub weapon_escalated: bool,
}

pub struct RiskEngine {
    config: EngineConfig,
    calibration: CalibrationManager,
    tracks: TrackHistoryStore,
    smoother: TemporalSmoother,
    clock: Box<dyn Clock>,
}

impl RiskEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock))
    }

    /// Engine whose fallback time source is `clock`.
    pub fn with_clock(config: EngineConfig, clock: Box<dyn Clock>) -> Self {
        let calibration = CalibrationManager::new(config.calibration.clone());
        let tracks = TrackHistoryStore::new(
            config.tracking.history_capacity,
            config.tracking.track_ttl_secs,
        );
        let smoother = TemporalSmoother::new(config.smoothing_window);
        Self {
            config,
            calibration,
            tracks,
            smoother,
            clock,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Session time for this call: context, then frame, then the clock.
    fn resolve_timestamp(
        &self,
        frame: &DetectionFrame,
        context: Option<&ScoringContext>,
    ) -> Result<f64> {
        let now = context
            .and_then(|ctx| ctx.timestamp)
            .or(frame.timestamp)
            .unwrap_or_else(|| self.clock.now_secs());
        if !now.is_finite() {
            return Err(anyhow!("frame timestamp must be finite, got {}", now));
        }
        Ok(now)
    }

    /// Score one frame.
    ///
    /// Only a structurally unusable frame is an error. Malformed poses and
    /// objects are skipped by the individual analyzers.
    pub fn calculate_risk(
        &mut self,
        mut frame: DetectionFrame,
        context: Option<&ScoringContext>,
    ) -> Result<RiskAssessment> {
        let now = self.resolve_timestamp(&frame, context)?;

        if self.calibration.observe(now, frame.poses.len()) == CalibrationPhase::Observing {
            return Ok(RiskAssessment {
                score: 0.0,
                factors: RiskFactors::zeroed(),
                timestamp: now,
                calibrating: true,
                weapon_escalated: false,
            });
        }

        frame.assign_pose_tracks(self.config.tracking.pose_match_iou);
        self.record_tracks(&frame, now);
        let evicted = self.tracks.evict_stale(now);
        if evicted > 0 {
            log::debug!(
                "evicted {} tracks unseen for {:.1}s, {} live",
                evicted,
                self.tracks.ttl_secs(),
                self.tracks.len()
            );
        }

        let factors = self.compute_factors(&frame, context);
        let sensitivity = context.map_or(1.0, ScoringContext::effective_sensitivity);
        let fused = fusion::fuse(&factors, sensitivity);
        if fused.escalated {
            log::warn!(
                "weapon escalation at t={:.2}s (confidence {:.2}, raw {:.2}, score {:.2})",
                now,
                factors.get(RiskFactor::WeaponDetection),
                fused.raw,
                fused.score
            );
        }
        let score = self.smoother.push(fused.score, fused.escalated);

        Ok(RiskAssessment {
            score,
            factors,
            timestamp: now,
            calibrating: false,
            weapon_escalated: fused.escalated,
        })
    }

    /// Append this frame's tracked positions. Tracked person objects without
    /// a matching pose are recorded from their own box.
    fn record_tracks(&mut self, frame: &DetectionFrame, now: f64) {
        let mut seen = HashSet::new();
        for pose in &frame.poses {
            if let Some(track_id) = pose.tracked_id() {
                if pose.bbox.is_valid() && seen.insert(track_id) {
                    self.tracks.record(track_id, pose.bbox.center(), now);
                }
            }
        }
        for person in frame.persons() {
            if let Some(track_id) = person.tracked_id() {
                if person.bbox.is_valid() && seen.insert(track_id) {
                    self.tracks.record(track_id, person.bbox.center(), now);
                }
            }
        }
    }

    fn compute_factors(
        &self,
        frame: &DetectionFrame,
        context: Option<&ScoringContext>,
    ) -> RiskFactors {
        let pose_scores = factors::score_poses(&frame.poses, &self.tracks);
        let mut out = RiskFactors::zeroed();
        out.set(
            RiskFactor::WeaponDetection,
            factors::weapon_presence(&frame.weapons, &frame.objects),
        );
        out.set(
            RiskFactor::AggressivePosture,
            factors::aggressive_posture(&pose_scores),
        );
        out.set(
            RiskFactor::ProximityViolation,
            factors::proximity_violation(&frame.poses, &pose_scores),
        );
        out.set(
            RiskFactor::Loitering,
            factors::loitering(
                &frame.objects,
                &self.tracks,
                self.config.tracking.loitering_secs,
            ),
        );
        out.set(
            RiskFactor::UnattendedObject,
            factors::unattended_object(&frame.objects, &frame.poses),
        );
        out.set(
            RiskFactor::CrowdDensity,
            factors::crowd_density(&frame.poses, self.calibration.crowd_limit()),
        );
        out.set(RiskFactor::Contextual, contextual_risk(context));
        out
    }

    pub fn generate_alert(&self, score: f64, factors: &RiskFactors) -> Alert {
        alert::generate_alert(score, factors)
    }

    /// Motion patterns for `poses` against this session's track history.
    pub fn detect_motion_patterns(&self, poses: &[PoseDetection]) -> BTreeSet<MotionPattern> {
        motion::detect_motion_patterns(poses, &self.tracks)
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_calibrated()
    }

    pub fn baseline(&self) -> &CalibrationBaseline {
        self.calibration.baseline()
    }

    pub fn crowd_limit(&self) -> usize {
        self.calibration.crowd_limit()
    }

    pub fn tracked_count(&self) -> usize {
        self.tracks.len()
    }

    /// Forget everything learned, including calibration.
    pub fn reset(&mut self) {
        self.calibration = CalibrationManager::new(self.config.calibration.clone());
        self.tracks.clear();
        self.smoother.reset();
        log::info!("risk engine reset");
    }
}
