//! Motion-pattern detection over track history, used for offline review.

use serde::Serialize;
use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::fmt;

use crate::detect::{distance, PoseDetection, TrackId};
use crate::track::{TrackHistory, TrackHistoryStore};

const MIN_HISTORY_SECS: f64 = 1.0;
/// Body height assumed when the pose has no usable box.
const FALLBACK_HEIGHT: f64 = 100.0;

const MIN_VELOCITIES: usize = 5;
const RECENT_STEPS: usize = 3;
const BASELINE_STEPS: usize = 10;
const ACCELERATION_RATIO: f64 = 3.0;
/// Body heights per second.
const MIN_BURST_SPEED: f64 = 0.5;

const MIN_ERRATIC_HISTORY: usize = 10;
/// Steps shorter than this fraction of body height are walking jitter.
const MIN_STEP: f64 = 0.05;
const MIN_DIRECTIONS: usize = 6;
const REVERSAL_ANGLE: f64 = PI * 0.6;
const MIN_REVERSALS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum MotionPattern {
    RapidAcceleration { track_id: TrackId },
    ErraticMovement { track_id: TrackId },
}

impl fmt::Display for MotionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionPattern::RapidAcceleration { track_id } => {
                write!(f, "Rapid acceleration detected (Track {})", track_id)
            }
            MotionPattern::ErraticMovement { track_id } => {
                write!(f, "Erratic movement pattern (Track {})", track_id)
            }
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn velocities(history: &TrackHistory) -> Vec<f64> {
    let samples: Vec<_> = history.samples().collect();
    samples
        .windows(2)
        .filter_map(|pair| {
            let dt = pair[1].timestamp - pair[0].timestamp;
            (dt > 0.0).then(|| distance(pair[0].center, pair[1].center) / dt)
        })
        .collect()
}

fn is_accelerating(history: &TrackHistory, height: f64) -> bool {
    let velocities = velocities(history);
    if velocities.len() < MIN_VELOCITIES {
        return false;
    }
    let n = velocities.len();
    let recent = mean(&velocities[n - RECENT_STEPS..]);
    let previous = if n > BASELINE_STEPS {
        mean(&velocities[n - BASELINE_STEPS..n - RECENT_STEPS])
    } else {
        velocities[0]
    };
    recent > previous * ACCELERATION_RATIO && recent > height * MIN_BURST_SPEED
}

fn is_erratic(history: &TrackHistory, height: f64) -> bool {
    if history.len() < MIN_ERRATIC_HISTORY {
        return false;
    }
    let samples: Vec<_> = history.samples().collect();
    let min_step = height * MIN_STEP;
    let directions: Vec<f64> = samples
        .windows(2)
        .filter_map(|pair| {
            let dx = pair[1].center[0] - pair[0].center[0];
            let dy = pair[1].center[1] - pair[0].center[1];
            (dx.abs() > min_step || dy.abs() > min_step).then(|| dy.atan2(dx))
        })
        .collect();
    if directions.len() < MIN_DIRECTIONS {
        return false;
    }

    let reversals = directions
        .windows(2)
        .filter(|pair| {
            let mut diff = (pair[1] - pair[0]).abs();
            if diff > PI {
                diff = 2.0 * PI - diff;
            }
            diff > REVERSAL_ANGLE
        })
        .count();
    reversals >= MIN_REVERSALS
}

/// Patterns for every tracked pose with at least a second of history.
/// The result is deduplicated and ordered by pattern then track id.
pub fn detect_motion_patterns(
    poses: &[PoseDetection],
    tracks: &TrackHistoryStore,
) -> BTreeSet<MotionPattern> {
    let mut patterns = BTreeSet::new();
    for pose in poses {
        let Some(track_id) = pose.tracked_id() else {
            continue;
        };
        let Some(history) = tracks.get(track_id) else {
            continue;
        };
        if history.len() < 2 || history.span_secs() < MIN_HISTORY_SECS {
            continue;
        }

        let height = if pose.bbox.is_valid() && pose.bbox.height() > 0.0 {
            pose.bbox.height()
        } else {
            FALLBACK_HEIGHT
        };

        if is_accelerating(history, height) {
            patterns.insert(MotionPattern::RapidAcceleration { track_id });
        }
        if is_erratic(history, height) {
            patterns.insert(MotionPattern::ErraticMovement { track_id });
        }
    }
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BBox;

    fn tracked_pose(track_id: TrackId) -> PoseDetection {
        PoseDetection {
            bbox: BBox::new(0.0, 0.0, 50.0, 100.0),
            track_id: Some(track_id),
            ..PoseDetection::default()
        }
    }

    #[test]
    fn sudden_sprint_is_flagged() {
        let mut tracks = TrackHistoryStore::default();
        let mut x = 0.0;
        for i in 0..15 {
            // 1 px/frame, then 20 px/frame for the last three steps
            x += if i >= 12 { 20.0 } else { 1.0 };
            tracks.record(7, [x, 0.0], i as f64 * 0.1);
        }
        let patterns = detect_motion_patterns(&[tracked_pose(7)], &tracks);
        assert!(patterns.contains(&MotionPattern::RapidAcceleration { track_id: 7 }));
        assert!(!patterns.contains(&MotionPattern::ErraticMovement { track_id: 7 }));
    }

    #[test]
    fn zigzag_is_erratic() {
        let mut tracks = TrackHistoryStore::default();
        for i in 0..12 {
            let x = if i % 2 == 0 { 0.0 } else { 30.0 };
            tracks.record(3, [x, 0.0], i as f64 * 0.1);
        }
        let patterns = detect_motion_patterns(&[tracked_pose(3)], &tracks);
        assert!(patterns.contains(&MotionPattern::ErraticMovement { track_id: 3 }));
    }

    #[test]
    fn steady_walk_and_short_history_are_ignored() {
        let mut tracks = TrackHistoryStore::default();
        for i in 0..30 {
            tracks.record(1, [i as f64 * 10.0, 0.0], i as f64 * 0.1);
        }
        tracks.record(2, [0.0, 0.0], 0.0);
        tracks.record(2, [500.0, 0.0], 0.5);
        let poses = [tracked_pose(1), tracked_pose(2), PoseDetection::default()];
        assert!(detect_motion_patterns(&poses, &tracks).is_empty());
    }

    #[test]
    fn labels_name_the_track() {
        assert_eq!(
            MotionPattern::ErraticMovement { track_id: 9 }.to_string(),
            "Erratic movement pattern (Track 9)"
        );
        let patterns = detect_motion_patterns(&[tracked_pose(4), tracked_pose(4)], &{
            let mut tracks = TrackHistoryStore::default();
            for i in 0..12 {
                tracks.record(4, [if i % 2 == 0 { 0.0 } else { 30.0 }, 0.0], i as f64 * 0.1);
            }
            tracks
        });
        assert_eq!(patterns.len(), 1);
    }
}
