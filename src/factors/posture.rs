use crate::detect::{distance, Keypoint, Point, PoseDetection};
use crate::track::TrackHistoryStore;

/// Poses with fewer keypoints than this are skipped.
const MIN_KEYPOINTS: usize = 11;
const MIN_MEAN_CONFIDENCE: f64 = 0.35;

const RAISED_WRIST_STATIONARY: f64 = 0.6;
const RAISED_WRIST_MOVING: f64 = 0.2;
const HAND_NEAR_HEAD_STATIONARY: f64 = 0.7;
const HAND_NEAR_HEAD_MOVING: f64 = 0.3;
const EXTENDED_ARM: f64 = 0.4;
const WIDE_STANCE: f64 = 0.3;

/// Fractions of body height.
const HEAD_PROXIMITY: f64 = 0.25;
const ARM_EXTENSION: f64 = 0.4;
const STANCE_WIDTH: f64 = 0.4;
const PROXIMITY_DISTANCE: f64 = 0.5;

/// Both members of a close pair above this count as a corroborated interaction.
const CORROBORATED_AGGRESSION: f64 = 0.5;
const CORROBORATED_WEIGHT: f64 = 3.0;

struct UpperBody {
    nose: Point,
    left_shoulder: Point,
    right_shoulder: Point,
    left_wrist: Point,
    right_wrist: Point,
}

impl UpperBody {
    fn from_pose(pose: &PoseDetection) -> Option<Self> {
        let kp = |k: Keypoint| pose.keypoint(k).filter(|p| p[0].is_finite() && p[1].is_finite());
        Some(Self {
            nose: kp(Keypoint::Nose)?,
            left_shoulder: kp(Keypoint::LeftShoulder)?,
            right_shoulder: kp(Keypoint::RightShoulder)?,
            left_wrist: kp(Keypoint::LeftWrist)?,
            right_wrist: kp(Keypoint::RightWrist)?,
        })
    }
}

/// Aggression signal for one pose in [0, 1], or `None` when the pose is too
/// incomplete or low-confidence to judge.
pub fn aggression_score(pose: &PoseDetection, tracks: &TrackHistoryStore) -> Option<f64> {
    if pose.keypoints.len() < MIN_KEYPOINTS {
        return None;
    }
    if pose.mean_confidence()? < MIN_MEAN_CONFIDENCE {
        return None;
    }
    let height = pose.bbox.height();
    if !pose.bbox.is_valid() || height <= 0.0 {
        return None;
    }
    let body = UpperBody::from_pose(pose)?;

    let moving = pose
        .tracked_id()
        .and_then(|id| tracks.get(id))
        .is_some_and(|history| history.is_moving(height));

    let mut aggression = 0.0;

    // Image y grows downward: a raised wrist has a smaller y than its shoulder.
    if body.left_wrist[1] < body.left_shoulder[1] || body.right_wrist[1] < body.right_shoulder[1] {
        aggression += if moving {
            RAISED_WRIST_MOVING
        } else {
            RAISED_WRIST_STATIONARY
        };
    }

    let head_radius = height * HEAD_PROXIMITY;
    if distance(body.left_wrist, body.nose) < head_radius
        || distance(body.right_wrist, body.nose) < head_radius
    {
        aggression += if moving {
            HAND_NEAR_HEAD_MOVING
        } else {
            HAND_NEAR_HEAD_STATIONARY
        };
    }

    let reach = height * ARM_EXTENSION;
    if distance(body.left_wrist, body.left_shoulder) > reach
        || distance(body.right_wrist, body.right_shoulder) > reach
    {
        aggression += EXTENDED_ARM;
    }

    if let (Some(left), Some(right)) = (
        pose.keypoint(Keypoint::LeftAnkle),
        pose.keypoint(Keypoint::RightAnkle),
    ) {
        if (left[0] - right[0]).abs() > height * STANCE_WIDTH {
            aggression += WIDE_STANCE;
        }
    }

    Some(f64::min(aggression, 1.0))
}

/// Per-pose aggression scores, parallel to `poses`.
pub fn score_poses(poses: &[PoseDetection], tracks: &TrackHistoryStore) -> Vec<Option<f64>> {
    poses
        .iter()
        .map(|pose| {
            let score = aggression_score(pose, tracks);
            if score.is_none() {
                log::debug!(
                    "skipping pose with {} keypoints for aggression analysis",
                    pose.keypoints.len()
                );
            }
            score
        })
        .collect()
}

/// Worst-case person drives the factor: max over judged poses.
pub fn aggressive_posture(scores: &[Option<f64>]) -> f64 {
    scores.iter().flatten().copied().fold(0.0, f64::max)
}

/// Share of pose pairs standing closer than half their average height,
/// with mutually aggressive pairs weighted 3x.
pub fn proximity_violation(poses: &[PoseDetection], scores: &[Option<f64>]) -> f64 {
    let candidates: Vec<(usize, &PoseDetection)> = poses
        .iter()
        .enumerate()
        .filter(|(_, pose)| pose.bbox.is_valid())
        .collect();

    let mut violations = 0.0;
    let mut pairs = 0;
    for (n, (i, a)) in candidates.iter().enumerate() {
        for (j, b) in candidates.iter().skip(n + 1) {
            pairs += 1;
            let avg_height = (a.bbox.height() + b.bbox.height()) / 2.0;
            if distance(a.bbox.center(), b.bbox.center()) >= avg_height * PROXIMITY_DISTANCE {
                continue;
            }
            let aggressive = |idx: usize| {
                scores
                    .get(idx)
                    .copied()
                    .flatten()
                    .is_some_and(|s| s > CORROBORATED_AGGRESSION)
            };
            violations += if aggressive(*i) && aggressive(*j) {
                CORROBORATED_WEIGHT
            } else {
                1.0
            };
        }
    }

    if pairs == 0 {
        return 0.0;
    }
    (violations / pairs as f64 * 2.0).min(1.0)
}
