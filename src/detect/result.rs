use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Stable identifier assigned by the external tracker.
pub type TrackId = i64;

/// Track id used by detectors for "not tracked this frame".
pub const UNTRACKED: TrackId = -1;

/// Pixel-space point `[x, y]`.
pub type Point = [f64; 2];

pub fn distance(a: Point, b: Point) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

// ----------------------------------------------------------------------------
// Bounding boxes
// ----------------------------------------------------------------------------

/// Axis-aligned box in pixel coordinates. Serialized as `[x1, y1, x2, y2]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> Point {
        [(self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0]
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Finite coordinates with non-negative extent.
    ///
    /// Degenerate (zero-area) boxes are valid; detectors emit them for poses
    /// without an associated box.
    pub fn is_valid(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
            && self.x2 >= self.x1
            && self.y2 >= self.y1
    }

    pub fn iou(&self, other: &BBox) -> f64 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = ix * iy;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

impl From<[f64; 4]> for BBox {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

// ----------------------------------------------------------------------------
// Object classes
// ----------------------------------------------------------------------------

/// Object class label emitted by the detector.
///
/// Unknown labels are preserved so replayed dumps round-trip unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectClass {
    Person,
    Backpack,
    Handbag,
    Suitcase,
    Knife,
    BaseballBat,
    Scissors,
    Gun,
    Weapon,
    Other(String),
}

impl ObjectClass {
    /// Lexical weapon set recognized on standard-object detections.
    pub fn is_weapon(&self) -> bool {
        matches!(
            self,
            ObjectClass::Knife
                | ObjectClass::BaseballBat
                | ObjectClass::Scissors
                | ObjectClass::Gun
                | ObjectClass::Weapon
        )
    }

    pub fn is_person(&self) -> bool {
        matches!(self, ObjectClass::Person)
    }

    /// Carried items that count as potentially unattended.
    pub fn is_bag(&self) -> bool {
        matches!(
            self,
            ObjectClass::Backpack | ObjectClass::Handbag | ObjectClass::Suitcase
        )
    }

    pub fn label(&self) -> &str {
        match self {
            ObjectClass::Person => "person",
            ObjectClass::Backpack => "backpack",
            ObjectClass::Handbag => "handbag",
            ObjectClass::Suitcase => "suitcase",
            ObjectClass::Knife => "knife",
            ObjectClass::BaseballBat => "baseball bat",
            ObjectClass::Scissors => "scissors",
            ObjectClass::Gun => "gun",
            ObjectClass::Weapon => "weapon",
            ObjectClass::Other(label) => label,
        }
    }
}

impl From<String> for ObjectClass {
    fn from(label: String) -> Self {
        match label.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "person" => ObjectClass::Person,
            "backpack" => ObjectClass::Backpack,
            "handbag" => ObjectClass::Handbag,
            "suitcase" => ObjectClass::Suitcase,
            "knife" => ObjectClass::Knife,
            "baseball bat" => ObjectClass::BaseballBat,
            "scissors" => ObjectClass::Scissors,
            "gun" => ObjectClass::Gun,
            "weapon" => ObjectClass::Weapon,
            _ => ObjectClass::Other(label),
        }
    }
}

impl From<&str> for ObjectClass {
    fn from(label: &str) -> Self {
        ObjectClass::from(label.to_string())
    }
}

impl From<ObjectClass> for String {
    fn from(class: ObjectClass) -> Self {
        class.label().to_string()
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ----------------------------------------------------------------------------
// Per-frame detections
// ----------------------------------------------------------------------------

fn default_object_confidence() -> f64 {
    0.5
}

fn untracked() -> TrackId {
    UNTRACKED
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectDetection {
    pub class: ObjectClass,
    #[serde(default = "default_object_confidence")]
    pub confidence: f64,
    pub bbox: BBox,
    #[serde(default = "untracked")]
    pub track_id: TrackId,
}

impl ObjectDetection {
    pub fn new(class: impl Into<ObjectClass>, confidence: f64, bbox: BBox) -> Self {
        Self {
            class: class.into(),
            confidence,
            bbox,
            track_id: UNTRACKED,
        }
    }

    pub fn with_track(mut self, track_id: TrackId) -> Self {
        self.track_id = track_id;
        self
    }

    pub fn tracked_id(&self) -> Option<TrackId> {
        (self.track_id >= 0).then_some(self.track_id)
    }
}

/// COCO-17 keypoint layout used by the pose detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keypoint {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseDetection {
    #[serde(default)]
    pub keypoints: Vec<Point>,
    /// Per-keypoint confidence, parallel to `keypoints`.
    #[serde(default)]
    pub confidence: Vec<f64>,
    #[serde(default)]
    pub bbox: BBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<TrackId>,
}

impl PoseDetection {
    pub fn keypoint(&self, kp: Keypoint) -> Option<Point> {
        self.keypoints.get(kp as usize).copied()
    }

    pub fn tracked_id(&self) -> Option<TrackId> {
        self.track_id.filter(|id| *id >= 0)
    }

    /// Mean keypoint confidence, `None` when the detector sent none.
    pub fn mean_confidence(&self) -> Option<f64> {
        if self.confidence.is_empty() {
            return None;
        }
        Some(self.confidence.iter().sum::<f64>() / self.confidence.len() as f64)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponDetection {
    pub confidence: f64,
    #[serde(default)]
    pub bbox: BBox,
}

/// Decode a detection list item by item, dropping malformed entries.
///
/// The list itself must be an array; a bad item (missing keys, short box or
/// keypoint arrays) only costs that item.
fn lenient_items<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    let total = raw.len();
    let items: Vec<T> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                let kind = std::any::type_name::<T>().rsplit("::").next().unwrap_or("record");
                log::debug!("skipping malformed {} #{}: {}", kind, idx, e);
                None
            }
        })
        .collect();
    if items.len() < total {
        log::debug!("kept {} of {} detections", items.len(), total);
    }
    Ok(items)
}

/// One frame of detector output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    #[serde(default, deserialize_with = "lenient_items")]
    pub objects: Vec<ObjectDetection>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub poses: Vec<PoseDetection>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub weapons: Vec<WeaponDetection>,
    /// Seconds, monotonic within a session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl DetectionFrame {
    pub fn at(timestamp: f64) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..Self::default()
        }
    }

    /// Parse one detector record.
    ///
    /// Only a record that is not a JSON object, or whose detection lists are
    /// not arrays, is a hard error. Malformed entries inside the lists are
    /// dropped and the rest of the frame is kept.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| anyhow!("invalid detection frame: {}", e))
    }

    pub fn persons(&self) -> impl Iterator<Item = &ObjectDetection> {
        self.objects
            .iter()
            .filter(|obj| obj.class.is_person())
    }

    /// Give untracked poses the track id of the best-overlapping tracked person.
    ///
    /// Each person object is matched at most once; poses that already carry a
    /// track id keep it. Returns the number of poses newly assigned.
    pub fn assign_pose_tracks(&mut self, min_iou: f64) -> usize {
        let mut claimed: Vec<TrackId> = self.poses.iter().filter_map(|p| p.tracked_id()).collect();
        let mut assigned = 0;

        for pose in self.poses.iter_mut() {
            if pose.tracked_id().is_some() || !pose.bbox.is_valid() {
                continue;
            }
            let best = self
                .objects
                .iter()
                .filter(|obj| obj.class.is_person() && obj.bbox.is_valid())
                .filter_map(|obj| obj.tracked_id().map(|id| (id, pose.bbox.iou(&obj.bbox))))
                .filter(|(id, iou)| *iou >= min_iou && !claimed.contains(id))
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

            if let Some((id, _)) = best {
                pose.track_id = Some(id);
                claimed.push(id);
                assigned += 1;
            }
        }
        assigned
    }
}
