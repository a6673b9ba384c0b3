mod backend;
mod backends;
mod result;

pub use backend::Detector;
pub use backends::{JsonLinesDetector, ReplayStats, ScriptedDetector};
pub use result::{
    distance, BBox, DetectionFrame, Keypoint, ObjectClass, ObjectDetection, Point, PoseDetection,
    TrackId, WeaponDetection, UNTRACKED,
};
