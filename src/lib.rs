//! Sentinel risk scoring engine.
//!
//! Turns per-frame detector output (objects, poses, weapon detections) into a
//! smoothed 0-100 risk score, a per-factor breakdown, and alert records.
//!
//! # Architecture
//!
//! Each frame flows through the same pipeline:
//!
//! 1. **Calibration**: a fresh engine observes the scene for a fixed window
//!    and learns the ambient crowd size. Nothing is scored meanwhile.
//! 2. **Tracking**: tracked positions are appended to bounded per-track
//!    histories; tracks unseen past their TTL are evicted.
//! 3. **Factors**: seven closed analyzers each yield a value in [0, 1].
//! 4. **Fusion**: weighted sum, single-signal suppression, weapon escalation.
//! 5. **Smoothing**: rolling mean; weapon frames flood and hold the window.
//!
//! # Module Structure
//!
//! - `detect`: detection data model and the `Detector` seam
//! - `factors`: `RiskFactor`, `RiskFactors` and the analyzers
//! - `engine`: `RiskEngine`, one per camera or session
//! - `session`: `SessionRegistry` keyed by session id
//! - `alert`, `motion`: on-demand reporting

pub mod alert;
pub mod calibration;
pub mod config;
pub mod context;
pub mod detect;
pub mod engine;
pub mod factors;
pub mod fusion;
pub mod motion;
pub mod session;
pub mod smoother;
pub mod track;

pub use alert::{generate_alert, Alert, AlertLevel, TopFactor};
pub use calibration::{CalibrationBaseline, CalibrationManager, CalibrationPhase};
pub use config::{CalibrationSettings, EngineConfig, TrackingSettings};
pub use context::{Clock, LocationType, ScoringContext, SystemClock};
pub use detect::{
    BBox, DetectionFrame, Detector, JsonLinesDetector, ObjectClass, ObjectDetection,
    PoseDetection, ScriptedDetector, TrackId, WeaponDetection,
};
pub use engine::{RiskAssessment, RiskEngine};
pub use factors::{RiskFactor, RiskFactors};
pub use fusion::{fuse, FusionOutcome};
pub use motion::{detect_motion_patterns, MotionPattern};
pub use session::{validate_session_id, SessionRegistry};
pub use smoother::TemporalSmoother;
pub use track::{TrackHistory, TrackHistoryStore};
