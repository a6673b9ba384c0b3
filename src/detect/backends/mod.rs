pub mod replay;
pub mod stub;

pub use replay::{JsonLinesDetector, ReplayStats};
pub use stub::ScriptedDetector;
