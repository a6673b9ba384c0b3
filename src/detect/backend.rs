use anyhow::Result;

use crate::detect::result::DetectionFrame;

/// Detector collaborator trait.
///
/// # Audit Boundary
///
/// Object, pose, and weapon models live outside this crate. A detector hands
/// the engine one `DetectionFrame` per analyzed video frame and nothing else:
/// no pixels, no embeddings, no identity-linked outputs.
pub trait Detector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Produce the next frame's detections, `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<DetectionFrame>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
