use anyhow::Result;
use std::collections::VecDeque;

use crate::detect::backend::Detector;
use crate::detect::result::DetectionFrame;

/// Scripted detector for tests and demos. Replays frames queued in memory.
#[derive(Default)]
pub struct ScriptedDetector {
    frames: VecDeque<DetectionFrame>,
}

impl ScriptedDetector {
    pub fn new(frames: impl IntoIterator<Item = DetectionFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn push(&mut self, frame: DetectionFrame) {
        self.frames.push_back(frame);
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl Detector for ScriptedDetector {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn next_frame(&mut self) -> Result<Option<DetectionFrame>> {
        Ok(self.frames.pop_front())
    }
}
