//! JSON-lines replay detector.
//!
//! Replays a dump of detector output, one `DetectionFrame` JSON object per
//! line. This is the offline path used for forensic analysis of uploaded
//! footage whose detections were extracted elsewhere.
//!
//! The replay detector MUST NOT:
//! - Fetch remote URLs
//! - Skip malformed records silently (a bad line is a hard error)

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::detect::backend::Detector;
use crate::detect::result::DetectionFrame;

/// Statistics for a replay source.
#[derive(Clone, Debug, Default)]
pub struct ReplayStats {
    pub frames_read: u64,
    pub lines_read: u64,
    pub source: String,
}

pub struct JsonLinesDetector {
    reader: Box<dyn BufRead + Send>,
    stats: ReplayStats,
}

impl JsonLinesDetector {
    pub fn open(path: &str) -> Result<Self> {
        if !is_local_file_path(path) {
            return Err(anyhow!("replay only supports local paths (no URL schemes)"));
        }
        let file = File::open(Path::new(path))
            .with_context(|| format!("failed to open detection dump {}", path))?;
        log::info!("JsonLinesDetector: replaying {}", path);
        Ok(Self::from_reader(BufReader::new(file), path))
    }

    pub fn from_reader(reader: impl BufRead + Send + 'static, source: &str) -> Self {
        Self {
            reader: Box::new(reader),
            stats: ReplayStats {
                source: source.to_string(),
                ..ReplayStats::default()
            },
        }
    }

    pub fn stats(&self) -> ReplayStats {
        self.stats.clone()
    }
}

impl Detector for JsonLinesDetector {
    fn name(&self) -> &'static str {
        "jsonl_replay"
    }

    fn next_frame(&mut self) -> Result<Option<DetectionFrame>> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .with_context(|| format!("failed to read {}", self.stats.source))?;
            if read == 0 {
                return Ok(None);
            }
            self.stats.lines_read += 1;
            if line.trim().is_empty() {
                continue;
            }
            let frame = DetectionFrame::from_json(line.trim()).with_context(|| {
                format!("{}:{}", self.stats.source, self.stats.lines_read)
            })?;
            self.stats.frames_read += 1;
            return Ok(Some(frame));
        }
    }
}

fn is_local_file_path(path: &str) -> bool {
    !path.trim().is_empty() && !path.contains("://")
}
