//! Replay a recorded detection trace through the session ports.
//!
//! A trace is JSON lines, one object per tick. Every field is optional:
//!
//! ```text
//! {"frame": true, "regions": [{"x": 10, "y": 20, "width": 120, "height": 120}], "embedding": [0.1, 0.9]}
//! {"frame": false, "delay_ms": 40}
//! {"regions": [{"x": 0, "y": 0, "width": 96, "height": 96}], "embedding": null}
//! ```
//!
//! `frame: false` reports no frame for that tick, a missing or null
//! `embedding` makes extraction fail, and `delay_ms` holds the frame pull
//! for that long. Once the trace runs out the feed reports no frames, so the
//! session ends on its deadline unless something concluded it earlier.
//! Blank lines and lines starting with `#` are skipped.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use matcher::{Embedding, Region, RegionSize};
use serde::Deserialize;
use session::{EmbeddingExtractor, FaceDetector, Frame, FrameSource, PortError};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read trace {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("trace line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TraceTick {
    #[serde(default = "frame_present")]
    pub frame: bool,
    #[serde(default)]
    pub regions: Vec<Region>,
    #[serde(default)]
    pub embedding: Option<Embedding>,
    #[serde(default)]
    pub delay_ms: u64,
}

fn frame_present() -> bool {
    true
}

/// The three upstream ports over one shared trace.
///
/// Frames are numbered from 1 in trace order; the detector and extractor look
/// their tick up by frame sequence, so the parts can be borrowed independently.
#[derive(Debug)]
pub struct ReplayFeed {
    pub frames: ReplayFrames,
    pub detector: ReplayDetector,
    pub extractor: ReplayExtractor,
}

impl ReplayFeed {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ReplayError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_jsonl(&content)
    }

    pub fn from_jsonl(content: &str) -> Result<Self, ReplayError> {
        let mut ticks = Vec::new();
        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let tick = serde_json::from_str(line).map_err(|source| ReplayError::Line {
                line: index + 1,
                source,
            })?;
            ticks.push(tick);
        }
        Ok(Self::from_ticks(ticks))
    }

    pub fn from_ticks(ticks: Vec<TraceTick>) -> Self {
        let ticks: Arc<[TraceTick]> = ticks.into();
        Self {
            frames: ReplayFrames {
                ticks: Arc::clone(&ticks),
                cursor: 0,
            },
            detector: ReplayDetector {
                ticks: Arc::clone(&ticks),
            },
            extractor: ReplayExtractor { ticks },
        }
    }

    pub fn len(&self) -> usize {
        self.frames.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.ticks.is_empty()
    }
}

fn tick_for<'t>(ticks: &'t [TraceTick], frame: &Frame) -> Result<&'t TraceTick, PortError> {
    usize::try_from(frame.sequence())
        .ok()
        .and_then(|sequence| sequence.checked_sub(1))
        .and_then(|index| ticks.get(index))
        .ok_or_else(|| {
            PortError::recoverable(format!("trace has no tick for frame {}", frame.sequence()))
        })
}

#[derive(Debug)]
pub struct ReplayFrames {
    ticks: Arc<[TraceTick]>,
    cursor: usize,
}

#[async_trait]
impl FrameSource for ReplayFrames {
    async fn next_frame(&mut self) -> Result<Option<Frame>, PortError> {
        let Some(tick) = self.ticks.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        let (present, delay) = (tick.frame, tick.delay_ms);
        let sequence = self.cursor as u64;

        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        trace!(sequence, present, "replayed frame");
        Ok(present.then(|| Frame::empty(sequence)))
    }
}

#[derive(Debug)]
pub struct ReplayDetector {
    ticks: Arc<[TraceTick]>,
}

#[async_trait]
impl FaceDetector for ReplayDetector {
    async fn detect(
        &mut self,
        frame: &Frame,
        min_size: RegionSize,
    ) -> Result<Vec<Region>, PortError> {
        let tick = tick_for(&self.ticks, frame)?;
        Ok(tick
            .regions
            .iter()
            .filter(|region| region.fits(min_size))
            .copied()
            .collect())
    }
}

#[derive(Debug)]
pub struct ReplayExtractor {
    ticks: Arc<[TraceTick]>,
}

#[async_trait]
impl EmbeddingExtractor for ReplayExtractor {
    async fn extract(&mut self, frame: &Frame, _region: &Region) -> Result<Embedding, PortError> {
        tick_for(&self.ticks, frame)?
            .embedding
            .clone()
            .ok_or_else(|| {
                PortError::recoverable(format!(
                    "no embedding recorded for frame {}",
                    frame.sequence()
                ))
            })
    }
}
