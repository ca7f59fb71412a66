//! Port traits for the collaborators the controller drives each tick.
//!
//! Camera capture, face detection, embedding extraction and the actuator link
//! all live outside this crate. Adapters implement these traits; the
//! controller wraps every call in a per-call timeout, so an adapter that
//! performs blocking I/O should hand it to `tokio::task::spawn_blocking`
//! rather than stall the executor.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use matcher::{Decision, Embedding, Region, RegionSize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One captured video frame. Pixel layout is owned by the adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    sequence: u64,
    width: u32,
    height: u32,
    pixels: Bytes,
}

impl Frame {
    pub fn new(sequence: u64, width: u32, height: u32, pixels: impl Into<Bytes>) -> Self {
        Self {
            sequence,
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// Frame with no pixel payload, for sources whose detector and extractor
    /// already carry the data (replay traces, tests).
    pub fn empty(sequence: u64) -> Self {
        Self::new(sequence, 0, 0, Bytes::new())
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &Bytes {
        &self.pixels
    }
}

/// Failure reported by an upstream port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    /// Bad frame, model hiccup, call timeout. Retried by the next tick.
    #[error("recoverable port failure: {0}")]
    Recoverable(String),
    /// The collaborator is gone (camera unplugged, model unloaded).
    #[error("fatal port failure: {0}")]
    Fatal(String),
}

impl PortError {
    pub fn recoverable(reason: impl Into<String>) -> Self {
        PortError::Recoverable(reason.into())
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        PortError::Fatal(reason.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, PortError::Fatal(_))
    }
}

/// Video capture.
#[async_trait]
pub trait FrameSource: Send {
    /// `Ok(None)` means no frame is ready yet.
    async fn next_frame(&mut self) -> Result<Option<Frame>, PortError>;
}

/// Face detection. May be stateful across frames.
#[async_trait]
pub trait FaceDetector: Send {
    /// Candidate regions in detector order; empty when nothing was found.
    async fn detect(
        &mut self,
        frame: &Frame,
        min_size: RegionSize,
    ) -> Result<Vec<Region>, PortError>;
}

/// Biometric embedding model.
#[async_trait]
pub trait EmbeddingExtractor: Send {
    async fn extract(&mut self, frame: &Frame, region: &Region) -> Result<Embedding, PortError>;
}

/// Command understood by the actuator firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Approve,
    Deny,
}

impl Command {
    /// Every denial reason collapses to a single deny on the wire.
    pub fn for_decision(decision: &Decision) -> Self {
        match decision {
            Decision::Approved => Command::Approve,
            Decision::Denied(_) => Command::Deny,
        }
    }

    /// Exact bytes expected by the deployed firmware.
    pub fn wire_bytes(&self) -> &'static [u8] {
        match self {
            Command::Approve => b"APPROVED\n",
            Command::Deny => b"DENIED\n",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Approve => "approve",
            Command::Deny => "deny",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to hand a command to the actuator.
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("actuator write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("actuator write timed out after {0:?}")]
    Timeout(Duration),
    #[error("actuator link closed")]
    Closed,
}

/// One-shot command sink. No acknowledgment protocol.
#[async_trait]
pub trait ActuatorPort: Send {
    async fn send(&mut self, command: Command) -> Result<(), ActuatorError>;
}
