//! Scripted in-memory ports for exercising the controller without hardware.
//!
//! Each fake replays a list of [`Step`]s and then repeats a fallback step
//! forever. `Step::Stall` never resolves, which makes the controller's
//! per-call timeout fire.

use std::collections::VecDeque;

use async_trait::async_trait;
use matcher::{Embedding, Region, RegionSize};

use crate::cancel::CancelToken;
use crate::ports::{
    ActuatorError, ActuatorPort, Command, EmbeddingExtractor, FaceDetector, Frame, FrameSource,
    PortError,
};

#[derive(Debug, Clone)]
pub enum Step<T> {
    Ready(T),
    Fail(PortError),
    Stall,
}

impl<T> Step<T> {
    pub fn recoverable(reason: &str) -> Self {
        Step::Fail(PortError::recoverable(reason))
    }

    pub fn fatal(reason: &str) -> Self {
        Step::Fail(PortError::fatal(reason))
    }
}

#[derive(Debug, Clone)]
pub struct Script<T> {
    steps: VecDeque<Step<T>>,
    then: Step<T>,
}

impl<T: Clone> Script<T> {
    pub fn new(steps: Vec<Step<T>>, then: Step<T>) -> Self {
        Self {
            steps: steps.into(),
            then,
        }
    }

    pub fn repeat(step: Step<T>) -> Self {
        Self::new(Vec::new(), step)
    }

    fn next_step(&mut self) -> Step<T> {
        self.steps.pop_front().unwrap_or_else(|| self.then.clone())
    }

    async fn play(&mut self) -> Result<T, PortError> {
        match self.next_step() {
            Step::Ready(value) => Ok(value),
            Step::Fail(err) => Err(err),
            Step::Stall => std::future::pending().await,
        }
    }
}

/// Frame source. `Step::Ready(true)` yields a frame, `Step::Ready(false)` reports
/// that no frame is ready.
#[derive(Debug)]
pub struct ScriptedFrames {
    script: Script<bool>,
    pulls: u64,
    cancel_at: Option<(u64, CancelToken)>,
}

impl ScriptedFrames {
    pub fn scripted(steps: Vec<Step<bool>>, then: Step<bool>) -> Self {
        Self {
            script: Script::new(steps, then),
            pulls: 0,
            cancel_at: None,
        }
    }

    pub fn endless() -> Self {
        Self::scripted(Vec::new(), Step::Ready(true))
    }

    pub fn starved() -> Self {
        Self::scripted(Vec::new(), Step::Ready(false))
    }

    /// Trip `token` on the given pull, emulating an operator pressing quit.
    pub fn cancel_on_pull(mut self, pull: u64, token: CancelToken) -> Self {
        self.cancel_at = Some((pull, token));
        self
    }

    pub fn pulls(&self) -> u64 {
        self.pulls
    }
}

#[async_trait]
impl FrameSource for ScriptedFrames {
    async fn next_frame(&mut self) -> Result<Option<Frame>, PortError> {
        self.pulls += 1;
        if let Some((pull, token)) = &self.cancel_at {
            if *pull == self.pulls {
                token.cancel();
            }
        }
        let sequence = self.pulls;
        let available = self.script.play().await?;
        Ok(available.then(|| Frame::empty(sequence)))
    }
}

#[derive(Debug)]
pub struct ScriptedDetector {
    script: Script<Vec<Region>>,
    min_sizes: Vec<RegionSize>,
}

impl ScriptedDetector {
    pub fn scripted(steps: Vec<Step<Vec<Region>>>, then: Step<Vec<Region>>) -> Self {
        Self {
            script: Script::new(steps, then),
            min_sizes: Vec::new(),
        }
    }

    pub fn always(regions: Vec<Region>) -> Self {
        Self::scripted(Vec::new(), Step::Ready(regions))
    }

    pub fn calls(&self) -> usize {
        self.min_sizes.len()
    }

    /// Minimum sizes passed on each call, in order.
    pub fn min_sizes(&self) -> &[RegionSize] {
        &self.min_sizes
    }
}

#[async_trait]
impl FaceDetector for ScriptedDetector {
    async fn detect(
        &mut self,
        _frame: &Frame,
        min_size: RegionSize,
    ) -> Result<Vec<Region>, PortError> {
        self.min_sizes.push(min_size);
        self.script.play().await
    }
}

#[derive(Debug)]
pub struct ScriptedExtractor {
    script: Script<Embedding>,
    regions: Vec<Region>,
}

impl ScriptedExtractor {
    pub fn scripted(steps: Vec<Step<Embedding>>, then: Step<Embedding>) -> Self {
        Self {
            script: Script::new(steps, then),
            regions: Vec::new(),
        }
    }

    pub fn always(embedding: Embedding) -> Self {
        Self::scripted(Vec::new(), Step::Ready(embedding))
    }

    pub fn calls(&self) -> usize {
        self.regions.len()
    }

    /// Regions the controller asked to embed, in order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
}

#[async_trait]
impl EmbeddingExtractor for ScriptedExtractor {
    async fn extract(&mut self, _frame: &Frame, region: &Region) -> Result<Embedding, PortError> {
        self.regions.push(*region);
        self.script.play().await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum LinkMode {
    #[default]
    Healthy,
    Closed,
    Stalled,
}

/// Actuator that records every attempted command and the bytes it would write.
#[derive(Debug, Default)]
pub struct RecordingActuator {
    mode: LinkMode,
    attempts: Vec<Command>,
    wire: Vec<u8>,
}

impl RecordingActuator {
    /// Every send fails with [`ActuatorError::Closed`].
    pub fn closed() -> Self {
        Self {
            mode: LinkMode::Closed,
            ..Self::default()
        }
    }

    /// Every send hangs until the controller gives up.
    pub fn stalled() -> Self {
        Self {
            mode: LinkMode::Stalled,
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> &[Command] {
        &self.attempts
    }

    /// Bytes successfully written.
    pub fn wire(&self) -> &[u8] {
        &self.wire
    }
}

#[async_trait]
impl ActuatorPort for RecordingActuator {
    async fn send(&mut self, command: Command) -> Result<(), ActuatorError> {
        self.attempts.push(command);
        match self.mode {
            LinkMode::Healthy => {
                self.wire.extend_from_slice(command.wire_bytes());
                Ok(())
            }
            LinkMode::Closed => Err(ActuatorError::Closed),
            LinkMode::Stalled => std::future::pending().await,
        }
    }
}
