//! The tick loop that drives one access session to exactly one actuator command.
//!
//! Each tick checks the deadline, then the cancel flag, then attempts one
//! frame: detect, select the largest region, extract, score, evaluate. Every
//! port call is bounded by `call_timeout` and by the time left before the
//! deadline, so a stalled call cannot carry the session past it by more than
//! the call already in flight. Per-tick failures stay
//! inside the loop. Only the deadline, a cancel request, an approval, or a
//! fault concludes the session, after which the command is sent once.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use matcher::{score, Decision, Selection, SimilarityScore};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::cancel::CancelToken;
use crate::context::SessionContext;
use crate::metrics::{NoopMetrics, SessionMetrics, TickOutcome};
use crate::ports::{
    ActuatorError, ActuatorPort, Command, EmbeddingExtractor, FaceDetector, FrameSource, PortError,
};
use crate::report::{Delivery, SessionReport, TickStats};
use crate::serde_millis::whole_millis;
use crate::state::{transition, SessionEvent, SessionState};

/// The collaborators one session borrows for its lifetime.
pub struct SessionPorts<'a> {
    pub frames: &'a mut dyn FrameSource,
    pub detector: &'a mut dyn FaceDetector,
    pub extractor: &'a mut dyn EmbeddingExtractor,
    pub actuator: &'a mut dyn ActuatorPort,
}

/// Owns the session state from the first tick to the single command send.
///
/// # Example
/// ```
/// use matcher::{Decision, Embedding, Region};
/// use session::testing::{RecordingActuator, ScriptedDetector, ScriptedExtractor, ScriptedFrames};
/// use session::{Enrollment, SessionConfig, SessionContext, SessionController, SessionPorts};
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let enrollment = Enrollment::new("alice", Embedding::from(vec![1.0, 0.0])).unwrap();
/// let ctx = SessionContext::new(enrollment, SessionConfig::default()).unwrap();
///
/// let mut frames = ScriptedFrames::endless();
/// let mut detector = ScriptedDetector::always(vec![Region::new(0, 0, 120, 120).unwrap()]);
/// let mut extractor = ScriptedExtractor::always(Embedding::from(vec![0.9, 0.1]));
/// let mut actuator = RecordingActuator::default();
///
/// let report = SessionController::new(
///     &ctx,
///     SessionPorts {
///         frames: &mut frames,
///         detector: &mut detector,
///         extractor: &mut extractor,
///         actuator: &mut actuator,
///     },
/// )
/// .run()
/// .await;
///
/// assert_eq!(report.decision, Decision::Approved);
/// assert_eq!(actuator.wire(), b"APPROVED\n");
/// # });
/// ```
pub struct SessionController<'a> {
    ctx: &'a SessionContext,
    ports: SessionPorts<'a>,
    cancel: CancelToken,
    metrics: Arc<dyn SessionMetrics>,
    state: SessionState,
    stats: TickStats,
    best_score: Option<SimilarityScore>,
}

impl<'a> SessionController<'a> {
    pub fn new(ctx: &'a SessionContext, ports: SessionPorts<'a>) -> Self {
        Self {
            ctx,
            ports,
            cancel: CancelToken::new(),
            metrics: Arc::new(NoopMetrics),
            state: SessionState::Idle,
            stats: TickStats::default(),
            best_score: None,
        }
    }

    /// Observe `token` for manual cancellation. It is polled once per tick.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn SessionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session to completion. Never fails: every outcome, including
    /// actuator delivery failure, is described by the returned report.
    pub async fn run(self) -> SessionReport {
        let span = info_span!(
            "session",
            label = %self.ctx.enrollment().label(),
            deadline_ms = whole_millis(self.ctx.config().deadline)
        );
        self.drive().instrument(span).await
    }

    async fn drive(mut self) -> SessionReport {
        let config = *self.ctx.config();
        let started = Instant::now();
        // A window past the clock's range never elapses.
        let deadline = started.checked_add(config.deadline);
        info!(threshold = self.ctx.policy().threshold(), "session started");

        self.apply(SessionEvent::Started);
        let decision = loop {
            if let Some(outcome) = self.tick(deadline).await {
                self.stats.observe(outcome);
                self.metrics.record_tick(outcome);
            }
            match self.state.decision() {
                Some(decision) => break decision,
                None => sleep(config.tick_interval).await,
            }
        };

        let elapsed = started.elapsed();
        self.metrics.record_decision(&decision, elapsed);

        let delivery = self.deliver(decision, config.call_timeout).await;
        SessionReport {
            label: self.ctx.enrollment().label().to_string(),
            decision,
            delivery,
            elapsed,
            stats: self.stats,
            best_score: self.best_score,
        }
    }

    /// One frame attempt. Returns how a non-terminal tick ended, or `None` when
    /// the tick concluded the session.
    async fn tick(&mut self, deadline: Option<Instant>) -> Option<TickOutcome> {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            let extraction_exhausted = self.stats.extraction_exhausted();
            self.apply(SessionEvent::DeadlineElapsed {
                extraction_exhausted,
            });
            return None;
        }
        if self.cancel.is_cancelled() {
            self.apply(SessionEvent::CancelRequested);
            return None;
        }

        self.stats.ticks += 1;
        let min_size = self.ctx.config().min_region_size;

        let limit = self.call_limit(deadline);
        let frame = match bounded(limit, "frame", self.ports.frames.next_frame()).await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                return self.carry_on(SessionEvent::FrameUnavailable, TickOutcome::FrameUnavailable)
            }
            Err(err) => {
                if self.upstream_fault("frame", &err) {
                    return None;
                }
                debug!(error = %err, "frame unavailable");
                return self.carry_on(SessionEvent::FrameUnavailable, TickOutcome::FrameUnavailable);
            }
        };

        let limit = self.call_limit(deadline);
        let candidates = match bounded(limit, "detect", self.ports.detector.detect(&frame, min_size))
            .await
        {
            Ok(candidates) => candidates,
            Err(err) => {
                if self.upstream_fault("detect", &err) {
                    return None;
                }
                debug!(frame = frame.sequence(), error = %err, "detection failed");
                return self.carry_on(SessionEvent::DetectionFailed, TickOutcome::DetectionFailed);
            }
        };

        let region = match self.ctx.policy().select_region(&candidates) {
            Selection::Selected { index, region } => {
                debug!(
                    frame = frame.sequence(),
                    index,
                    candidates = candidates.len(),
                    area = region.area(),
                    "region selected"
                );
                region
            }
            Selection::NoCandidate => {
                return self.carry_on(SessionEvent::NoCandidate, TickOutcome::NoCandidate)
            }
        };
        self.apply(SessionEvent::RegionSelected);

        let limit = self.call_limit(deadline);
        let embedding = match bounded(
            limit,
            "extract",
            self.ports.extractor.extract(&frame, &region),
        )
        .await
        {
            Ok(embedding) => embedding,
            Err(err) => {
                if self.upstream_fault("extract", &err) {
                    return None;
                }
                warn!(frame = frame.sequence(), error = %err, "embedding extraction failed");
                return self.carry_on(SessionEvent::ExtractionFailed, TickOutcome::ExtractionFailed);
            }
        };

        let similarity = match score(self.ctx.enrollment().embedding(), &embedding) {
            Ok(similarity) => similarity,
            Err(err) if err.is_configuration_fault() => {
                error!(
                    frame = frame.sequence(),
                    error = %err,
                    "enrollment and extractor disagree; aborting session"
                );
                self.apply(SessionEvent::ConfigurationFault);
                return None;
            }
            Err(err) => {
                warn!(frame = frame.sequence(), error = %err, "extracted embedding unusable");
                return self.carry_on(SessionEvent::ExtractionFailed, TickOutcome::ExtractionFailed);
            }
        };

        self.stats.scored += 1;
        self.metrics.record_score(similarity);
        if self.best_score.is_none_or(|best| similarity > best) {
            self.best_score = Some(similarity);
        }

        let decision = self.ctx.policy().evaluate(similarity);
        info!(frame = frame.sequence(), score = %similarity, %decision, "frame scored");
        self.apply(SessionEvent::Scored(decision));
        if self.state.is_terminal() {
            None
        } else {
            Some(TickOutcome::LowSimilarity)
        }
    }

    /// `call_timeout`, shortened to whatever is left before the deadline.
    fn call_limit(&self, deadline: Option<Instant>) -> Duration {
        let limit = self.ctx.config().call_timeout;
        match deadline {
            Some(deadline) => limit.min(deadline.saturating_duration_since(Instant::now())),
            None => limit,
        }
    }

    fn carry_on(&mut self, event: SessionEvent, outcome: TickOutcome) -> Option<TickOutcome> {
        self.apply(event);
        Some(outcome)
    }

    /// Conclude on a fatal port error. Returns `true` when the session ended.
    fn upstream_fault(&mut self, stage: &'static str, err: &PortError) -> bool {
        if !err.is_fatal() {
            return false;
        }
        error!(stage, error = %err, "upstream collaborator failed; aborting session");
        self.apply(SessionEvent::UpstreamFault);
        true
    }

    fn apply(&mut self, event: SessionEvent) {
        let next = transition(self.state, &event);
        if next != self.state {
            debug!(
                from = self.state.as_str(),
                to = next.as_str(),
                ?event,
                "session transition"
            );
            if let Some(decision) = next.decision() {
                info!(%decision, "session concluded");
            }
        }
        self.state = next;
    }

    async fn deliver(&mut self, decision: Decision, limit: Duration) -> Delivery {
        let command = Command::for_decision(&decision);
        let result = match timeout(limit, self.ports.actuator.send(command)).await {
            Ok(result) => result,
            Err(_) => Err(ActuatorError::Timeout(limit)),
        };

        match result {
            Ok(()) => {
                info!(%command, "actuator command delivered");
                self.metrics.record_delivery(command, true);
                Delivery::Delivered { command }
            }
            Err(err) => {
                error!(
                    %command,
                    %decision,
                    error = %err,
                    "ACTUATOR NOT SIGNALLED: no physical signal was delivered for this session"
                );
                self.metrics.record_delivery(command, false);
                Delivery::Failed {
                    command,
                    error: err.to_string(),
                }
            }
        }
    }
}

/// Apply the per-call timeout. An elapsed timeout is a recoverable failure.
async fn bounded<T, F>(limit: Duration, stage: &'static str, call: F) -> Result<T, PortError>
where
    F: Future<Output = Result<T, PortError>>,
{
    match timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(PortError::recoverable(format!(
            "{stage} call exceeded {limit:?}"
        ))),
    }
}
