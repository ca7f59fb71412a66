//! Metrics hooks for access sessions.
//!
//! The controller reports through a [`SessionMetrics`] observer so it stays
//! independent of any backend. [`MetricsFacade`] forwards to the `metrics`
//! crate facade, which is a no-op until the host installs a recorder.
use std::sync::Arc;
use std::time::Duration;

use matcher::{Decision, SimilarityScore};
use serde::Serialize;

use crate::ports::Command;

/// How a single non-terminal tick ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    FrameUnavailable,
    DetectionFailed,
    NoCandidate,
    ExtractionFailed,
    LowSimilarity,
}

impl TickOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickOutcome::FrameUnavailable => "frame_unavailable",
            TickOutcome::DetectionFailed => "detection_failed",
            TickOutcome::NoCandidate => "no_candidate",
            TickOutcome::ExtractionFailed => "extraction_failed",
            TickOutcome::LowSimilarity => "low_similarity",
        }
    }
}

/// Observer for session progress. All methods default to no-ops.
pub trait SessionMetrics: Send + Sync {
    fn record_tick(&self, _outcome: TickOutcome) {}

    fn record_score(&self, _score: SimilarityScore) {}

    /// Called once per session with the final decision and the time since the first tick.
    fn record_decision(&self, _decision: &Decision, _elapsed: Duration) {}

    fn record_delivery(&self, _command: Command, _delivered: bool) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl SessionMetrics for NoopMetrics {}

/// Forwards session events to the global `metrics` recorder.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsFacade;

impl MetricsFacade {
    pub fn shared() -> Arc<dyn SessionMetrics> {
        Arc::new(MetricsFacade)
    }
}

impl SessionMetrics for MetricsFacade {
    fn record_tick(&self, outcome: TickOutcome) {
        metrics::counter!("facegate_session_ticks_total", "outcome" => outcome.as_str())
            .increment(1);
    }

    fn record_score(&self, score: SimilarityScore) {
        metrics::histogram!("facegate_similarity_score").record(f64::from(score.value()));
    }

    fn record_decision(&self, decision: &Decision, elapsed: Duration) {
        let reason = decision.deny_reason().map_or("none", |reason| reason.as_str());
        let outcome = if decision.is_approved() {
            "approved"
        } else {
            "denied"
        };
        metrics::counter!(
            "facegate_session_decisions_total",
            "outcome" => outcome,
            "reason" => reason
        )
        .increment(1);
        metrics::histogram!("facegate_session_duration_seconds").record(elapsed.as_secs_f64());
    }

    fn record_delivery(&self, command: Command, delivered: bool) {
        let status = if delivered { "delivered" } else { "failed" };
        metrics::counter!(
            "facegate_actuator_commands_total",
            "command" => command.as_str(),
            "status" => status
        )
        .increment(1);
    }
}
