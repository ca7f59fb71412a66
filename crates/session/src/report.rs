use std::time::Duration;

use matcher::{Decision, SimilarityScore};
use serde::Serialize;

use crate::metrics::TickOutcome;
use crate::ports::Command;

/// What happened to the single command emitted at the end of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Delivery {
    Delivered { command: Command },
    Failed { command: Command, error: String },
}

impl Delivery {
    pub fn command(&self) -> Command {
        match self {
            Delivery::Delivered { command } | Delivery::Failed { command, .. } => *command,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered { .. })
    }
}

/// Per-outcome tick counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickStats {
    pub ticks: u64,
    pub frames_unavailable: u64,
    pub detection_failures: u64,
    pub no_candidate: u64,
    pub extraction_failures: u64,
    pub low_similarity: u64,
    /// Evaluations that produced a score, whatever the decision.
    pub scored: u64,
}

impl TickStats {
    pub(crate) fn observe(&mut self, outcome: TickOutcome) {
        match outcome {
            TickOutcome::FrameUnavailable => self.frames_unavailable += 1,
            TickOutcome::DetectionFailed => self.detection_failures += 1,
            TickOutcome::NoCandidate => self.no_candidate += 1,
            TickOutcome::ExtractionFailed => self.extraction_failures += 1,
            TickOutcome::LowSimilarity => self.low_similarity += 1,
        }
    }

    /// True when evaluation was attempted at least once and never produced a score.
    pub fn extraction_exhausted(&self) -> bool {
        self.extraction_failures > 0 && self.scored == 0
    }
}

/// Summary returned by [`crate::SessionController::run`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub label: String,
    pub decision: Decision,
    pub delivery: Delivery,
    #[serde(rename = "elapsed_ms", with = "crate::serde_millis")]
    pub elapsed: Duration,
    pub stats: TickStats,
    /// Highest similarity seen during the session, if anything was scored.
    pub best_score: Option<SimilarityScore>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use matcher::DenyReason;

    #[test]
    fn exhaustion_requires_failures_and_no_scores() {
        let mut stats = TickStats::default();
        assert!(!stats.extraction_exhausted());
        stats.observe(TickOutcome::ExtractionFailed);
        assert!(stats.extraction_exhausted());
        stats.scored += 1;
        assert!(!stats.extraction_exhausted());
    }

    #[test]
    fn report_serializes_for_operators() {
        let report = SessionReport {
            label: "alice".into(),
            decision: Decision::Denied(DenyReason::Timeout),
            delivery: Delivery::Failed {
                command: Command::Deny,
                error: "actuator link closed".into(),
            },
            elapsed: Duration::from_millis(30_000),
            stats: TickStats::default(),
            best_score: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["elapsed_ms"], 30_000);
        assert_eq!(json["decision"]["outcome"], "denied");
        assert_eq!(json["decision"]["reason"], "timeout");
        assert_eq!(json["delivery"]["status"], "failed");
        assert_eq!(json["delivery"]["command"], "deny");
        assert!(json["best_score"].is_null());
    }

    #[test]
    fn delivery_accessors() {
        let sent = Delivery::Delivered {
            command: Command::Approve,
        };
        assert!(sent.is_delivered());
        assert_eq!(sent.command(), Command::Approve);
    }
}
