//! Session lifecycle and the pure transition function.
//!
//! ```text
//! Idle ──Started──▶ Scanning ──RegionSelected──▶ Evaluating
//!                     ▲  │                          │
//!                     │  └─ FrameUnavailable,       ├─ ExtractionFailed ─▶ Scanning
//!                     │     DetectionFailed,        ├─ Scored(LowSimilarity) ─▶ Scanning
//!                     │     NoCandidate             └─ Scored(Approved) ─▶ Concluded(Approved)
//!                     └─────────────────────────────────
//! any non-terminal ── DeadlineElapsed / CancelRequested / ConfigurationFault / UpstreamFault
//!                 ──▶ Concluded(Denied(..))
//! ```
//!
//! `Concluded` absorbs every event, so a decision can be set once and never
//! regresses.

use matcher::{Decision, DenyReason};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "decision", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Scanning,
    Evaluating,
    Concluded(Decision),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Concluded(_))
    }

    pub fn decision(&self) -> Option<Decision> {
        match self {
            SessionState::Concluded(decision) => Some(*decision),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Scanning => "scanning",
            SessionState::Evaluating => "evaluating",
            SessionState::Concluded(_) => "concluded",
        }
    }
}

/// Everything the controller can observe during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Started,
    /// The session window closed. `extraction_exhausted` is set when every
    /// evaluation attempt so far failed at extraction.
    DeadlineElapsed { extraction_exhausted: bool },
    CancelRequested,
    FrameUnavailable,
    DetectionFailed,
    NoCandidate,
    RegionSelected,
    ExtractionFailed,
    Scored(Decision),
    /// Enrollment and model disagree (e.g. embedding dimension).
    ConfigurationFault,
    /// A port reported a non-recoverable failure.
    UpstreamFault,
}

/// Apply one event. Events that do not apply to the current state leave it unchanged.
pub fn transition(state: SessionState, event: &SessionEvent) -> SessionState {
    use SessionEvent as E;
    use SessionState as S;

    match (state, *event) {
        (S::Concluded(decision), _) => S::Concluded(decision),

        (_, E::DeadlineElapsed {
            extraction_exhausted,
        }) => {
            let reason = if extraction_exhausted {
                DenyReason::ExtractionExhausted
            } else {
                DenyReason::Timeout
            };
            S::Concluded(Decision::Denied(reason))
        }
        (_, E::CancelRequested) => S::Concluded(Decision::Denied(DenyReason::ManualCancel)),
        (_, E::ConfigurationFault) => {
            S::Concluded(Decision::Denied(DenyReason::ConfigurationError))
        }
        (_, E::UpstreamFault) => S::Concluded(Decision::Denied(DenyReason::UpstreamFailure)),

        (S::Idle, E::Started) => S::Scanning,

        (S::Scanning, E::FrameUnavailable | E::DetectionFailed | E::NoCandidate) => S::Scanning,
        (S::Scanning, E::RegionSelected) => S::Evaluating,

        (S::Evaluating, E::ExtractionFailed) => S::Scanning,
        (S::Evaluating, E::Scored(Decision::Approved)) => S::Concluded(Decision::Approved),
        (S::Evaluating, E::Scored(Decision::Denied(DenyReason::LowSimilarity))) => S::Scanning,
        (S::Evaluating, E::Scored(denied)) => S::Concluded(denied),

        (state, _) => state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(events: &[SessionEvent]) -> SessionState {
        events
            .iter()
            .fold(SessionState::Idle, |state, event| transition(state, event))
    }

    const LOW: SessionEvent = SessionEvent::Scored(Decision::Denied(DenyReason::LowSimilarity));

    #[test]
    fn started_moves_idle_to_scanning() {
        assert_eq!(run(&[SessionEvent::Started]), SessionState::Scanning);
    }

    #[test]
    fn idle_tick_outcomes_stay_scanning() {
        let state = run(&[
            SessionEvent::Started,
            SessionEvent::FrameUnavailable,
            SessionEvent::NoCandidate,
            SessionEvent::DetectionFailed,
        ]);
        assert_eq!(state, SessionState::Scanning);
    }

    #[test]
    fn extraction_failure_returns_to_scanning() {
        let state = run(&[
            SessionEvent::Started,
            SessionEvent::RegionSelected,
            SessionEvent::ExtractionFailed,
        ]);
        assert_eq!(state, SessionState::Scanning);
    }

    #[test]
    fn low_similarity_is_not_final() {
        let state = run(&[SessionEvent::Started, SessionEvent::RegionSelected, LOW]);
        assert_eq!(state, SessionState::Scanning);
    }

    #[test]
    fn approval_concludes() {
        let state = run(&[
            SessionEvent::Started,
            SessionEvent::RegionSelected,
            LOW,
            SessionEvent::RegionSelected,
            SessionEvent::Scored(Decision::Approved),
        ]);
        assert_eq!(state, SessionState::Concluded(Decision::Approved));
    }

    #[test]
    fn deadline_reason_depends_on_extraction_history() {
        let timeout = run(&[
            SessionEvent::Started,
            SessionEvent::DeadlineElapsed {
                extraction_exhausted: false,
            },
        ]);
        assert_eq!(
            timeout.decision(),
            Some(Decision::Denied(DenyReason::Timeout))
        );

        let exhausted = run(&[
            SessionEvent::Started,
            SessionEvent::DeadlineElapsed {
                extraction_exhausted: true,
            },
        ]);
        assert_eq!(
            exhausted.decision(),
            Some(Decision::Denied(DenyReason::ExtractionExhausted))
        );
    }

    #[test]
    fn cancel_and_faults_conclude_from_any_live_state() {
        for live in [
            SessionState::Idle,
            SessionState::Scanning,
            SessionState::Evaluating,
        ] {
            assert_eq!(
                transition(live, &SessionEvent::CancelRequested),
                SessionState::Concluded(Decision::Denied(DenyReason::ManualCancel))
            );
            assert_eq!(
                transition(live, &SessionEvent::ConfigurationFault),
                SessionState::Concluded(Decision::Denied(DenyReason::ConfigurationError))
            );
            assert_eq!(
                transition(live, &SessionEvent::UpstreamFault),
                SessionState::Concluded(Decision::Denied(DenyReason::UpstreamFailure))
            );
        }
    }

    #[test]
    fn terminal_state_never_regresses() {
        let events = [
            SessionEvent::Started,
            SessionEvent::CancelRequested,
            SessionEvent::RegionSelected,
            SessionEvent::Scored(Decision::Approved),
            SessionEvent::DeadlineElapsed {
                extraction_exhausted: false,
            },
            SessionEvent::ConfigurationFault,
            SessionEvent::ExtractionFailed,
        ];
        assert_eq!(
            run(&events),
            SessionState::Concluded(Decision::Denied(DenyReason::ManualCancel))
        );
    }

    #[test]
    fn out_of_order_events_are_ignored() {
        assert_eq!(
            transition(SessionState::Idle, &SessionEvent::RegionSelected),
            SessionState::Idle
        );
        assert_eq!(
            transition(SessionState::Scanning, &SessionEvent::Scored(Decision::Approved)),
            SessionState::Scanning
        );
        assert_eq!(
            transition(SessionState::Evaluating, &SessionEvent::Started),
            SessionState::Evaluating
        );
    }

    #[test]
    fn state_serializes_with_decision() {
        let json =
            serde_json::to_string(&SessionState::Concluded(Decision::Approved)).unwrap();
        assert_eq!(json, r#"{"state":"concluded","decision":{"outcome":"approved"}}"#);
        assert_eq!(
            serde_json::to_string(&SessionState::Scanning).unwrap(),
            r#"{"state":"scanning"}"#
        );
    }
}
