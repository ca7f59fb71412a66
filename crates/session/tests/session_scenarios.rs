//! End-to-end session behavior against scripted ports, on paused tokio time.

use std::time::Duration;

use matcher::{Decision, DenyReason, Embedding, Region};
use session::testing::{
    RecordingActuator, ScriptedDetector, ScriptedExtractor, ScriptedFrames, Step,
};
use session::{
    CancelToken, Command, Delivery, Enrollment, SessionConfig, SessionContext, SessionController,
    SessionPorts, SessionReport, StreamActuator,
};

struct Rig {
    frames: ScriptedFrames,
    detector: ScriptedDetector,
    extractor: ScriptedExtractor,
    actuator: RecordingActuator,
    cancel: CancelToken,
}

impl Rig {
    fn new(frames: ScriptedFrames, detector: ScriptedDetector, extractor: ScriptedExtractor) -> Self {
        Self {
            frames,
            detector,
            extractor,
            actuator: RecordingActuator::default(),
            cancel: CancelToken::new(),
        }
    }

    async fn run(&mut self, ctx: &SessionContext) -> SessionReport {
        SessionController::new(
            ctx,
            SessionPorts {
                frames: &mut self.frames,
                detector: &mut self.detector,
                extractor: &mut self.extractor,
                actuator: &mut self.actuator,
            },
        )
        .with_cancel(self.cancel.clone())
        .run()
        .await
    }
}

const REFERENCE: [f32; 3] = [0.0, 0.0, 1.0];

fn context(config: SessionConfig) -> SessionContext {
    let enrollment = Enrollment::new("alice", Embedding::from(REFERENCE.to_vec())).unwrap();
    SessionContext::new(enrollment, config).unwrap()
}

/// Unit embedding whose cosine against the reference is exactly `cos`.
fn scoring(cos: f32) -> Embedding {
    Embedding::from(vec![(1.0 - cos * cos).sqrt(), 0.0, cos])
}

fn face() -> Region {
    Region::new(100, 80, 160, 160).unwrap()
}

#[tokio::test(start_paused = true)]
async fn no_face_ever_times_out_at_the_deadline() {
    let deadline = Duration::from_secs(30);
    let ctx = context(SessionConfig::default().with_deadline(deadline));
    let mut rig = Rig::new(
        ScriptedFrames::endless(),
        ScriptedDetector::always(vec![]),
        ScriptedExtractor::always(scoring(1.0)),
    );

    let report = rig.run(&ctx).await;

    assert_eq!(report.decision, Decision::Denied(DenyReason::Timeout));
    assert!(report.elapsed >= deadline, "elapsed {:?}", report.elapsed);
    assert!(report.elapsed < deadline + Duration::from_millis(50));
    assert_eq!(rig.actuator.attempts(), &[Command::Deny]);
    assert_eq!(rig.actuator.wire(), b"DENIED\n");
    assert_eq!(rig.extractor.calls(), 0);
    assert!(report.stats.no_candidate > 0);
}

#[tokio::test(start_paused = true)]
async fn extraction_failures_do_not_count_toward_denial() {
    let ctx = context(SessionConfig::default());
    let failures: Vec<Step<Embedding>> = (0..25).map(|_| Step::recoverable("bad crop")).collect();
    let mut rig = Rig::new(
        ScriptedFrames::endless(),
        ScriptedDetector::always(vec![face()]),
        ScriptedExtractor::scripted(failures, Step::Ready(scoring(0.8))),
    );

    let report = rig.run(&ctx).await;

    assert_eq!(report.decision, Decision::Approved);
    assert_eq!(report.stats.extraction_failures, 25);
    assert_eq!(rig.extractor.calls(), 26);
    assert_eq!(rig.actuator.attempts(), &[Command::Approve]);
    assert!(report.delivery.is_delivered());
}

#[tokio::test(start_paused = true)]
async fn low_then_high_similarity_approves_on_second_tick() {
    let ctx = context(SessionConfig::default().with_threshold(0.60));
    let mut rig = Rig::new(
        ScriptedFrames::endless(),
        ScriptedDetector::always(vec![face()]),
        ScriptedExtractor::scripted(vec![Step::Ready(scoring(0.59))], Step::Ready(scoring(0.75))),
    );

    let report = rig.run(&ctx).await;

    assert_eq!(report.decision, Decision::Approved);
    assert_eq!(report.stats.ticks, 2);
    assert_eq!(report.stats.low_similarity, 1);
    let best = report.best_score.unwrap().value();
    assert!((best - 0.75).abs() < 1e-5);
    assert_eq!(rig.extractor.calls(), 2);
    assert_eq!(rig.actuator.attempts(), &[Command::Approve]);
    assert_eq!(rig.actuator.wire(), b"APPROVED\n");
}

#[tokio::test(start_paused = true)]
async fn threshold_is_inclusive() {
    let ctx = context(SessionConfig::default().with_threshold(1.0));
    let mut rig = Rig::new(
        ScriptedFrames::endless(),
        ScriptedDetector::always(vec![face()]),
        // Same direction as the reference, so the score is exactly 1.0.
        ScriptedExtractor::always(Embedding::from(vec![0.0, 0.0, 2.0])),
    );

    let report = rig.run(&ctx).await;
    assert_eq!(report.decision, Decision::Approved);
    assert_eq!(report.stats.ticks, 1);
}

#[tokio::test(start_paused = true)]
async fn manual_cancel_stops_ticking() {
    let ctx = context(SessionConfig::default());
    let cancel = CancelToken::new();
    let mut rig = Rig::new(
        ScriptedFrames::endless().cancel_on_pull(3, cancel.clone()),
        ScriptedDetector::always(vec![face()]),
        ScriptedExtractor::always(scoring(0.2)),
    );
    rig.cancel = cancel;

    let report = rig.run(&ctx).await;

    assert_eq!(report.decision, Decision::Denied(DenyReason::ManualCancel));
    assert_eq!(rig.frames.pulls(), 3);
    assert_eq!(report.stats.ticks, 3);
    assert_eq!(rig.actuator.attempts(), &[Command::Deny]);
}

#[tokio::test(start_paused = true)]
async fn cancel_before_first_tick_never_pulls_a_frame() {
    let ctx = context(SessionConfig::default());
    let mut rig = Rig::new(
        ScriptedFrames::endless(),
        ScriptedDetector::always(vec![face()]),
        ScriptedExtractor::always(scoring(1.0)),
    );
    rig.cancel.cancel();

    let report = rig.run(&ctx).await;

    assert_eq!(report.decision, Decision::Denied(DenyReason::ManualCancel));
    assert_eq!(rig.frames.pulls(), 0);
    assert_eq!(rig.actuator.attempts(), &[Command::Deny]);
}

#[tokio::test(start_paused = true)]
async fn only_extraction_failures_until_deadline_is_reported_as_exhausted() {
    let ctx = context(SessionConfig::default().with_deadline(Duration::from_secs(2)));
    let mut rig = Rig::new(
        ScriptedFrames::endless(),
        ScriptedDetector::always(vec![face()]),
        ScriptedExtractor::scripted(vec![], Step::recoverable("model hiccup")),
    );

    let report = rig.run(&ctx).await;

    assert_eq!(
        report.decision,
        Decision::Denied(DenyReason::ExtractionExhausted)
    );
    assert_eq!(rig.actuator.attempts(), &[Command::Deny]);
}

#[tokio::test(start_paused = true)]
async fn low_similarity_until_deadline_is_a_plain_timeout() {
    let ctx = context(SessionConfig::default().with_deadline(Duration::from_secs(2)));
    let mut rig = Rig::new(
        ScriptedFrames::endless(),
        ScriptedDetector::always(vec![face()]),
        ScriptedExtractor::scripted(
            vec![Step::recoverable("bad crop")],
            Step::Ready(scoring(0.1)),
        ),
    );

    let report = rig.run(&ctx).await;

    assert_eq!(report.decision, Decision::Denied(DenyReason::Timeout));
    assert!(report.stats.low_similarity > 0);
}

#[tokio::test(start_paused = true)]
async fn stalled_extractor_is_treated_as_a_failed_tick() {
    let ctx = context(
        SessionConfig::default()
            .with_deadline(Duration::from_secs(10))
            .with_call_timeout(Duration::from_secs(3)),
    );
    let mut rig = Rig::new(
        ScriptedFrames::endless(),
        ScriptedDetector::always(vec![face()]),
        ScriptedExtractor::scripted(vec![Step::Stall], Step::Ready(scoring(0.9))),
    );

    let report = rig.run(&ctx).await;

    assert_eq!(report.decision, Decision::Approved);
    assert_eq!(report.stats.extraction_failures, 1);
    assert!(report.elapsed >= Duration::from_secs(3));
    assert!(report.elapsed < Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn stalled_frame_source_cannot_outlive_the_deadline_by_more_than_one_call() {
    let deadline = Duration::from_secs(5);
    let call_timeout = Duration::from_secs(2);
    let ctx = context(
        SessionConfig::default()
            .with_deadline(deadline)
            .with_call_timeout(call_timeout),
    );
    let mut rig = Rig::new(
        ScriptedFrames::scripted(vec![], Step::Stall),
        ScriptedDetector::always(vec![face()]),
        ScriptedExtractor::always(scoring(1.0)),
    );

    let report = rig.run(&ctx).await;

    assert_eq!(report.decision, Decision::Denied(DenyReason::Timeout));
    assert!(report.elapsed >= deadline);
    assert!(report.elapsed <= deadline + call_timeout + Duration::from_millis(10));
    assert_eq!(rig.actuator.attempts(), &[Command::Deny]);
}

#[tokio::test(start_paused = true)]
async fn dimension_mismatch_aborts_with_configuration_error() {
    let ctx = context(SessionConfig::default());
    let mut rig = Rig::new(
        ScriptedFrames::endless(),
        ScriptedDetector::always(vec![face()]),
        ScriptedExtractor::always(Embedding::from(vec![0.1; 128])),
    );

    let report = rig.run(&ctx).await;

    assert_eq!(
        report.decision,
        Decision::Denied(DenyReason::ConfigurationError)
    );
    assert_eq!(report.stats.ticks, 1);
    assert_eq!(report.stats.scored, 0);
    assert_eq!(rig.actuator.attempts(), &[Command::Deny]);
}

#[tokio::test(start_paused = true)]
async fn largest_region_is_embedded() {
    let ctx = context(SessionConfig::default());
    let small = Region::new(0, 0, 90, 90).unwrap();
    let large = Region::new(200, 0, 150, 150).unwrap();
    let tie = Region::new(400, 0, 150, 150).unwrap();
    let mut rig = Rig::new(
        ScriptedFrames::endless(),
        ScriptedDetector::always(vec![small, large, tie]),
        ScriptedExtractor::always(scoring(0.9)),
    );

    rig.run(&ctx).await;

    assert_eq!(rig.extractor.regions(), &[large]);
}

#[tokio::test(start_paused = true)]
async fn actuator_failure_is_reported_not_retried() {
    let ctx = context(SessionConfig::default());
    let mut rig = Rig::new(
        ScriptedFrames::endless(),
        ScriptedDetector::always(vec![face()]),
        ScriptedExtractor::always(scoring(0.9)),
    );
    rig.actuator = RecordingActuator::closed();

    let report = rig.run(&ctx).await;

    assert_eq!(report.decision, Decision::Approved);
    assert_eq!(rig.actuator.attempts(), &[Command::Approve]);
    assert!(rig.actuator.wire().is_empty());
    assert_eq!(
        report.delivery,
        Delivery::Failed {
            command: Command::Approve,
            error: "actuator link closed".into(),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn stream_actuator_writes_exactly_one_line() {
    let ctx = context(SessionConfig::default().with_deadline(Duration::from_millis(100)));
    let mut frames = ScriptedFrames::starved();
    let mut detector = ScriptedDetector::always(vec![]);
    let mut extractor = ScriptedExtractor::always(scoring(1.0));
    let mut actuator = StreamActuator::new(Vec::new());

    let report = SessionController::new(
        &ctx,
        SessionPorts {
            frames: &mut frames,
            detector: &mut detector,
            extractor: &mut extractor,
            actuator: &mut actuator,
        },
    )
    .run()
    .await;

    assert_eq!(report.decision, Decision::Denied(DenyReason::Timeout));
    assert_eq!(report.stats.frames_unavailable, report.stats.ticks);
    assert_eq!(detector.calls(), 0);
    assert_eq!(actuator.into_inner(), b"DENIED\n");
}

#[tokio::test(start_paused = true)]
async fn deadline_past_the_clock_range_never_elapses() {
    let ctx = context(SessionConfig::default().with_deadline(Duration::from_secs(u64::MAX)));
    let mut rig = Rig::new(
        ScriptedFrames::endless(),
        ScriptedDetector::always(vec![face()]),
        ScriptedExtractor::scripted(vec![Step::Ready(scoring(0.1))], Step::Ready(scoring(0.9))),
    );

    let report = rig.run(&ctx).await;
    assert_eq!(report.decision, Decision::Approved);
    assert_eq!(rig.actuator.attempts(), &[Command::Approve]);

    let mut rig = Rig::new(
        ScriptedFrames::endless(),
        ScriptedDetector::always(vec![face()]),
        ScriptedExtractor::always(scoring(1.0)),
    );
    rig.cancel.cancel();

    let report = rig.run(&ctx).await;
    assert_eq!(report.decision, Decision::Denied(DenyReason::ManualCancel));
    assert_eq!(rig.actuator.wire(), b"DENIED\n");
}

#[tokio::test(start_paused = true)]
async fn port_calls_are_cut_short_at_the_deadline() {
    let deadline = Duration::from_secs(5);
    let ctx = context(
        SessionConfig::default()
            .with_deadline(deadline)
            .with_call_timeout(Duration::from_secs(3)),
    );
    let mut rig = Rig::new(
        ScriptedFrames::endless(),
        ScriptedDetector::always(vec![face()]),
        ScriptedExtractor::scripted(vec![], Step::Stall),
    );

    let report = rig.run(&ctx).await;

    // The second stalled extraction starts about 3s in and gets only the 2s left.
    assert_eq!(
        report.decision,
        Decision::Denied(DenyReason::ExtractionExhausted)
    );
    assert_eq!(rig.extractor.calls(), 2);
    assert!(report.elapsed >= deadline);
    assert!(report.elapsed < deadline + Duration::from_millis(10), "elapsed {:?}", report.elapsed);
    assert_eq!(rig.actuator.attempts(), &[Command::Deny]);
}
