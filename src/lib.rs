//! Workspace umbrella crate for facegate.
//!
//! This crate wires the `matcher` and `session` crates to concrete inputs: a
//! YAML config file, a JSON enrollment store, a recorded detection trace, and
//! an actuator device. The `facegate` binary is a thin shell over
//! [`build_context`], [`open_actuator`] and [`run_replay`].

pub mod config;
pub mod enrollment;
pub mod replay;
pub mod telemetry;

pub use matcher::{
    Decision, DenyReason, Embedding, MatchError, MatchPolicy, Region, RegionSize, SimilarityScore,
};
pub use session::{
    ActuatorPort, CancelToken, Command, Delivery, Enrollment, MetricsFacade, SessionConfig,
    SessionContext, SessionController, SessionError, SessionPorts, SessionReport, StreamActuator,
};

pub use crate::config::{ConfigLoadError, FacegateConfig};
pub use crate::enrollment::{EnrollmentError, EnrollmentSource, JsonEnrollmentSource};
pub use crate::replay::{ReplayError, ReplayFeed};

use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tracing::info;

/// Startup failures. Once a session is running, outcomes are reported through
/// [`SessionReport`] instead.
#[derive(Debug, Error)]
pub enum FacegateError {
    #[error(transparent)]
    Config(#[from] ConfigLoadError),

    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("actuator device {path}: {source}")]
    Device {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolve the configured label against `source` and validate the session policy.
pub fn build_context(
    config: &FacegateConfig,
    source: &impl EnrollmentSource,
) -> Result<SessionContext, FacegateError> {
    let label = config.require_label()?;
    let enrollment = source.enrollment(label)?;
    let session = config.session.to_session_config();
    let context = SessionContext::new(enrollment, session)?;
    info!(
        label,
        dim = context.enrollment().embedding().dim(),
        threshold = context.policy().threshold(),
        "session context ready"
    );
    Ok(context)
}

/// Open the configured actuator device for appending, then wait out its settle time.
pub async fn open_actuator(config: &FacegateConfig) -> Result<StreamActuator<File>, FacegateError> {
    let device = config.require_device()?;
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .append(true)
        .open(device)
        .await
        .map_err(|source| FacegateError::Device {
            path: device.to_path_buf(),
            source,
        })?;

    let settle = config.actuator.settle();
    if !settle.is_zero() {
        info!(device = %device.display(), settle_ms = config.actuator.settle_ms, "waiting for actuator");
        tokio::time::sleep(settle).await;
    }
    Ok(StreamActuator::new(file))
}

/// Drive one session over a replay trace, reporting to the global metrics recorder.
pub async fn run_replay(
    context: &SessionContext,
    feed: &mut ReplayFeed,
    actuator: &mut dyn ActuatorPort,
    cancel: CancelToken,
) -> SessionReport {
    SessionController::new(
        context,
        SessionPorts {
            frames: &mut feed.frames,
            detector: &mut feed.detector,
            extractor: &mut feed.extractor,
            actuator,
        },
    )
    .with_cancel(cancel)
    .with_metrics(MetricsFacade::shared())
    .run()
    .await
}
