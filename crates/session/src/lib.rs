//! # Facegate Session (`session`)
//!
//! ## Purpose
//!
//! `session` runs one bounded access attempt: it pulls frames, asks the
//! detector and embedding model for a candidate, scores it against the
//! enrolled reference with [`matcher`], and sends exactly one approve or deny
//! command to the actuator when the session concludes.
//!
//! ## Core Types
//!
//! - [`SessionController`]: the tick loop, deadline and cancellation.
//! - [`SessionState`] / [`SessionEvent`] / [`transition`]: the pure lifecycle
//!   state machine the controller folds events into.
//! - [`FrameSource`], [`FaceDetector`], [`EmbeddingExtractor`],
//!   [`ActuatorPort`]: async ports implemented by adapters.
//! - [`SessionReport`]: final decision, delivery outcome and tick statistics.
//!
//! ## Failure handling
//!
//! Missing frames, detector misses, extraction errors and low similarity keep
//! the session scanning. The deadline, a cancel request, an approval, an
//! enrollment/model dimension mismatch, or a fatal port error conclude it.
//! A failed actuator write is logged at error level and reported in
//! [`Delivery::Failed`]; it never panics or retries.

pub mod actuator;
pub mod cancel;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod report;
mod serde_millis;
pub mod state;
#[doc(hidden)]
pub mod testing;

pub use crate::actuator::StreamActuator;
pub use crate::cancel::CancelToken;
pub use crate::config::SessionConfig;
pub use crate::context::{Enrollment, SessionContext};
pub use crate::controller::{SessionController, SessionPorts};
pub use crate::error::SessionError;
pub use crate::metrics::{MetricsFacade, NoopMetrics, SessionMetrics, TickOutcome};
pub use crate::ports::{
    ActuatorError, ActuatorPort, Command, EmbeddingExtractor, FaceDetector, Frame, FrameSource,
    PortError,
};
pub use crate::report::{Delivery, SessionReport, TickStats};
pub use crate::state::{transition, SessionEvent, SessionState};
