use std::time::Duration;

use matcher::{MatchPolicy, RegionSize, DEFAULT_THRESHOLD};

use crate::error::SessionError;

/// Runtime knobs for one access session.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use session::SessionConfig;
///
/// let cfg = SessionConfig::default()
///     .with_threshold(0.55)
///     .with_deadline(Duration::from_secs(10));
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Inclusive accept threshold on cosine similarity.
    pub threshold: f32,
    /// Session window measured from the first tick.
    pub deadline: Duration,
    /// Upper bound for any single frame, detection, extraction or actuator call.
    pub call_timeout: Duration,
    /// Pause at the end of every non-terminal tick.
    pub tick_interval: Duration,
    /// Passed through to the detector.
    pub min_region_size: RegionSize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            deadline: Duration::from_secs(30),
            call_timeout: Duration::from_secs(3),
            tick_interval: Duration::from_millis(1),
            min_region_size: RegionSize::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_min_region_size(mut self, size: RegionSize) -> Self {
        self.min_region_size = size;
        self
    }

    /// Build the match policy described by this config.
    pub fn policy(&self) -> Result<MatchPolicy, SessionError> {
        Ok(MatchPolicy::new(self.threshold)?)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        self.policy()?;
        if self.deadline.is_zero() {
            return Err(SessionError::InvalidConfig(
                "deadline must be greater than zero".into(),
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(SessionError::InvalidConfig(
                "call_timeout must be greater than zero".into(),
            ));
        }
        if self.tick_interval.is_zero() {
            return Err(SessionError::InvalidConfig(
                "tick_interval must be greater than zero".into(),
            ));
        }
        if self.tick_interval >= self.deadline {
            return Err(SessionError::InvalidConfig(
                "tick_interval must be shorter than the deadline".into(),
            ));
        }
        Ok(())
    }
}
