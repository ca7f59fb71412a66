//! YAML configuration for the facegate binary.
//!
//! One file describes the session policy, where the enrollment lives, which
//! device the actuator is attached to, and how to log.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//!
//! session:
//!   threshold: 0.60
//!   deadline_seconds: 30
//!   call_timeout_ms: 3000
//!   tick_interval_ms: 1
//!   min_region_size: [80, 80]
//!
//! enrollment:
//!   path: "enroll/face_db.json"
//!   label: "alice"
//!
//! actuator:
//!   device: "/dev/ttyACM0"
//!   settle_ms: 2000
//!
//! logging:
//!   level: "info"
//!   json: false
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use matcher::{DEFAULT_THRESHOLD, RegionSize};
use serde::{Deserialize, Serialize};
use session::SessionConfig;
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("missing required field: {0}")]
    MissingField(String),
}

/// Top-level YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FacegateConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub session: SessionYamlConfig,

    #[serde(default)]
    pub enrollment: EnrollmentYamlConfig,

    #[serde(default)]
    pub actuator: ActuatorYamlConfig,

    #[serde(default)]
    pub logging: LoggingYamlConfig,
}

impl FacegateConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: FacegateConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.session.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Label to authenticate, or an error when neither the file nor an override names one.
    pub fn require_label(&self) -> Result<&str, ConfigLoadError> {
        match self.enrollment.label.as_deref() {
            Some(label) if !label.trim().is_empty() => Ok(label),
            _ => Err(ConfigLoadError::MissingField("enrollment.label".to_string())),
        }
    }

    pub fn require_device(&self) -> Result<&Path, ConfigLoadError> {
        self.actuator
            .device
            .as_deref()
            .ok_or_else(|| ConfigLoadError::MissingField("actuator.device".to_string()))
    }
}

impl Default for FacegateConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            session: SessionYamlConfig::default(),
            enrollment: EnrollmentYamlConfig::default(),
            actuator: ActuatorYamlConfig::default(),
            logging: LoggingYamlConfig::default(),
        }
    }
}

/// Session policy YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionYamlConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    #[serde(default = "default_deadline_seconds")]
    pub deadline_seconds: f64,

    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// `[width, height]` passed through to the detector.
    #[serde(default = "default_min_region_size")]
    pub min_region_size: (u32, u32),
}

impl SessionYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if !self.deadline_seconds.is_finite() || self.deadline_seconds <= 0.0 {
            return Err(ConfigLoadError::Validation(
                "session.deadline_seconds must be > 0".to_string(),
            ));
        }
        if self.call_timeout_ms == 0 {
            return Err(ConfigLoadError::Validation(
                "session.call_timeout_ms must be >= 1".to_string(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigLoadError::Validation(
                "session.tick_interval_ms must be >= 1".to_string(),
            ));
        }
        let (width, height) = self.min_region_size;
        if width == 0 || height == 0 {
            return Err(ConfigLoadError::Validation(
                "session.min_region_size must be non-zero in both dimensions".to_string(),
            ));
        }
        self.to_session_config()
            .validate()
            .map_err(|err| ConfigLoadError::Validation(format!("session: {err}")))
    }

    /// Convert to the session crate's runtime config.
    pub fn to_session_config(&self) -> SessionConfig {
        let (width, height) = self.min_region_size;
        SessionConfig::default()
            .with_threshold(self.threshold)
            .with_deadline(Duration::try_from_secs_f64(self.deadline_seconds).unwrap_or(Duration::ZERO))
            .with_call_timeout(Duration::from_millis(self.call_timeout_ms))
            .with_tick_interval(Duration::from_millis(self.tick_interval_ms))
            .with_min_region_size(RegionSize::new(width, height))
    }
}

impl Default for SessionYamlConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            deadline_seconds: default_deadline_seconds(),
            call_timeout_ms: default_call_timeout_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            min_region_size: default_min_region_size(),
        }
    }
}

/// Enrollment store YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentYamlConfig {
    #[serde(default = "default_enrollment_path")]
    pub path: PathBuf,

    #[serde(default)]
    pub label: Option<String>,
}

impl Default for EnrollmentYamlConfig {
    fn default() -> Self {
        Self {
            path: default_enrollment_path(),
            label: None,
        }
    }
}

/// Actuator link YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActuatorYamlConfig {
    /// Character device or file the command line is written to. The serial
    /// line speed is configured on the device, not here.
    #[serde(default)]
    pub device: Option<PathBuf>,

    /// Pause after opening the device, for boards that reset on connect.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl ActuatorYamlConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for ActuatorYamlConfig {
    fn default() -> Self {
        Self {
            device: None,
            settle_ms: default_settle_ms(),
        }
    }
}

/// Logging YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingYamlConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl LoggingYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.level.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LoggingYamlConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}
fn default_deadline_seconds() -> f64 {
    30.0
}
fn default_call_timeout_ms() -> u64 {
    3_000
}
fn default_tick_interval_ms() -> u64 {
    1
}
fn default_min_region_size() -> (u32, u32) {
    (80, 80)
}
fn default_enrollment_path() -> PathBuf {
    PathBuf::from("enroll/face_db.json")
}
fn default_settle_ms() -> u64 {
    2_000
}
fn default_log_level() -> String {
    "info".to_string()
}
