use matcher::{Embedding, MatchPolicy};

use crate::config::SessionConfig;
use crate::error::SessionError;

/// The enrolled subject a session authenticates against.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrollment {
    label: String,
    embedding: Embedding,
}

impl Enrollment {
    /// Rejects a blank label and embeddings that cannot be scored
    /// (empty, non-finite, or zero norm).
    pub fn new(label: impl Into<String>, embedding: Embedding) -> Result<Self, SessionError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(SessionError::InvalidEnrollment(
                "label must not be empty".into(),
            ));
        }
        if embedding.is_empty() {
            return Err(SessionError::InvalidEnrollment(format!(
                "embedding for '{label}' is empty"
            )));
        }
        if !embedding.is_scorable() {
            return Err(SessionError::InvalidEnrollment(format!(
                "embedding for '{label}' has no direction"
            )));
        }
        Ok(Self { label, embedding })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }
}

/// Immutable inputs for one session: who to match and how.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    enrollment: Enrollment,
    config: SessionConfig,
    policy: MatchPolicy,
}

impl SessionContext {
    pub fn new(enrollment: Enrollment, config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let policy = config.policy()?;
        Ok(Self {
            enrollment,
            config,
            policy,
        })
    }

    pub fn enrollment(&self) -> &Enrollment {
        &self.enrollment
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }
}
