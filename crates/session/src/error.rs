use matcher::MatchError;
use thiserror::Error;

/// Errors raised while assembling a session. Once a session runs, every
/// outcome is expressed as a [`matcher::Decision`] instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("invalid session config: {0}")]
    InvalidConfig(String),
    #[error("invalid enrollment: {0}")]
    InvalidEnrollment(String),
    #[error("match policy error: {0}")]
    Match(#[from] MatchError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_errors_convert() {
        let err: SessionError = MatchError::InvalidThreshold(3.0).into();
        assert!(matches!(err, SessionError::Match(_)));
        assert!(err.to_string().contains("threshold"));
    }

    #[test]
    fn invalid_config_message() {
        let err = SessionError::InvalidConfig("deadline must be positive".into());
        assert_eq!(
            err.to_string(),
            "invalid session config: deadline must be positive"
        );
    }
}
