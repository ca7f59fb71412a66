use thiserror::Error;

/// Errors produced by the similarity and policy layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    /// The two embeddings come from models with different output sizes.
    #[error("embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
    /// One of the embeddings has a zero or non-finite L2 norm, so it has no direction.
    #[error("embedding has zero or non-finite L2 norm")]
    DegenerateVector,
    /// Accept threshold outside the cosine range.
    #[error("threshold {0} must be a finite value in [-1.0, 1.0]")]
    InvalidThreshold(f32),
    /// Bounding box with no area.
    #[error("region must have non-zero size, got {width}x{height}")]
    EmptyRegion { width: u32, height: u32 },
}

impl MatchError {
    /// Enrollment/model skew that no amount of retrying will fix.
    pub fn is_configuration_fault(&self) -> bool {
        matches!(
            self,
            MatchError::DimensionMismatch { .. } | MatchError::InvalidThreshold(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mismatch_mentions_both_sizes() {
        let err = MatchError::DimensionMismatch {
            left: 512,
            right: 128,
        };
        let msg = err.to_string();
        assert!(msg.contains("512"));
        assert!(msg.contains("128"));
    }

    #[test]
    fn invalid_threshold_message() {
        let err = MatchError::InvalidThreshold(1.5);
        assert!(err.to_string().contains("1.5"));
    }

    #[test]
    fn configuration_faults_are_flagged() {
        assert!(MatchError::DimensionMismatch { left: 1, right: 2 }.is_configuration_fault());
        assert!(MatchError::InvalidThreshold(2.0).is_configuration_fault());
        assert!(!MatchError::DegenerateVector.is_configuration_fault());
        assert!(!MatchError::EmptyRegion {
            width: 0,
            height: 3
        }
        .is_configuration_fault());
    }
}
