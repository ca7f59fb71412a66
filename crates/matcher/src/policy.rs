use serde::{Deserialize, Serialize};

use crate::error::MatchError;
use crate::types::{Decision, DenyReason, Region, SimilarityScore};


/// Accept threshold used when none is configured.
pub const DEFAULT_THRESHOLD: f32 = 0.60;

/// Outcome of region selection for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The chosen region and its position in the detector output.
    Selected { index: usize, region: Region },
    /// The detector found nothing this frame. Not an error.
    NoCandidate,
}

/// Region selection and accept/deny rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPolicy")]
pub struct MatchPolicy {
    threshold: f32,
}

#[derive(Deserialize)]
struct RawPolicy {
    threshold: f32,
}

impl TryFrom<RawPolicy> for MatchPolicy {
    type Error = MatchError;

    fn try_from(raw: RawPolicy) -> Result<Self, Self::Error> {
        MatchPolicy::new(raw.threshold)
    }
}

impl MatchPolicy {
    /// Build a policy; the threshold must be finite and inside the cosine range.
    pub fn new(threshold: f32) -> Result<Self, MatchError> {
        if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
            return Err(MatchError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Pick the largest region. Ties go to the earliest in `candidates`, so the
    /// choice is reproducible for identical detector output.
    pub fn select_region(&self, candidates: &[Region]) -> Selection {
        let mut best: Option<(usize, Region)> = None;
        for (index, region) in candidates.iter().enumerate() {
            match best {
                Some((_, current)) if region.area() <= current.area() => {}
                _ => best = Some((index, *region)),
            }
        }

        match best {
            Some((index, region)) => Selection::Selected { index, region },
            None => Selection::NoCandidate,
        }
    }

    /// `score >= threshold` approves; anything below is a low-similarity denial.
    pub fn evaluate(&self, score: SimilarityScore) -> Decision {
        if score.value() >= self.threshold {
            Decision::Approved
        } else {
            Decision::Denied(DenyReason::LowSimilarity)
        }
    }
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}
