use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MatchError;

/// Face embedding as emitted by the extraction model.
///
/// The dimension is fixed per model; the matcher refuses to compare vectors of
/// different lengths rather than truncating either side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// Number of components.
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// L2 norm accumulated in `f64`.
    pub fn l2_norm(&self) -> f64 {
        crate::similarity::l2_norm(&self.0)
    }

    /// True when the vector has a usable direction (finite, non-zero norm).
    pub fn is_scorable(&self) -> bool {
        let norm = self.l2_norm();
        norm.is_finite() && norm > 0.0
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Minimum bounding-box size handed to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionSize {
    pub width: u32,
    pub height: u32,
}

impl RegionSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for RegionSize {
    fn default() -> Self {
        Self::new(80, 80)
    }
}

#[derive(Deserialize)]
struct RawRegion {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

impl TryFrom<RawRegion> for Region {
    type Error = MatchError;

    fn try_from(raw: RawRegion) -> Result<Self, Self::Error> {
        Region::new(raw.x, raw.y, raw.width, raw.height)
    }
}

/// Candidate face bounding box in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRegion")]
pub struct Region {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

impl Region {
    /// Build a region, rejecting boxes with zero width or height.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Result<Self, MatchError> {
        if width == 0 || height == 0 {
            return Err(MatchError::EmptyRegion { width, height });
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `width * height`, widened so large frames cannot overflow.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Whether the box is at least `min` in both dimensions.
    pub fn fits(&self, min: RegionSize) -> bool {
        self.width >= min.width && self.height >= min.height
    }
}

/// Cosine similarity between two embeddings, always within `[-1.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimilarityScore(f32);

impl SimilarityScore {
    /// Wrap a raw cosine value; out-of-range or NaN input is clamped into range.
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self(-1.0);
        }
        Self(value.clamp(-1.0, 1.0))
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

impl fmt::Display for SimilarityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Why a session (or a single evaluation) was denied.
///
/// The actuator never sees this; it only receives approve or deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    LowSimilarity,
    Timeout,
    ManualCancel,
    ExtractionExhausted,
    ConfigurationError,
    UpstreamFailure,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::LowSimilarity => "low_similarity",
            DenyReason::Timeout => "timeout",
            DenyReason::ManualCancel => "manual_cancel",
            DenyReason::ExtractionExhausted => "extraction_exhausted",
            DenyReason::ConfigurationError => "configuration_error",
            DenyReason::UpstreamFailure => "upstream_failure",
        }
    }

    /// Faults that indicate a broken deployment rather than a normal denial.
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            DenyReason::ConfigurationError | DenyReason::UpstreamFailure
        )
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Denied(DenyReason),
}

impl Decision {
    pub fn is_approved(&self) -> bool {
        matches!(self, Decision::Approved)
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Decision::Approved => None,
            Decision::Denied(reason) => Some(*reason),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Approved => f.write_str("approved"),
            Decision::Denied(reason) => write!(f, "denied ({reason})"),
        }
    }
}
