//! Cosine similarity over face embeddings.
//!
//! Sums are accumulated in `f64`: ArcFace-style outputs can carry components
//! small enough that squaring them in `f32` loses the direction entirely.

use crate::error::MatchError;
use crate::types::{Embedding, SimilarityScore};

/// Score a live embedding against a reference.
///
/// Fails with [`MatchError::DimensionMismatch`] when the lengths differ and
/// with [`MatchError::DegenerateVector`] when either side has no direction.
pub fn score(a: &Embedding, b: &Embedding) -> Result<SimilarityScore, MatchError> {
    cosine_similarity(a.as_slice(), b.as_slice()).map(SimilarityScore::new)
}

/// Dot product of the L2-normalized inputs, clamped to `[-1.0, 1.0]`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, MatchError> {
    if a.len() != b.len() {
        return Err(MatchError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let norm_a = checked_norm(a)?;
    let norm_b = checked_norm(b)?;

    // Normalize each term before multiplying so the sum stays symmetric in (a, b).
    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| (f64::from(x) / norm_a) * (f64::from(y) / norm_b))
        .sum();

    Ok(dot.clamp(-1.0, 1.0) as f32)
}

/// In-place L2 normalization. Returns `false` (leaving `v` untouched) when the
/// vector has no direction.
pub fn l2_normalize_in_place(v: &mut [f32]) -> bool {
    let Ok(norm) = checked_norm(v) else {
        return false;
    };
    for x in v.iter_mut() {
        *x = (f64::from(*x) / norm) as f32;
    }
    true
}

pub(crate) fn l2_norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|&x| {
            let x = f64::from(x);
            x * x
        })
        .sum::<f64>()
        .sqrt()
}

fn checked_norm(v: &[f32]) -> Result<f64, MatchError> {
    let norm = l2_norm(v);
    if norm.is_finite() && norm > 0.0 {
        Ok(norm)
    } else {
        Err(MatchError::DegenerateVector)
    }
}
