//! # Facegate Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` holds the two leaf components of the access decision: the
//! similarity function that compares a live face embedding against the
//! enrolled reference, and the policy that turns detector output and scores
//! into a per-tick verdict. Nothing in here performs I/O or keeps state; the
//! session controller (`session` crate) drives both once per tick.
//!
//! ## Core Types
//!
//! - [`Embedding`]: fixed-length `f32` feature vector produced by the model.
//! - [`Region`]: detector bounding box with non-zero width and height.
//! - [`SimilarityScore`]: cosine similarity clamped to `[-1.0, 1.0]`.
//! - [`Decision`]: `Approved` or `Denied(reason)`.
//! - [`MatchPolicy`]: region selection plus the inclusive accept threshold.
//!
//! ## Example Usage
//!
//! ```
//! use matcher::{score, Decision, DenyReason, Embedding, MatchPolicy, Region, Selection};
//!
//! let policy = MatchPolicy::new(0.60).expect("threshold in range");
//!
//! let candidates = [
//!     Region::new(0, 0, 10, 10).unwrap(),
//!     Region::new(40, 20, 20, 20).unwrap(),
//! ];
//! let Selection::Selected { region, .. } = policy.select_region(&candidates) else {
//!     panic!("two candidates were supplied");
//! };
//! assert_eq!(region.area(), 400);
//!
//! let reference = Embedding::from(vec![0.2, 0.9, 0.1]);
//! let live = Embedding::from(vec![0.25, 0.85, 0.05]);
//! let similarity = score(&live, &reference).expect("same dimension");
//! assert_eq!(policy.evaluate(similarity), Decision::Approved);
//!
//! let stranger = Embedding::from(vec![0.9, -0.2, 0.3]);
//! let similarity = score(&stranger, &reference).expect("same dimension");
//! assert_eq!(
//!     policy.evaluate(similarity),
//!     Decision::Denied(DenyReason::LowSimilarity)
//! );
//! ```

pub mod error;
pub mod policy;
pub mod similarity;
pub mod types;

pub use crate::error::MatchError;
pub use crate::policy::{MatchPolicy, Selection, DEFAULT_THRESHOLD};
pub use crate::similarity::{cosine_similarity, l2_normalize_in_place, score};
pub use crate::types::{Decision, DenyReason, Embedding, Region, RegionSize, SimilarityScore};
