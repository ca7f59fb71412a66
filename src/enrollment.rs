//! Enrollment store backed by a JSON face database.
//!
//! The database is a JSON object keyed by subject label. Each entry carries an
//! `embedding`, either as base64 of packed little-endian `f32` values (what the
//! enrollment tool writes) or as a plain array of numbers:
//!
//! ```json
//! {
//!   "alice": { "embedding": "AACAPwAAAAA=" },
//!   "bob":   { "embedding": [0.12, -0.4, 0.9] }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use matcher::Embedding;
use serde::Deserialize;
use session::{Enrollment, SessionError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("failed to read enrollment store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse enrollment store: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("label '{0}' is not enrolled")]
    UnknownLabel(String),

    #[error("embedding for '{label}' is not valid base64: {source}")]
    Base64 {
        label: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("embedding for '{label}' is {len} bytes, not a whole number of f32 values")]
    Misaligned { label: String, len: usize },

    #[error(transparent)]
    Invalid(#[from] SessionError),
}

/// Anything that can produce the reference for a label at startup.
pub trait EnrollmentSource {
    fn enrollment(&self, label: &str) -> Result<Enrollment, EnrollmentError>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StoredEmbedding {
    Encoded(String),
    Values(Vec<f32>),
}

#[derive(Debug, Clone, Deserialize)]
struct StoredSubject {
    embedding: StoredEmbedding,
}

#[derive(Debug, Clone)]
pub struct JsonEnrollmentSource {
    subjects: BTreeMap<String, StoredSubject>,
}

impl JsonEnrollmentSource {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, EnrollmentError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| EnrollmentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let source = Self::from_json(&content)?;
        info!(
            path = %path.display(),
            subjects = source.subjects.len(),
            "enrollment store loaded"
        );
        Ok(source)
    }

    pub fn from_json(json: &str) -> Result<Self, EnrollmentError> {
        let subjects = serde_json::from_str(json)?;
        Ok(Self { subjects })
    }

    /// Enrolled labels in sorted order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.subjects.keys().map(String::as_str)
    }
}

impl EnrollmentSource for JsonEnrollmentSource {
    fn enrollment(&self, label: &str) -> Result<Enrollment, EnrollmentError> {
        let subject = self
            .subjects
            .get(label)
            .ok_or_else(|| EnrollmentError::UnknownLabel(label.to_string()))?;

        let values = match &subject.embedding {
            StoredEmbedding::Encoded(encoded) => decode_embedding(label, encoded)?,
            StoredEmbedding::Values(values) => values.clone(),
        };
        debug!(label, dim = values.len(), "enrollment embedding decoded");

        Ok(Enrollment::new(label, Embedding::from(values))?)
    }
}

/// Decode base64 of packed little-endian `f32` values.
pub fn decode_embedding(label: &str, encoded: &str) -> Result<Vec<f32>, EnrollmentError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|source| EnrollmentError::Base64 {
            label: label.to_string(),
            source,
        })?;

    let chunks = bytes.chunks_exact(4);
    if !chunks.remainder().is_empty() {
        return Err(EnrollmentError::Misaligned {
            label: label.to_string(),
            len: bytes.len(),
        });
    }
    Ok(chunks
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
