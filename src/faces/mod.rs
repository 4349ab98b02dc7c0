//! Pairwise face comparison against objects already in the bucket.

use crate::error::CompareError;
use crate::matcher::SimilarityThreshold;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub mod rekognition;

pub use rekognition::RekognitionComparator;

/// Location of a target image in the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// One face in the target that was matched against the source face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceMatch {
    /// Percentage in [0, 100].
    pub similarity: f32,
}

#[async_trait]
pub trait FaceComparator: Send + Sync {
    /// Compares the face in `source` with every face found in `target`.
    ///
    /// The threshold is a hint; implementations may return records below it.
    async fn compare(
        &self,
        source: Bytes,
        target: &ObjectRef,
        threshold: SimilarityThreshold,
    ) -> Result<Vec<FaceMatch>, CompareError>;
}
