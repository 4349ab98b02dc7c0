//! Bulk face matching of one reference photo against a bucket.
//!
//! [`compare_with_collection`] is the entry point: it lists image candidates and
//! hands them to [`SimilarityMatcher`], which calls the face service once per
//! candidate and keeps every face record at or above the threshold. Results
//! follow listing order; a candidate appears once per qualifying face.

use crate::drive::CandidateEntry;
use crate::error::MatchError;
use crate::faces::{FaceComparator, ObjectRef};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub mod pipeline;
pub mod reference;

pub use pipeline::compare_with_collection;
pub use reference::{ReferenceImage, ReferenceSource};

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 70.0;

/// Minimum similarity percentage, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct SimilarityThreshold(f32);

impl SimilarityThreshold {
    pub fn new(value: f32) -> Result<Self, String> {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(format!("similarity threshold must be within 0..=100, got {}", value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f32 {
        self.0
    }

    pub fn accepts(&self, similarity: f32) -> bool {
        similarity >= self.0
    }
}

impl Default for SimilarityThreshold {
    fn default() -> Self {
        Self(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl TryFrom<f32> for SimilarityThreshold {
    type Error = String;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SimilarityThreshold> for f32 {
    fn from(threshold: SimilarityThreshold) -> Self {
        threshold.0
    }
}

impl fmt::Display for SimilarityThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub key: String,
    pub similarity: f32,
}

impl MatchResult {
    pub fn caption(&self) -> String {
        format!("{} (similarity: {:.2}%)", self.key, self.similarity)
    }
}

/// Outcome of one run. `skipped` counts candidates whose comparison failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub matches: Vec<MatchResult>,
    pub examined: usize,
    pub skipped: usize,
}

impl MatchReport {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

pub struct SimilarityMatcher {
    comparator: Arc<dyn FaceComparator>,
    concurrency: usize,
}

impl SimilarityMatcher {
    pub fn new(comparator: Arc<dyn FaceComparator>) -> Self {
        Self {
            comparator,
            concurrency: 1,
        }
    }

    /// Number of comparisons kept in flight. Output order is unaffected.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn find_matches(
        &self,
        reference: &dyn ReferenceSource,
        bucket: &str,
        candidates: &[CandidateEntry],
        threshold: SimilarityThreshold,
    ) -> Result<MatchReport, MatchError> {
        if candidates.is_empty() {
            info!("No image candidates in {}; nothing to compare", bucket);
            return Ok(MatchReport::default());
        }

        let source = reference.encode()?;

        info!(
            "Comparing {} against {} candidates in {} (threshold {})",
            reference.name(),
            candidates.len(),
            bucket,
            threshold
        );

        // Owned, boxed futures keep the whole run `Send` for the HTTP handlers.
        let comparisons: Vec<_> = candidates
            .iter()
            .map(|candidate| {
                let comparator = Arc::clone(&self.comparator);
                let source = source.clone();
                let target = ObjectRef::new(bucket, candidate.key.as_str());
                async move { comparator.compare(source, &target, threshold).await }.boxed()
            })
            .collect();

        let outcomes: Vec<_> = stream::iter(comparisons)
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut report = MatchReport {
            examined: candidates.len(),
            ..MatchReport::default()
        };

        for (candidate, outcome) in candidates.iter().zip(outcomes) {
            match outcome {
                Ok(faces) => {
                    let before = report.matches.len();
                    report.matches.extend(
                        faces
                            .iter()
                            .filter(|face| threshold.accepts(face.similarity))
                            .map(|face| MatchResult {
                                key: candidate.key.clone(),
                                similarity: face.similarity,
                            }),
                    );
                    debug!(
                        "{}: {} face records, {} accepted",
                        candidate.key,
                        faces.len(),
                        report.matches.len() - before
                    );
                }
                Err(e) => {
                    warn!("Failed to compare with {}: {}", candidate.key, e);
                    report.skipped += 1;
                }
            }
        }

        info!(
            "Matching finished: {} matches, {} examined, {} skipped",
            report.matches.len(),
            report.examined,
            report.skipped
        );
        Ok(report)
    }
}
