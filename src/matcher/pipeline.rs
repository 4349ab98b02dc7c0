use super::{MatchReport, ReferenceSource, SimilarityMatcher, SimilarityThreshold};
use crate::drive::{list_candidates, ListingMode, ObjectStore};
use crate::error::MatchError;
use log::error;

/// Lists `bucket` and matches `reference` against every image in it.
///
/// Only a listing failure (or an unencodable reference) aborts the run;
/// individual comparison failures are logged and skipped by the matcher.
pub async fn compare_with_collection(
    store: &dyn ObjectStore,
    matcher: &SimilarityMatcher,
    reference: &dyn ReferenceSource,
    bucket: &str,
    threshold: SimilarityThreshold,
    mode: ListingMode,
) -> Result<MatchReport, MatchError> {
    let candidates = list_candidates(store, bucket, mode).await.map_err(|e| {
        error!("Aborting comparison of {}: {}", reference.name(), e);
        e
    })?;

    matcher
        .find_matches(reference, bucket, &candidates, threshold)
        .await
}
