use crate::auth::{CredentialVerifier, SessionStore};
use crate::config::AppConfig;
use crate::drive::{ListingMode, ObjectStore};
use crate::faces::FaceComparator;
use crate::matcher::{SimilarityMatcher, SimilarityThreshold};
use std::sync::Arc;

pub struct AppState {
    pub drive: Arc<dyn ObjectStore>,
    pub matcher: SimilarityMatcher,
    pub sessions: SessionStore,
    pub bucket_name: String,
    pub listing: ListingMode,
    pub threshold: SimilarityThreshold,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        drive: Arc<dyn ObjectStore>,
        comparator: Arc<dyn FaceComparator>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        Self {
            drive,
            matcher: SimilarityMatcher::new(comparator)
                .with_concurrency(config.matching.concurrency),
            sessions: SessionStore::new(verifier).with_ttl(config.auth.session_ttl),
            bucket_name: config.drive.bucket.clone(),
            listing: config.drive.listing,
            threshold: config.matching.threshold,
        }
    }
}
