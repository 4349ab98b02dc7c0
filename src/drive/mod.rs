//! Read-only access to the bucket holding the photo collection.
//!
//! The [`ObjectStore`] trait is the seam between the matching pipeline and the
//! storage backend; [`S3Drive`] is the production implementation. The
//! collection lister on top of it narrows a bucket listing down to image keys.

use crate::error::DriveError;
use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod s3;

pub use s3::{init_drive, load_sdk_config, S3Drive};

/// How much of a bucket listing to read.
///
/// `SinglePage` issues one listing request and ignores continuation tokens, so
/// buckets larger than one page are silently truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListingMode {
    #[default]
    SinglePage,
    Exhaustive,
}

impl FromStr for ListingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single-page" | "single" => Ok(Self::SinglePage),
            "exhaustive" | "all" => Ok(Self::Exhaustive),
            other => Err(format!(
                "unknown listing mode '{}', expected 'single-page' or 'exhaustive'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Bytes,
    pub content_type: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Keys in the bucket, in the order the store returns them.
    async fn list_keys(&self, bucket: &str, mode: ListingMode) -> Result<Vec<String>, DriveError>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject, DriveError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    pub fn from_key(key: &str) -> Option<Self> {
        let lower = key.to_lowercase();
        if lower.ends_with(".png") {
            Some(Self::Png)
        } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
            Some(Self::Jpeg)
        } else {
            None
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Image-suffix rule shared by listing, uploads and downloads.
pub fn is_image_key(key: &str) -> bool {
    ImageKind::from_key(key).is_some()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEntry {
    pub key: String,
    pub kind: ImageKind,
}

/// Lists `bucket` and keeps only image keys, preserving listing order.
///
/// A listing failure is fatal for the caller's run; an empty bucket is not.
pub async fn list_candidates(
    store: &dyn ObjectStore,
    bucket: &str,
    mode: ListingMode,
) -> Result<Vec<CandidateEntry>, DriveError> {
    let keys = store.list_keys(bucket, mode).await?;
    let listed = keys.len();

    let candidates: Vec<CandidateEntry> = keys
        .into_iter()
        .filter_map(|key| match ImageKind::from_key(&key) {
            Some(kind) => Some(CandidateEntry { key, kind }),
            None => {
                debug!("Skipping non-image key {}", key);
                None
            }
        })
        .collect();

    info!(
        "Bucket {} listed {} objects, {} image candidates",
        bucket,
        listed,
        candidates.len()
    );
    Ok(candidates)
}
