#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use photomatch::drive::{ListingMode, ObjectStore, StoredObject};
use photomatch::error::{CompareError, DriveError};
use photomatch::faces::{FaceComparator, FaceMatch, ObjectRef};
use photomatch::matcher::ReferenceSource;
use photomatch::SimilarityThreshold;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory bucket; keys are listed in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    objects: Vec<(String, Bytes)>,
    fail_listing: bool,
    pub list_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn with_keys(keys: &[&str]) -> Self {
        Self {
            objects: keys
                .iter()
                .map(|k| (k.to_string(), Bytes::from(format!("bytes of {}", k))))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_listing: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_keys(&self, bucket: &str, _mode: ListingMode) -> Result<Vec<String>, DriveError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(DriveError::Listing {
                bucket: bucket.to_string(),
                message: "NoSuchBucket".to_string(),
            });
        }
        Ok(self.objects.iter().map(|(k, _)| k.clone()).collect())
    }

    async fn get_object(&self, _bucket: &str, key: &str) -> Result<StoredObject, DriveError> {
        self.objects
            .iter()
            .find(|(k, _)| k == key)
            .map(|(k, bytes)| StoredObject {
                key: k.clone(),
                bytes: bytes.clone(),
                content_type: mime_guess::from_path(k).first_or_octet_stream().to_string(),
            })
            .ok_or_else(|| DriveError::NotFound {
                key: key.to_string(),
            })
    }
}

/// Face service double: per-key similarity lists or failures, recording every call.
#[derive(Default)]
pub struct ScriptedComparator {
    scores: HashMap<String, Vec<f32>>,
    failing: Vec<String>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedComparator {
    pub fn with(mut self, key: &str, scores: &[f32]) -> Self {
        self.scores.insert(key.to_string(), scores.to_vec());
        self
    }

    pub fn failing(mut self, key: &str) -> Self {
        self.failing.push(key.to_string());
        self
    }

    pub fn called_keys(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FaceComparator for ScriptedComparator {
    async fn compare(
        &self,
        _source: Bytes,
        target: &ObjectRef,
        _threshold: SimilarityThreshold,
    ) -> Result<Vec<FaceMatch>, CompareError> {
        self.calls.lock().unwrap().push(target.key.clone());
        if self.failing.contains(&target.key) {
            return Err(CompareError::Service(format!(
                "simulated failure for {}",
                target.key
            )));
        }
        Ok(self
            .scores
            .get(&target.key)
            .map(|s| s.iter().map(|&similarity| FaceMatch { similarity }).collect())
            .unwrap_or_default())
    }
}

pub struct CountingReference {
    pub encodes: AtomicUsize,
}

impl CountingReference {
    pub fn new() -> Self {
        Self {
            encodes: AtomicUsize::new(0),
        }
    }
}

impl ReferenceSource for CountingReference {
    fn name(&self) -> &str {
        "reference.jpg"
    }

    fn encode(&self) -> image::ImageResult<Bytes> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::from_static(b"encoded-reference"))
    }
}

pub fn sample_png() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([10, 120, 200])));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .expect("encode sample png");
    buf.into_inner()
}
