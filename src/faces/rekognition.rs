use super::{FaceComparator, FaceMatch, ObjectRef};
use crate::error::CompareError;
use crate::matcher::SimilarityThreshold;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_rekognition::error::{DisplayErrorContext, SdkError};
use aws_sdk_rekognition::operation::compare_faces::CompareFacesError;
use aws_sdk_rekognition::primitives::Blob;
use aws_sdk_rekognition::types::{Image, S3Object};
use aws_sdk_rekognition::Client;
use bytes::Bytes;
use log::trace;

#[derive(Debug, Clone)]
pub struct RekognitionComparator {
    client: Client,
}

impl RekognitionComparator {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self::with_client(Client::new(sdk_config))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FaceComparator for RekognitionComparator {
    async fn compare(
        &self,
        source: Bytes,
        target: &ObjectRef,
        threshold: SimilarityThreshold,
    ) -> Result<Vec<FaceMatch>, CompareError> {
        let source_image = Image::builder()
            .bytes(Blob::new(source.to_vec()))
            .build();
        let target_image = Image::builder()
            .s3_object(
                S3Object::builder()
                    .bucket(&target.bucket)
                    .name(&target.key)
                    .build(),
            )
            .build();

        let resp = self
            .client
            .compare_faces()
            .source_image(source_image)
            .target_image(target_image)
            .similarity_threshold(threshold.value())
            .send()
            .await
            .map_err(classify)?;

        trace!(
            "{}: {} face matches, {} unmatched faces",
            target.key,
            resp.face_matches().len(),
            resp.unmatched_faces().len()
        );

        Ok(resp
            .face_matches()
            .iter()
            .filter_map(|m| m.similarity())
            .map(|similarity| FaceMatch { similarity })
            .collect())
    }
}

fn classify(err: SdkError<CompareFacesError>) -> CompareError {
    let message = DisplayErrorContext(&err).to_string();
    match err.as_service_error() {
        // Rekognition reports "no face in source/target image" as an invalid parameter.
        Some(CompareFacesError::InvalidParameterException(_)) => CompareError::NoFace(message),
        Some(CompareFacesError::InvalidImageFormatException(_))
        | Some(CompareFacesError::ImageTooLargeException(_))
        | Some(CompareFacesError::InvalidS3ObjectException(_)) => {
            CompareError::InvalidImage(message)
        }
        Some(CompareFacesError::ThrottlingException(_))
        | Some(CompareFacesError::ProvisionedThroughputExceededException(_)) => {
            CompareError::Throttled(message)
        }
        Some(CompareFacesError::AccessDeniedException(_)) => CompareError::Denied(message),
        _ => CompareError::Service(message),
    }
}
