use super::{ListingMode, ObjectStore, StoredObject};
use crate::config::DriveConfig;
use crate::error::DriveError;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::{config::Builder as S3ConfigBuilder, Client as S3Client};
use log::{debug, info, warn};

/// Shared AWS configuration (region and credentials) for storage and the face service.
pub async fn load_sdk_config(config: &DriveConfig) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

    if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
        loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
            access_key.clone(),
            secret_key.clone(),
            None,
            None,
            "static",
        ));
    }

    loader.load().await
}

/// Builds the S3 client. A custom endpoint (MinIO, LocalStack) only applies to
/// storage and forces path-style addressing.
pub fn init_drive(sdk_config: &SdkConfig, config: &DriveConfig) -> S3Client {
    let mut builder = S3ConfigBuilder::from(sdk_config);
    if let Some(server) = &config.server {
        let endpoint = if !server.ends_with('/') {
            format!("{}/", server)
        } else {
            server.clone()
        };
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }
    S3Client::from_conf(builder.build())
}

#[derive(Debug, Clone)]
pub struct S3Drive {
    client: S3Client,
}

impl S3Drive {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Drive {
    async fn list_keys(&self, bucket: &str, mode: ListingMode) -> Result<Vec<String>, DriveError> {
        info!("Listing s3://{} ({:?})", bucket, mode);

        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(bucket);
            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let result = request.send().await.map_err(|e| DriveError::Listing {
                bucket: bucket.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

            keys.extend(
                result
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(str::to_string)),
            );

            let truncated = result.is_truncated().unwrap_or(false);
            match mode {
                ListingMode::SinglePage => {
                    if truncated {
                        warn!(
                            "Listing of {} is truncated at {} keys; set DRIVE_LISTING=exhaustive to read all pages",
                            bucket,
                            keys.len()
                        );
                    }
                    break;
                }
                ListingMode::Exhaustive => {
                    match result.next_continuation_token() {
                        Some(token) if truncated => continuation_token = Some(token.to_string()),
                        _ => break,
                    }
                }
            }
        }

        debug!("Found {} keys in {}", keys.len(), bucket);
        Ok(keys)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject, DriveError> {
        debug!("Fetching s3://{}/{}", bucket, key);

        let result = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|se| se.is_no_such_key()).unwrap_or(false) {
                    DriveError::NotFound {
                        key: key.to_string(),
                    }
                } else {
                    DriveError::Fetch {
                        key: key.to_string(),
                        message: DisplayErrorContext(&e).to_string(),
                    }
                }
            })?;

        let content_type = result
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(key)
                    .first_or_octet_stream()
                    .to_string()
            });

        let data = result.body.collect().await.map_err(|e| DriveError::Fetch {
            key: key.to_string(),
            message: format!("Failed to read object body: {}", e),
        })?;

        Ok(StoredObject {
            key: key.to_string(),
            bytes: data.into_bytes(),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::retry::RetryConfig;
    use aws_sdk_s3::config::Credentials;
    use aws_smithy_http_client::test_util::{ReplayEvent, StaticReplayClient};
    use aws_smithy_types::body::SdkBody;

    fn list_page(keys: &[&str], next_token: Option<&str>) -> String {
        let contents: String = keys
            .iter()
            .map(|key| format!("<Contents><Key>{}</Key><Size>1024</Size></Contents>", key))
            .collect();
        let continuation = next_token
            .map(|token| format!("<NextContinuationToken>{}</NextContinuationToken>", token))
            .unwrap_or_default();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>fotos-museu</Name><Prefix></Prefix><KeyCount>{}</KeyCount><MaxKeys>1000</MaxKeys><IsTruncated>{}</IsTruncated>{}{}</ListBucketResult>"#,
            keys.len(),
            next_token.is_some(),
            continuation,
            contents
        )
    }

    fn event(status: u16, body: String) -> ReplayEvent {
        ReplayEvent::new(
            http::Request::builder()
                .uri("https://fotos-museu.s3.us-east-1.amazonaws.com/")
                .body(SdkBody::empty())
                .unwrap(),
            http::Response::builder()
                .status(status)
                .header("content-type", "application/xml")
                .body(SdkBody::from(body))
                .unwrap(),
        )
    }

    fn drive_with(replay: &StaticReplayClient) -> S3Drive {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("AKID", "SECRET", None, None, "test"))
            .retry_config(RetryConfig::disabled())
            .http_client(replay.clone())
            .build();
        S3Drive::new(S3Client::from_conf(config))
    }

    fn two_pages() -> StaticReplayClient {
        StaticReplayClient::new(vec![
            event(200, list_page(&["a.jpg", "b.png"], Some("page-2"))),
            event(200, list_page(&["c.jpg"], None)),
        ])
    }

    #[tokio::test]
    async fn test_single_page_ignores_continuation() {
        let replay = two_pages();
        let drive = drive_with(&replay);

        let keys = drive
            .list_keys("fotos-museu", ListingMode::SinglePage)
            .await
            .unwrap();

        assert_eq!(keys, vec!["a.jpg", "b.png"]);
        assert_eq!(replay.actual_requests().count(), 1);
    }

    #[tokio::test]
    async fn test_exhaustive_follows_continuation_token() {
        let replay = two_pages();
        let drive = drive_with(&replay);

        let keys = drive
            .list_keys("fotos-museu", ListingMode::Exhaustive)
            .await
            .unwrap();

        assert_eq!(keys, vec!["a.jpg", "b.png", "c.jpg"]);
        let uris: Vec<String> = replay
            .actual_requests()
            .map(|req| req.uri().to_string())
            .collect();
        assert_eq!(uris.len(), 2);
        assert!(!uris[0].contains("continuation-token"));
        assert!(uris[1].contains("continuation-token=page-2"));
    }

    #[tokio::test]
    async fn test_listing_without_contents_is_empty() {
        let replay = StaticReplayClient::new(vec![event(200, list_page(&[], None))]);
        let drive = drive_with(&replay);

        let keys = drive
            .list_keys("fotos-museu", ListingMode::SinglePage)
            .await
            .unwrap();

        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn test_listing_error_names_bucket() {
        let replay = StaticReplayClient::new(vec![event(
            404,
            r#"<?xml version="1.0" encoding="UTF-8"?><Error><Code>NoSuchBucket</Code><Message>The specified bucket does not exist</Message><BucketName>fotos-museu</BucketName></Error>"#.to_string(),
        )]);
        let drive = drive_with(&replay);

        let err = drive
            .list_keys("fotos-museu", ListingMode::SinglePage)
            .await
            .unwrap_err();

        match err {
            DriveError::Listing { bucket, message } => {
                assert_eq!(bucket, "fotos-museu");
                assert!(message.contains("NoSuchBucket"), "{}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let replay = StaticReplayClient::new(vec![event(
            404,
            r#"<?xml version="1.0" encoding="UTF-8"?><Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message><Key>gone.jpg</Key></Error>"#.to_string(),
        )]);
        let drive = drive_with(&replay);

        let err = drive.get_object("fotos-museu", "gone.jpg").await.unwrap_err();
        assert!(matches!(err, DriveError::NotFound { key } if key == "gone.jpg"));
    }

    #[tokio::test]
    async fn test_get_object_guesses_missing_content_type() {
        let replay = StaticReplayClient::new(vec![ReplayEvent::new(
            http::Request::builder()
                .uri("https://fotos-museu.s3.us-east-1.amazonaws.com/retrato.png")
                .body(SdkBody::empty())
                .unwrap(),
            http::Response::builder()
                .status(200)
                .body(SdkBody::from("png bytes"))
                .unwrap(),
        )]);
        let drive = drive_with(&replay);

        let object = drive.get_object("fotos-museu", "retrato.png").await.unwrap();
        assert_eq!(object.content_type, "image/png");
        assert_eq!(&object.bytes[..], b"png bytes");
    }
}
