use axum::{http::StatusCode, response::IntoResponse, Json};

#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("Failed to list bucket {bucket}: {message}")]
    Listing { bucket: String, message: String },
    #[error("Object not found: {key}")]
    NotFound { key: String },
    #[error("Failed to fetch {key}: {message}")]
    Fetch { key: String, message: String },
}

/// Failure of a single pairwise comparison. Always skippable by the matcher.
#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error("No face detected: {0}")]
    NoFace(String),
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("Throttled by face service: {0}")]
    Throttled(String),
    #[error("Access denied: {0}")]
    Denied(String),
    #[error("Face service error: {0}")]
    Service(String),
}

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error(transparent)]
    Drive(#[from] DriveError),
    #[error("Failed to encode reference image: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::Drive(e) => Self::Upstream(e.to_string()),
            MatchError::Encode(e) => Self::BadRequest(e.to_string()),
        }
    }
}

impl From<DriveError> for ApiError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::NotFound { key } => Self::NotFound(key),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
