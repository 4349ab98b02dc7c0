//! HTTP surface: login, photo comparison and matched-image download.

use crate::auth::{LoginOutcome, SessionContext};
use crate::drive::is_image_key;
use crate::error::ApiError;
use crate::matcher::{compare_with_collection, MatchReport, ReferenceImage, SimilarityThreshold};
use crate::shared::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub session_token: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareStatus {
    Matched,
    NoMatches,
}

#[derive(Debug, Serialize)]
pub struct MatchItem {
    pub key: String,
    pub similarity: f32,
    pub caption: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub reference: String,
    pub status: CompareStatus,
    pub threshold: SimilarityThreshold,
    pub examined: usize,
    pub skipped: usize,
    pub matches: Vec<MatchItem>,
}

impl CompareResponse {
    fn from_report(reference: String, threshold: SimilarityThreshold, report: MatchReport) -> Self {
        let status = if report.is_empty() {
            CompareStatus::NoMatches
        } else {
            CompareStatus::Matched
        };
        Self {
            reference,
            status,
            threshold,
            examined: report.examined,
            skipped: report.skipped,
            matches: report
                .matches
                .into_iter()
                .map(|m| MatchItem {
                    caption: m.caption(),
                    url: image_url(&m.key),
                    key: m.key,
                    similarity: m.similarity,
                })
                .collect(),
        }
    }
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/compare", post(compare))
        .route("/api/images/*key", get(get_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

pub fn router(state: Arc<AppState>) -> Router {
    configure().with_state(state)
}

fn image_url(key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("/api/images/{}", encoded.join("/"))
}

fn bearer_token(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .and_then(|token| Uuid::parse_str(token.trim()).ok())
}

async fn require_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(Uuid, SessionContext), ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing session token".to_string()))?;
    match state.sessions.get(&token).await {
        Some(ctx) if ctx.authenticated => Ok((token, ctx)),
        _ => Err(ApiError::Unauthorized("Session expired or invalid".to_string())),
    }
}

async fn health() -> &'static str {
    "ok"
}

/// POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    match state.sessions.login(&req.username, &req.password).await {
        LoginOutcome::Granted { token, .. } => Ok(Json(LoginResponse {
            success: true,
            session_token: token.to_string(),
        })),
        LoginOutcome::Denied(ctx) => Err(ApiError::Unauthorized(
            ctx.last_error.unwrap_or_default(),
        )),
    }
}

/// POST /api/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, ApiError> {
    let (token, _) = require_session(&state, &headers).await?;
    let success = state.sessions.logout(&token).await;
    Ok(Json(LogoutResponse { success }))
}

/// POST /api/compare
/// Multipart form: `file` (png/jpg/jpeg, required), `threshold` (optional, 0-100)
pub async fn compare(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<CompareResponse>, ApiError> {
    let (_, session) = require_session(&state, &headers).await?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut threshold = state.threshold;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
                upload = Some((file_name, data.to_vec()));
            }
            "threshold" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read threshold: {}", e)))?;
                threshold = text
                    .trim()
                    .parse::<f32>()
                    .map_err(|e| e.to_string())
                    .and_then(SimilarityThreshold::new)
                    .map_err(ApiError::BadRequest)?;
            }
            _ => {}
        }
    }

    let (file_name, data) =
        upload.ok_or_else(|| ApiError::BadRequest("No file data provided".to_string()))?;
    if data.is_empty() {
        return Err(ApiError::BadRequest("No file data provided".to_string()));
    }
    if !is_image_key(&file_name) {
        return Err(ApiError::BadRequest(format!(
            "Unsupported file type: {}",
            file_name
        )));
    }

    let reference = ReferenceImage::decode(file_name.clone(), &data)
        .map_err(|e| ApiError::BadRequest(format!("Could not decode {}: {}", file_name, e)))?;

    let (width, height) = reference.dimensions();
    info!(
        "{} is comparing {} ({}x{}, {} bytes) against {}",
        session.username.as_deref().unwrap_or("unknown"),
        file_name,
        width,
        height,
        data.len(),
        state.bucket_name
    );

    let report = compare_with_collection(
        state.drive.as_ref(),
        &state.matcher,
        &reference,
        &state.bucket_name,
        threshold,
        state.listing,
    )
    .await?;

    Ok(Json(CompareResponse::from_report(file_name, threshold, report)))
}

/// GET /api/images/{key}
pub async fn get_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_session(&state, &headers).await?;

    // Only collection photos are served, never other bucket objects.
    if !is_image_key(&key) {
        return Err(ApiError::NotFound(key));
    }

    let object = state.drive.get_object(&state.bucket_name, &key).await?;
    Ok(([(header::CONTENT_TYPE, object.content_type)], object.bytes))
}
