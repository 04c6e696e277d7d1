//! Product image upload.
//!
//! Accepts one multipart `file` part, stores it in the object store, and
//! answers with the object key and a long-lived signed URL. Failures use
//! the same `{success, error}` envelope as success.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;
use serde::Serialize;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::instrument;

use crate::middleware::RequireAuth;
use crate::services::StorageError;
use crate::services::storage::{NEVER_EXPIRES, product_image_key};
use crate::state::AppState;

const FILE_FIELD: &str = "file";

/// Build the upload router, capping request bodies at `max_bytes`.
pub fn router(max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/api/uploads", post(upload))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_bytes))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub key: String,
    pub url: String,
}

/// Upload failure, answered as `{"success": false, "error": ...}`.
#[derive(Debug)]
pub enum UploadError {
    MissingFile,
    Multipart(MultipartError),
    Storage(StorageError),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::MissingFile => (StatusCode::BAD_REQUEST, "No file uploaded".to_string()),
            Self::Multipart(e) => (e.status(), e.body_text()),
            Self::Storage(e) => {
                let event_id = sentry::capture_error(e);
                tracing::error!(error = %e, sentry_event_id = %event_id, "Upload failed");
                (StatusCode::BAD_GATEWAY, "Upload failed".to_string())
            }
        };
        (
            status,
            Json(serde_json::json!({ "success": false, "error": message })),
        )
            .into_response()
    }
}

#[instrument(skip_all, fields(user_id = %user.id))]
async fn upload(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, UploadError> {
    while let Some(field) = multipart.next_field().await.map_err(UploadError::Multipart)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_owned();
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await.map_err(UploadError::Multipart)?;

        let key = product_image_key(
            &file_name,
            content_type.as_deref(),
            Utc::now().timestamp_millis(),
        );
        state
            .objects()
            .put(&key, &bytes)
            .await
            .map_err(UploadError::Storage)?;
        let url = state
            .objects()
            .signed_url(&key, NEVER_EXPIRES)
            .map_err(UploadError::Storage)?;

        tracing::info!(key = %key, size = bytes.len(), "Image uploaded");
        return Ok(Json(UploadResponse {
            success: true,
            key,
            url,
        }));
    }

    Err(UploadError::MissingFile)
}
