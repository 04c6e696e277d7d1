//! Face enrollment for the signed-in account.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::put,
};
use serde::Deserialize;
use tracing::instrument;

use stockroom_core::FaceDescriptor;

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::extract::Json;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Build the profile router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/profile/face", put(enroll_face).delete(remove_face))
}

#[derive(Debug, Deserialize)]
pub struct EnrollFaceRequest {
    pub descriptor: FaceDescriptor,
}

/// Store (or replace) the caller's face descriptor.
#[instrument(skip_all, fields(user_id = %user.id))]
async fn enroll_face(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<EnrollFaceRequest>,
) -> Result<StatusCode> {
    UserRepository::new(state.pool())
        .set_face_descriptor(user.id, &body.descriptor)
        .await?;
    tracing::info!("Face enrolled");
    Ok(StatusCode::NO_CONTENT)
}

/// Remove the caller's face descriptor.
#[instrument(skip_all, fields(user_id = %user.id))]
async fn remove_face(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<StatusCode> {
    let removed = UserRepository::new(state.pool())
        .delete_face_descriptor(user.id)
        .await?;
    if !removed {
        return Err(AppError::NotFound("no face enrolled".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
