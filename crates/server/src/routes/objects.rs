//! Signed object downloads.

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::extract::{Path, Query};
use crate::services::storage::content_type_for;
use crate::state::AppState;

/// Build the objects router.
pub fn router() -> Router<AppState> {
    Router::new().route("/objects/{*key}", get(download))
}

#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub signature: String,
}

/// Serve an object if the URL's signature and expiry check out.
#[instrument(skip_all, fields(key = %key))]
async fn download(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<SignedQuery>,
) -> Result<Response> {
    state
        .objects()
        .verify_url(&key, query.expires, &query.signature, Utc::now().timestamp())?;
    let bytes = state.objects().get(&key).await?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(content_type_for(&key)),
            ),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("private, max-age=86400"),
            ),
        ],
        bytes,
    )
        .into_response())
}
