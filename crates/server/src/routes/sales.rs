//! Sales terminal routes.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Response,
    routing::{get, post},
};
use tracing::instrument;

use stockroom_core::{SaleId, SaleRequest};

use super::attachment;
use crate::db::SaleRepository;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::RequireAuth;
use crate::models::Sale;
use crate::services::invoice;
use crate::state::AppState;

/// Build the sales router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sales", post(commit))
        .route("/api/sales/{id}", get(show))
        .route("/api/sales/{id}/invoice", get(download_invoice))
}

async fn load(state: &AppState, id: SaleId) -> Result<Sale> {
    SaleRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("sale {id}")))
}

/// Commit a checked-out cart.
///
/// Stock is checked against the locked product rows; a shortfall or a
/// deleted product rejects the whole sale with 409.
#[instrument(skip_all, fields(user_id = %user.id, lines = request.lines().len()))]
async fn commit(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(request): Json<SaleRequest>,
) -> Result<(StatusCode, Json<Sale>)> {
    let sale = SaleRepository::new(state.pool())
        .commit(&request, user.id)
        .await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

#[instrument(skip_all, fields(sale_id = %id))]
async fn show(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<SaleId>,
) -> Result<Json<Sale>> {
    load(&state, id).await.map(Json)
}

#[instrument(skip_all, fields(sale_id = %id))]
async fn download_invoice(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<SaleId>,
) -> Result<Response> {
    let sale = load(&state, id).await?;
    let pdf = invoice::render(&sale)?;
    Ok(attachment(
        invoice::PDF_CONTENT_TYPE,
        &invoice::invoice_file_name(&sale),
        pdf,
    ))
}
