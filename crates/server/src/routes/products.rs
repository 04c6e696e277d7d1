//! Product catalogue routes.

use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;
use tracing::instrument;

use stockroom_core::{Money, ProductId};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAuth;
use crate::models::{NewProduct, Product, ProductOrder, ProductPatch};
use crate::services::storage::NEVER_EXPIRES;
use crate::state::AppState;

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list).post(create))
        .route("/api/products/{id}", get(show).patch(update).delete(remove))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub order: ProductOrder,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: Money,
    pub stock: u32,
    /// Key returned by `POST /api/uploads`.
    pub image_key: Option<String>,
}

fn required_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("product name is required".to_string()));
    }
    Ok(name.to_string())
}

#[instrument(skip_all, fields(order = ?params.order))]
async fn list(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool())
        .list(params.order)
        .await?;
    Ok(Json(products))
}

#[instrument(skip_all, fields(product_id = %id))]
async fn show(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

#[instrument(skip_all, fields(user_id = %user.id))]
async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    let name = required_name(&body.name)?;

    let image_key = body
        .image_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty());
    let image_url = image_key
        .as_deref()
        .map(|key| state.objects().signed_url(key, NEVER_EXPIRES))
        .transpose()?;

    let product = ProductRepository::new(state.pool())
        .create(
            &NewProduct {
                name,
                price: body.price,
                stock: body.stock,
                image_key,
                image_url,
            },
            user.id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip_all, fields(product_id = %id))]
async fn update(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(mut patch): Json<ProductPatch>,
) -> Result<Json<Product>> {
    if patch.is_empty() {
        return Err(AppError::BadRequest("nothing to update".to_string()));
    }
    if let Some(name) = &patch.name {
        patch.name = Some(required_name(name)?);
    }

    let product = ProductRepository::new(state.pool())
        .update(id, &patch)
        .await?;
    Ok(Json(product))
}

/// Delete a product and then its image.
///
/// A failed image delete is logged; the product is already gone.
#[instrument(skip_all, fields(product_id = %id))]
async fn remove(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    let image_key = ProductRepository::new(state.pool()).delete(id).await?;

    if let Some(key) = image_key
        && let Err(e) = state.objects().delete(&key).await
    {
        tracing::warn!(error = %e, key = %key, "Failed to delete product image");
    }

    Ok(StatusCode::NO_CONTENT)
}
