//! XLSX report downloads.

use axum::{
    Router,
    extract::State,
    response::Response,
    routing::get,
};
use tracing::instrument;

use super::attachment;
use crate::db::{ProductRepository, SaleRepository};
use crate::error::{AppError, Result};
use crate::extract::Path;
use crate::middleware::RequireAuth;
use crate::models::ProductOrder;
use crate::services::reports::{self, XLSX_CONTENT_TYPE};
use crate::state::AppState;

/// Build the reports router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/reports/sales", get(sales_value))
        .route("/api/reports/stock", get(stock))
        .route("/api/reports/customers/{id}", get(customer_purchases))
}

#[instrument(skip_all)]
async fn sales_value(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Response> {
    let sales = SaleRepository::new(state.pool()).list_summaries().await?;
    let bytes = reports::to_xlsx(&reports::sales_value_table(&sales))?;
    Ok(attachment(XLSX_CONTENT_TYPE, reports::SALES_REPORT_FILE, bytes))
}

#[instrument(skip_all)]
async fn stock(RequireAuth(_user): RequireAuth, State(state): State<AppState>) -> Result<Response> {
    let products = ProductRepository::new(state.pool())
        .list(ProductOrder::Name)
        .await?;
    let bytes = reports::to_xlsx(&reports::stock_table(&products))?;
    Ok(attachment(XLSX_CONTENT_TYPE, reports::STOCK_REPORT_FILE, bytes))
}

/// Purchases by one customer external identifier.
#[instrument(skip_all, fields(customer_id = %customer_id))]
async fn customer_purchases(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Result<Response> {
    let sales = SaleRepository::new(state.pool())
        .list_by_customer(customer_id.trim())
        .await?;
    let Some(first) = sales.first() else {
        return Err(AppError::NotFound(format!("sales for customer {customer_id}")));
    };

    let file_name = reports::customer_report_file(&first.customer);
    let bytes = reports::to_xlsx(&reports::customer_purchases_table(&sales))?;
    Ok(attachment(XLSX_CONTENT_TYPE, &file_name, bytes))
}
