//! Sale repository.
//!
//! Committing a sale is the one multi-row write in the system. It runs in a
//! single transaction that locks every referenced product row, checks the
//! stock plan, decrements stock, and inserts the sale with its items. Any
//! early return drops the transaction, which rolls it back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use stockroom_core::{
    CustomerIdentity, LockedProduct, Money, ProductId, SaleCommitError, SaleId, SaleItemId,
    SaleRequest, UserId, plan_stock_changes,
};

use super::products::stock_param;
use super::{RepositoryError, non_negative};
use crate::models::{Sale, SaleItem, SaleSummary};

/// Errors from [`SaleRepository::commit`].
#[derive(Debug, Error)]
pub enum CommitError {
    /// The sale was rejected; nothing was written.
    #[error(transparent)]
    Rejected(#[from] SaleCommitError),

    /// The database failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CommitError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

#[derive(sqlx::FromRow)]
struct LockedRow {
    id: i32,
    name: String,
    stock: i32,
}

#[derive(sqlx::FromRow)]
struct SaleRow {
    id: i32,
    customer_name: String,
    customer_external_id: String,
    total: Decimal,
    created_by: Option<i32>,
    created_at: DateTime<Utc>,
}

impl SaleRow {
    fn customer(&self) -> Result<CustomerIdentity, RepositoryError> {
        CustomerIdentity::new(&self.customer_name, &self.customer_external_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid customer on sale {}: {e}", self.id))
        })
    }

    fn total(&self) -> Result<Money, RepositoryError> {
        Money::new(self.total).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid total on sale {}: {e}", self.id))
        })
    }

    fn into_summary(self) -> Result<SaleSummary, RepositoryError> {
        Ok(SaleSummary {
            id: SaleId::new(self.id),
            customer: self.customer()?,
            total: self.total()?,
            created_at: self.created_at,
        })
    }

    fn into_sale(self, items: Vec<SaleItem>) -> Result<Sale, RepositoryError> {
        Ok(Sale {
            id: SaleId::new(self.id),
            customer: self.customer()?,
            total: self.total()?,
            created_by: self.created_by.map(UserId::new),
            created_at: self.created_at,
            items,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SaleItemRow {
    id: i32,
    product_id: Option<i32>,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
}

impl TryFrom<SaleItemRow> for SaleItem {
    type Error = RepositoryError;

    fn try_from(row: SaleItemRow) -> Result<Self, Self::Error> {
        let unit_price = Money::new(row.unit_price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price on sale item {}: {e}", row.id))
        })?;
        Ok(Self {
            id: SaleItemId::new(row.id),
            product_id: row.product_id.map(ProductId::new),
            product_name: row.product_name,
            quantity: non_negative(row.quantity, "quantity")?,
            unit_price,
        })
    }
}

const SALE_COLUMNS: &str =
    "id, customer_name, customer_external_id, total, created_by, created_at";
const ITEM_COLUMNS: &str = "id, product_id, product_name, quantity, unit_price";

/// Repository for sale database operations.
pub struct SaleRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SaleRepository<'a> {
    /// Create a new sale repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Commit a sale atomically.
    ///
    /// Product rows are locked in ascending ID order, so two terminals
    /// selling overlapping products serialize instead of deadlocking.
    ///
    /// # Errors
    ///
    /// Returns `CommitError::Rejected` if a product is gone or short on
    /// stock, in which case no row was changed. Returns
    /// `CommitError::Repository` if the database fails.
    #[instrument(
        skip(self, request),
        fields(customer_id = %request.customer().id(), lines = request.lines().len())
    )]
    pub async fn commit(
        &self,
        request: &SaleRequest,
        created_by: UserId,
    ) -> Result<Sale, CommitError> {
        let mut tx = self.pool.begin().await?;

        let ids: Vec<i32> = request.product_ids().into_iter().map(i32::from).collect();
        let rows = sqlx::query_as::<_, LockedRow>(
            "SELECT id, name, stock FROM stockroom.product \
             WHERE id = ANY($1) \
             ORDER BY id \
             FOR UPDATE",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;

        let mut locked = HashMap::with_capacity(rows.len());
        for row in rows {
            let id = ProductId::new(row.id);
            let stock = non_negative(row.stock, "stock")?;
            locked.insert(
                id,
                LockedProduct {
                    id,
                    name: row.name,
                    stock,
                },
            );
        }

        let changes = plan_stock_changes(request.lines(), &locked)
            .inspect_err(|e| tracing::info!(reason = %e, "Sale rejected"))?;

        for change in &changes {
            sqlx::query(
                "UPDATE stockroom.product SET stock = $2, updated_at = now() WHERE id = $1",
            )
            .bind(change.product_id)
            .bind(stock_param(change.new_stock)?)
            .execute(&mut *tx)
            .await?;
        }

        let header_sql = format!(
            "INSERT INTO stockroom.sale (customer_name, customer_external_id, total, created_by) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {SALE_COLUMNS}"
        );
        let header = sqlx::query_as::<_, SaleRow>(&header_sql)
            .bind(request.customer().name())
            .bind(request.customer().id())
            .bind(request.total())
            .bind(created_by)
            .fetch_one(&mut *tx)
            .await?;

        let item_sql = format!(
            "INSERT INTO stockroom.sale_item (sale_id, product_id, product_name, quantity, unit_price) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {ITEM_COLUMNS}"
        );
        let mut items = Vec::with_capacity(request.lines().len());
        for line in request.lines() {
            let row = sqlx::query_as::<_, SaleItemRow>(&item_sql)
                .bind(header.id)
                .bind(line.product_id)
                .bind(&line.product_name)
                .bind(stock_param(line.quantity)?)
                .bind(line.unit_price)
                .fetch_one(&mut *tx)
                .await?;
            items.push(SaleItem::try_from(row)?);
        }

        tx.commit().await?;

        let sale = header.into_sale(items)?;
        tracing::info!(sale_id = %sale.id, total = %sale.total, "Sale committed");
        Ok(sale)
    }

    /// Get a sale with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(sale_id = %id))]
    pub async fn get(&self, id: SaleId) -> Result<Option<Sale>, RepositoryError> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM stockroom.sale WHERE id = $1");
        let Some(header) = sqlx::query_as::<_, SaleRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };

        let item_sql =
            format!("SELECT {ITEM_COLUMNS} FROM stockroom.sale_item WHERE sale_id = $1 ORDER BY id");
        let items = sqlx::query_as::<_, SaleItemRow>(&item_sql)
            .bind(id)
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(SaleItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        header.into_sale(items).map(Some)
    }

    /// All sales, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_summaries(&self) -> Result<Vec<SaleSummary>, RepositoryError> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM stockroom.sale ORDER BY created_at, id");
        sqlx::query_as::<_, SaleRow>(&sql)
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(SaleRow::into_summary)
            .collect()
    }

    /// Sales for one customer external ID, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_by_customer(
        &self,
        customer_external_id: &str,
    ) -> Result<Vec<SaleSummary>, RepositoryError> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM stockroom.sale \
             WHERE customer_external_id = $1 \
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, SaleRow>(&sql)
            .bind(customer_external_id)
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(SaleRow::into_summary)
            .collect()
    }
}
