//! Product repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use stockroom_core::{Money, ProductId, UserId};

use super::{RepositoryError, non_negative};
use crate::models::{NewProduct, Product, ProductOrder, ProductPatch};

const PRODUCT_COLUMNS: &str =
    "id, name, price, stock, image_key, image_url, created_by, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    price: Decimal,
    stock: i32,
    image_key: Option<String>,
    image_url: Option<String>,
    created_by: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Money::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for product {}: {e}", row.id))
        })?;
        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            price,
            stock: non_negative(row.stock, "stock")?,
            image_key: row.image_key,
            image_url: row.image_url,
            created_by: row.created_by.map(UserId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Convert a stock count for binding as `INT4`.
pub(crate) fn stock_param(stock: u32) -> Result<i32, RepositoryError> {
    i32::try_from(stock).map_err(|_| RepositoryError::Conflict(format!("stock {stock} is out of range")))
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, order: ProductOrder) -> Result<Vec<Product>, RepositoryError> {
        let order_by = match order {
            ProductOrder::Name => "name ASC, id ASC",
            ProductOrder::Newest => "created_at DESC, id DESC",
        };
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM stockroom.product ORDER BY {order_by}");

        sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM stockroom.product WHERE id = $1");
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create(
        &self,
        product: &NewProduct,
        created_by: UserId,
    ) -> Result<Product, RepositoryError> {
        let sql = format!(
            "INSERT INTO stockroom.product (name, price, stock, image_key, image_url, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&product.name)
            .bind(product.price)
            .bind(stock_param(product.stock)?)
            .bind(product.image_key.as_deref())
            .bind(product.image_url.as_deref())
            .bind(created_by)
            .fetch_one(self.pool)
            .await?;

        let product = Product::try_from(row)?;
        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self, patch), fields(product_id = %id))]
    pub async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, RepositoryError> {
        let stock = patch.stock.map(stock_param).transpose()?;
        let sql = format!(
            "UPDATE stockroom.product \
             SET name = COALESCE($2, name), \
                 price = COALESCE($3, price), \
                 stock = COALESCE($4, stock), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(patch.name.as_deref())
            .bind(patch.price)
            .bind(stock)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Product::try_from(row)
    }

    /// Delete a product, returning its image key if it had one.
    ///
    /// Sale items keep their copy of the name and price; their product
    /// reference is cleared by the foreign key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete(&self, id: ProductId) -> Result<Option<String>, RepositoryError> {
        let image_key: Option<String> = sqlx::query_scalar::<_, Option<String>>(
            "DELETE FROM stockroom.product WHERE id = $1 RETURNING image_key",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tracing::info!("Product deleted");
        Ok(image_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_param_range() {
        assert_eq!(stock_param(12).ok(), Some(12));
        assert!(matches!(
            stock_param(u32::MAX),
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[test]
    fn test_negative_stock_is_corruption() {
        let row = ProductRow {
            id: 1,
            name: "Soap".to_owned(),
            price: Decimal::new(125, 2),
            stock: -1,
            image_key: None,
            image_url: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(
            Product::try_from(row),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
