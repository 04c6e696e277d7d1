//! Product catalogue models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{Money, ProductId, UserId};

/// A product row.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: u32,
    /// Object store key of the product image.
    pub image_key: Option<String>,
    /// Signed URL of the product image.
    pub image_url: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub image_key: Option<String>,
    pub image_url: Option<String>,
}

/// Partial update; `None` leaves a field as is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<u32>,
}

impl ProductPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.price.is_none() && self.stock.is_none()
    }
}

/// Listing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductOrder {
    /// Alphabetical by name.
    #[default]
    Name,
    /// Most recently created first.
    Newest,
}
