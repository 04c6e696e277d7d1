//! Recorded sales.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use stockroom_core::{CustomerIdentity, Money, ProductId, SaleId, SaleItemId, UserId};

/// A committed sale with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct Sale {
    pub id: SaleId,
    pub customer: CustomerIdentity,
    pub total: Money,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<SaleItem>,
}

/// Sale header without items, as listed in reports.
#[derive(Debug, Clone, Serialize)]
pub struct SaleSummary {
    pub id: SaleId,
    pub customer: CustomerIdentity,
    pub total: Money,
    pub created_at: DateTime<Utc>,
}

/// One line of a committed sale.
///
/// `product_id` becomes `None` if the product is later deleted; the name
/// and price are kept as sold.
#[derive(Debug, Clone, Serialize)]
pub struct SaleItem {
    pub id: SaleItemId,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl SaleItem {
    /// Unit price × quantity.
    ///
    /// Cannot overflow: a `Money` is below 10^10 and a quantity below 2^32.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price.amount() * Decimal::from(self.quantity)
    }
}
