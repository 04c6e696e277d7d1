//! Sale requests and stock-change planning.
//!
//! A [`SaleRequest`] is what the terminal hands to the server once the cart
//! is checked out. The server locks the referenced product rows, calls
//! [`plan_stock_changes`] against what it read, and only writes if the plan
//! succeeds.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::{CustomerIdentity, Money, ProductId};

/// One line of a sale: a product, how many, and the price it sold at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    /// Product sold.
    pub product_id: ProductId,
    /// Product name as shown on the terminal.
    pub product_name: String,
    /// Units sold.
    pub quantity: u32,
    /// Unit price at the time of sale.
    pub unit_price: Money,
}

impl SaleLine {
    /// Unit price × quantity, or `None` past the largest storable amount.
    #[must_use]
    pub fn subtotal(&self) -> Option<Money> {
        self.unit_price.checked_times(self.quantity)
    }
}

/// Errors from validating a [`SaleRequest`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SaleRequestError {
    /// No lines.
    #[error("a sale needs at least one product")]
    Empty,
    /// A line has quantity zero.
    #[error("quantity for {0} must be at least 1")]
    ZeroQuantity(String),
    /// The same product appears on two lines.
    #[error("product {0} appears more than once")]
    DuplicateProduct(ProductId),
    /// The total does not fit in a storable amount.
    #[error("sale total is too large")]
    TotalOutOfRange,
}

/// An immutable, validated request to record a sale.
///
/// The total is always computed from the lines; a total sent by a client is
/// ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSaleRequest")]
pub struct SaleRequest {
    customer: CustomerIdentity,
    lines: Vec<SaleLine>,
    total: Money,
}

#[derive(Deserialize)]
struct RawSaleRequest {
    customer: CustomerIdentity,
    lines: Vec<SaleLine>,
}

impl TryFrom<RawSaleRequest> for SaleRequest {
    type Error = SaleRequestError;

    fn try_from(raw: RawSaleRequest) -> Result<Self, Self::Error> {
        Self::new(raw.customer, raw.lines)
    }
}

impl SaleRequest {
    /// Validate lines and build the request.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no lines, a quantity is zero, a
    /// product appears twice, or the total is past the largest storable
    /// amount.
    pub fn new(customer: CustomerIdentity, lines: Vec<SaleLine>) -> Result<Self, SaleRequestError> {
        if lines.is_empty() {
            return Err(SaleRequestError::Empty);
        }
        let mut seen = HashSet::with_capacity(lines.len());
        for line in &lines {
            if line.quantity == 0 {
                return Err(SaleRequestError::ZeroQuantity(line.product_name.clone()));
            }
            if !seen.insert(line.product_id) {
                return Err(SaleRequestError::DuplicateProduct(line.product_id));
            }
        }
        let total = lines
            .iter()
            .map(SaleLine::subtotal)
            .try_fold(Money::ZERO, |total, subtotal| total.checked_add(subtotal?))
            .ok_or(SaleRequestError::TotalOutOfRange)?;
        Ok(Self {
            customer,
            lines,
            total,
        })
    }

    /// Who the sale is for.
    #[must_use]
    pub const fn customer(&self) -> &CustomerIdentity {
        &self.customer
    }

    /// Sale lines.
    #[must_use]
    pub fn lines(&self) -> &[SaleLine] {
        &self.lines
    }

    /// Sum of line subtotals.
    #[must_use]
    pub const fn total(&self) -> Money {
        self.total
    }

    /// Referenced product IDs in ascending order, the order rows are locked in.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<_> = self.lines.iter().map(|l| l.product_id).collect();
        ids.sort_unstable();
        ids
    }
}

/// A product row as read under lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedProduct {
    /// Product ID.
    pub id: ProductId,
    /// Current name.
    pub name: String,
    /// Current stock.
    pub stock: u32,
}

/// A stock value to write back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    /// Product to update.
    pub product_id: ProductId,
    /// Stock after the sale.
    pub new_stock: u32,
}

/// Reasons a sale cannot be committed.
///
/// Display strings are shown to the cashier as-is.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SaleCommitError {
    /// A referenced product was deleted while it sat in the cart.
    #[error("Product {name} no longer exists.")]
    ProductMissing {
        /// Name from the sale line.
        name: String,
    },
    /// Not enough stock left.
    #[error("Insufficient stock for {name}.")]
    InsufficientStock {
        /// Current product name.
        name: String,
        /// Units requested.
        requested: u32,
        /// Units in stock.
        available: u32,
    },
}

/// Compute the stock writes for a sale, or the first reason it cannot happen.
///
/// `locked` holds whatever rows the lock query returned; products absent
/// from it no longer exist. The result has one entry per line, in line order.
///
/// # Errors
///
/// Returns the first line, in order, that references a missing product or
/// asks for more than is in stock.
pub fn plan_stock_changes(
    lines: &[SaleLine],
    locked: &HashMap<ProductId, LockedProduct>,
) -> Result<Vec<StockChange>, SaleCommitError> {
    lines
        .iter()
        .map(|line| {
            let product =
                locked
                    .get(&line.product_id)
                    .ok_or_else(|| SaleCommitError::ProductMissing {
                        name: line.product_name.clone(),
                    })?;
            let new_stock = product.stock.checked_sub(line.quantity).ok_or_else(|| {
                SaleCommitError::InsufficientStock {
                    name: product.name.clone(),
                    requested: line.quantity,
                    available: product.stock,
                }
            })?;
            Ok(StockChange {
                product_id: line.product_id,
                new_stock,
            })
        })
        .collect()
}
