//! Sales-terminal shopping cart.
//!
//! The cart is bookkeeping only: it keeps one line per product, bounds each
//! quantity by the stock the terminal last saw for that product, and turns
//! into a [`SaleRequest`] at checkout. Stock is re-checked for real inside
//! the sale transaction; the bound here only stops the cashier from asking
//! for more than is on the shelf.

use serde::{Deserialize, Serialize};

use crate::sale::{SaleLine, SaleRequest, SaleRequestError};
use crate::types::{CustomerIdentity, Money, ProductId};

/// What the terminal currently knows about a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Money,
    /// Units in stock.
    pub stock: u32,
}

/// A cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product ID.
    pub product_id: ProductId,
    /// Product name at the time it was added.
    pub name: String,
    /// Unit price at the time it was added.
    pub unit_price: Money,
    /// Units in the cart (always at least 1).
    pub quantity: u32,
}

impl CartLine {
    /// Unit price × quantity, or `None` past the largest storable amount.
    #[must_use]
    pub fn subtotal(&self) -> Option<Money> {
        self.unit_price.checked_times(self.quantity)
    }
}

/// Result of [`Cart::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was created with quantity 1.
    Added,
    /// An existing line went up by one.
    Incremented,
    /// The line already holds every unit in stock; nothing changed.
    AtStockLimit,
    /// The product has no stock; nothing changed.
    OutOfStock,
}

/// Errors from cart operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// The requested quantity exceeds the known stock.
    #[error("only {stock} units of {name} in stock")]
    ExceedsStock {
        /// Product name.
        name: String,
        /// Known stock.
        stock: u32,
    },
    /// The product has no line in the cart.
    #[error("{0} is not in the cart")]
    NotInCart(String),
    /// Checkout was attempted with no lines.
    #[error("the cart is empty")]
    Empty,
    /// The cart does not make a valid sale request.
    #[error(transparent)]
    Sale(#[from] SaleRequestError),
}

/// The shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add one unit of a product.
    pub fn add(&mut self, product: &ProductSnapshot) -> AddOutcome {
        if let Some(line) = self.line_mut(product.id) {
            if line.quantity < product.stock {
                line.quantity += 1;
                return AddOutcome::Incremented;
            }
            return AddOutcome::AtStockLimit;
        }

        if product.stock == 0 {
            return AddOutcome::OutOfStock;
        }

        self.lines.push(CartLine {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            quantity: 1,
        });
        AddOutcome::Added
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ExceedsStock` if `quantity` is above the known
    /// stock, or `CartError::NotInCart` if the product has no line. The cart
    /// is unchanged on error.
    pub fn set_quantity(
        &mut self,
        product: &ProductSnapshot,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity > product.stock {
            return Err(CartError::ExceedsStock {
                name: product.name.clone(),
                stock: product.stock,
            });
        }

        if quantity == 0 {
            return self.remove(product.id).map(|_| ()).ok_or_else(|| {
                CartError::NotInCart(product.name.clone())
            });
        }

        let line = self
            .line_mut(product.id)
            .ok_or_else(|| CartError::NotInCart(product.name.clone()))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a product's line, returning it.
    pub fn remove(&mut self, product_id: ProductId) -> Option<CartLine> {
        let pos = self.lines.iter().position(|l| l.product_id == product_id)?;
        Some(self.lines.remove(pos))
    }

    /// Quantity of a product in the cart (0 if absent).
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map_or(0, |l| l.quantity)
    }

    /// Cart lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of line subtotals, or `None` past the largest storable amount.
    #[must_use]
    pub fn total(&self) -> Option<Money> {
        self.lines
            .iter()
            .map(CartLine::subtotal)
            .try_fold(Money::ZERO, |total, subtotal| total.checked_add(subtotal?))
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Turn the cart into a sale request for a customer.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Empty` if there is nothing to sell, or
    /// `CartError::Sale` if the total is too large to record.
    pub fn checkout(&self, customer: CustomerIdentity) -> Result<SaleRequest, CartError> {
        if self.is_empty() {
            return Err(CartError::Empty);
        }
        let lines = self
            .lines
            .iter()
            .map(|l| SaleLine {
                product_id: l.product_id,
                product_name: l.name.clone(),
                quantity: l.quantity,
                unit_price: l.unit_price,
            })
            .collect();
        Ok(SaleRequest::new(customer, lines)?)
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.product_id == product_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: i32, cents: u32, stock: u32) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new(id),
            name: format!("product-{id}"),
            price: Money::from_cents(cents),
            stock,
        }
    }

    #[test]
    fn test_add_new_then_increment() {
        let mut cart = Cart::new();
        let p = product(1, 100, 3);
        assert_eq!(cart.add(&p), AddOutcome::Added);
        assert_eq!(cart.add(&p), AddOutcome::Incremented);
        assert_eq!(cart.quantity_of(p.id), 2);
    }

    #[test]
    fn test_add_stops_at_stock() {
        let mut cart = Cart::new();
        let p = product(1, 100, 2);
        cart.add(&p);
        cart.add(&p);
        assert_eq!(cart.add(&p), AddOutcome::AtStockLimit);
        assert_eq!(cart.quantity_of(p.id), 2);
    }

    #[test]
    fn test_add_out_of_stock() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(&product(1, 100, 0)), AddOutcome::OutOfStock);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_respects_refreshed_stock() {
        let mut cart = Cart::new();
        let p = product(1, 100, 5);
        cart.add(&p);
        cart.add(&p);
        // Another terminal sold units; the snapshot now shows 2 left.
        let refreshed = product(1, 100, 2);
        assert_eq!(cart.add(&refreshed), AddOutcome::AtStockLimit);
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut cart = Cart::new();
        let p = product(1, 100, 5);
        cart.add(&p);
        cart.set_quantity(&p, 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.quantity_of(p.id), 0);
    }

    #[test]
    fn test_set_quantity_above_stock_is_rejected() {
        let mut cart = Cart::new();
        let p = product(1, 100, 5);
        cart.add(&p);
        let err = cart.set_quantity(&p, 6).unwrap_err();
        assert!(matches!(err, CartError::ExceedsStock { stock: 5, .. }));
        assert_eq!(cart.quantity_of(p.id), 1);
    }

    #[test]
    fn test_set_quantity_requires_line() {
        let mut cart = Cart::new();
        let p = product(1, 100, 5);
        assert!(matches!(
            cart.set_quantity(&p, 2),
            Err(CartError::NotInCart(_))
        ));
    }

    #[test]
    fn test_total_is_sum_of_subtotals() {
        let mut cart = Cart::new();
        let a = product(1, 250, 10);
        let b = product(2, 1999, 10);
        cart.add(&a);
        cart.set_quantity(&a, 4).unwrap();
        cart.add(&b);
        cart.set_quantity(&b, 3).unwrap();

        let by_lines = Money::checked_sum(cart.lines().iter().map(|l| l.subtotal().unwrap()));
        assert_eq!(cart.total(), by_lines);
        assert_eq!(cart.total(), Some(Money::from_cents(250 * 4 + 1999 * 3)));
    }

    #[test]
    fn test_total_after_every_mutation() {
        let mut cart = Cart::new();
        let a = product(1, 300, 3);
        let b = product(2, 150, 1);
        let steps: Vec<Box<dyn Fn(&mut Cart)>> = vec![
            Box::new(|c| {
                c.add(&a);
            }),
            Box::new(|c| {
                c.add(&b);
            }),
            Box::new(|c| {
                c.add(&a);
            }),
            Box::new(|c| c.set_quantity(&a, 3).unwrap()),
            Box::new(|c| c.set_quantity(&b, 0).unwrap()),
        ];
        for step in &steps {
            step(&mut cart);
            let expected = Money::checked_sum(
                cart.lines()
                    .iter()
                    .map(|l| l.unit_price.checked_times(l.quantity).unwrap()),
            );
            assert_eq!(cart.total(), expected);
        }
        assert_eq!(cart.total(), Some(Money::from_cents(900)));
    }

    #[test]
    fn test_checkout() {
        let mut cart = Cart::new();
        let customer = CustomerIdentity::new("Ana", "0102").unwrap();
        assert_eq!(cart.checkout(customer.clone()), Err(CartError::Empty));

        cart.add(&product(7, 500, 2));
        let request = cart.checkout(customer).unwrap();
        assert_eq!(request.lines().len(), 1);
        assert_eq!(request.total(), Money::from_cents(500));
        assert_eq!(request.customer().name(), "Ana");
    }

    #[test]
    fn test_total_past_limit_is_none() {
        let mut cart = Cart::new();
        let mut p = product(1, 0, 2);
        p.price = Money::new(rust_decimal::Decimal::new(Money::MAX_CENTS, 2)).unwrap();
        cart.add(&p);
        assert_eq!(cart.total(), Some(p.price));

        cart.add(&p);
        assert_eq!(cart.total(), None);
        assert_eq!(
            cart.checkout(CustomerIdentity::new("Ana", "0102").unwrap()),
            Err(CartError::Sale(SaleRequestError::TotalOutOfRange))
        );
    }
}
