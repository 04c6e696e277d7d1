//! Stockroom Core - Shared domain library.
//!
//! This crate holds the pieces of Stockroom that have no I/O:
//! - `server` - HTTP/JSON service (products, sales, reports, auth)
//! - `cli` - Migrations, account management and the face-login driver
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails and customers
//! - [`cart`] - Sales-terminal cart bounded by known stock
//! - [`sale`] - Sale requests and stock-change planning
//! - [`face`] - Face descriptors and threshold matching

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod face;
pub mod sale;
pub mod types;

pub use cart::{AddOutcome, Cart, CartError, CartLine, ProductSnapshot};
pub use face::{DescriptorError, FaceDescriptor, FaceMatch, FaceMatcher, LabeledDescriptors};
pub use sale::{
    LockedProduct, SaleCommitError, SaleLine, SaleRequest, SaleRequestError, StockChange,
    plan_stock_changes,
};
pub use types::*;
