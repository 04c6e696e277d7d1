//! Domain models for the server.
//!
//! Rows come out of the repositories as these types; handlers serialize
//! them straight to JSON.

pub mod product;
pub mod sale;
pub mod session;
pub mod user;

pub use product::{NewProduct, Product, ProductOrder, ProductPatch};
pub use sale::{Sale, SaleItem, SaleSummary};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
