//! Core value types for Stockroom.
//!
//! This module provides type-safe wrappers for IDs, money, emails and
//! customer identities.

pub mod customer;
pub mod email;
pub mod id;
pub mod money;

pub use customer::{CustomerError, CustomerIdentity};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Money, MoneyError};
