//! Business logic services.
//!
//! - `auth` - Accounts, password login, custom tokens, face match
//! - `face_login` - Periodic capture-and-match loop for terminals
//! - `invoice` - PDF invoices
//! - `reports` - XLSX reports
//! - `storage` - Product image objects and signed URLs
//! - `token` - HMAC signing for tokens and URLs

pub mod auth;
pub mod face_login;
pub mod invoice;
pub mod reports;
pub mod storage;
pub mod token;

pub use auth::{AuthError, AuthService};
pub use storage::{ObjectStore, StorageError};
pub use token::{TokenError, TokenSigner};
