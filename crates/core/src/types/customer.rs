//! Customer identity recorded on a sale.

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`CustomerIdentity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CustomerError {
    /// The customer name is blank.
    #[error("customer name is required")]
    MissingName,
    /// The customer identifier (national ID, tax number...) is blank.
    #[error("customer identifier is required")]
    MissingId,
}

/// Who a sale was made to.
///
/// The external identifier is whatever the cashier types in the
/// "ID / document" field; it is the key the per-customer report searches by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCustomer")]
pub struct CustomerIdentity {
    name: String,
    id: String,
}

#[derive(Deserialize)]
struct RawCustomer {
    name: String,
    id: String,
}

impl TryFrom<RawCustomer> for CustomerIdentity {
    type Error = CustomerError;

    fn try_from(raw: RawCustomer) -> Result<Self, Self::Error> {
        Self::new(&raw.name, &raw.id)
    }
}

impl CustomerIdentity {
    /// Build a customer identity from trimmed, non-empty fields.
    ///
    /// # Errors
    ///
    /// Returns an error if either field is blank.
    pub fn new(name: &str, id: &str) -> Result<Self, CustomerError> {
        let name = name.trim();
        let id = id.trim();
        if name.is_empty() {
            return Err(CustomerError::MissingName);
        }
        if id.is_empty() {
            return Err(CustomerError::MissingId);
        }
        Ok(Self {
            name: name.to_owned(),
            id: id.to_owned(),
        })
    }

    /// Customer display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Customer external identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The name with whitespace runs replaced by `_`, for download file names.
    #[must_use]
    pub fn file_stem(&self) -> String {
        self.name.split_whitespace().collect::<Vec<_>>().join("_")
    }
}
