//! Local object store for product images.
//!
//! Objects live under a root directory, keyed by relative paths such as
//! `products/product_1718000000000_soap.jpg`. They are served through
//! `/objects/{key}` with an HMAC-signed `expires` query so links can be
//! embedded in product records without exposing the whole store.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::instrument;

use super::token::{TokenError, TokenSigner};

/// Expiry used for product image links: 2491-03-09T00:00:00Z.
pub const NEVER_EXPIRES: i64 = 16_447_017_600;

const URL_PREFIX: &str = "object:";
const MAX_FILE_NAME_LEN: usize = 120;

/// Errors from object store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key is empty or escapes the store root.
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    /// No object under that key.
    #[error("object not found")]
    NotFound,
    /// The URL signature does not match.
    #[error("invalid signature")]
    BadSignature,
    /// The URL is past its expiry.
    #[error("link expired")]
    Expired,
    /// Filesystem error.
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    /// The signer failed.
    #[error("signing error: {0}")]
    Signing(#[from] TokenError),
}

/// Filesystem-backed object store.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
    base_url: String,
    signer: TokenSigner,
}

impl ObjectStore {
    /// Create a store rooted at `root`, generating URLs under `base_url`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, base_url: &str, signer: TokenSigner) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            signer,
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(relative))
    }

    /// Write an object, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the write fails.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!("Object stored");
        Ok(())
    }

    /// Read an object.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if there is no such object.
    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound,
            _ => StorageError::Io(e),
        })
    }

    /// Delete an object. Deleting a missing object is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the delete fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// A download URL for `key` valid until `expires` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or signing fails.
    pub fn signed_url(&self, key: &str, expires: i64) -> Result<String, StorageError> {
        self.path_for(key)?;
        let signature = self.signer.sign(&url_message(key, expires))?;
        Ok(format!(
            "{}/objects/{key}?expires={expires}&signature={}",
            self.base_url,
            hex::encode(signature)
        ))
    }

    /// Check a download URL's query against `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::BadSignature` or `StorageError::Expired`.
    pub fn verify_url(
        &self,
        key: &str,
        expires: i64,
        signature_hex: &str,
        now: i64,
    ) -> Result<(), StorageError> {
        let signature = hex::decode(signature_hex).map_err(|_| StorageError::BadSignature)?;
        self.signer
            .verify(&url_message(key, expires), &signature)
            .map_err(|_| StorageError::BadSignature)?;
        if now >= expires {
            return Err(StorageError::Expired);
        }
        Ok(())
    }
}

fn url_message(key: &str, expires: i64) -> Vec<u8> {
    format!("{URL_PREFIX}{key}:{expires}").into_bytes()
}

/// Object key for an uploaded product image.
///
/// The file name is reduced to ASCII letters, digits, `.`, `-` and `_`.
/// When it has no extension, one is taken from the content type.
#[must_use]
pub fn product_image_key(file_name: &str, content_type: Option<&str>, unix_millis: i64) -> String {
    let mut name: String = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_NAME_LEN)
        .collect();

    name = name.trim_start_matches('.').to_owned();
    if name.is_empty() {
        name = "upload".to_owned();
    }

    let has_extension = Path::new(&name).extension().is_some();
    if !has_extension && let Some(ext) = content_type.and_then(extension_for) {
        name = format!("{name}.{ext}");
    }

    format!("products/product_{unix_millis}_{name}")
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/svg+xml" => Some("svg"),
        _ => None,
    }
}

/// Content type to serve an object with, from its extension.
#[must_use]
pub fn content_type_for(key: &str) -> &'static str {
    let ext = Path::new(key)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
