//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::services::{ObjectStore, TokenSigner};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    tokens: TokenSigner,
    objects: ObjectStore,
}

impl AppState {
    /// Build the state, deriving the token signer and object store from `config`.
    #[must_use]
    pub fn new(config: ServerConfig, pool: PgPool) -> Self {
        let tokens = TokenSigner::new(SecretString::from(config.secret.expose_secret().to_owned()));
        let objects = ObjectStore::new(&config.storage_dir, &config.base_url, tokens.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                objects,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Signer for custom tokens.
    #[must_use]
    pub fn tokens(&self) -> &TokenSigner {
        &self.inner.tokens
    }

    /// Product image store.
    #[must_use]
    pub fn objects(&self) -> &ObjectStore {
        &self.inner.objects
    }
}
