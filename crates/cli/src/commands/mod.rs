//! CLI subcommands.

pub mod face_login;
pub mod migrate;
pub mod user;

use secrecy::ExposeSecret;
use sqlx::PgPool;

use stockroom_server::config::{ConfigError, get_database_url};

/// Env var holding the database URL (falls back to `DATABASE_URL`).
pub const DATABASE_URL_VAR: &str = "STOCKROOM_DATABASE_URL";

/// Load `.env` and connect to the Stockroom database.
async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();
    let database_url = get_database_url(DATABASE_URL_VAR)?;

    tracing::info!("Connecting to database...");
    Ok(PgPool::connect(database_url.expose_secret()).await?)
}

/// Errors from [`connect`].
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}
