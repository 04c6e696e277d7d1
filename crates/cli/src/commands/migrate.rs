//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! stockroom migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOCKROOM_DATABASE_URL` - `PostgreSQL` connection string (falls back
//!   to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! `crates/server/migrations/`, embedded at compile time.

use thiserror::Error;

use super::{ConnectError, connect};

/// Errors from running migrations.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run every pending migration.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
