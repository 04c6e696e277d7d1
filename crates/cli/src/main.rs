//! Stockroom CLI - migrations, accounts and terminal face login.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! stockroom migrate
//!
//! # Create an account
//! stockroom user create -e cashier@store.test -n "Front Till" -p 'long passphrase'
//!
//! # Enroll a face descriptor for an account
//! stockroom user enroll-face -e cashier@store.test -f descriptor.json
//!
//! # Sign in at a terminal from a stream of descriptors
//! stockroom face-login --server http://127.0.0.1:3000 --frames frames.jsonl
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use stockroom_core::face::DEFAULT_MATCH_THRESHOLD;

mod commands;

#[derive(Parser)]
#[command(name = "stockroom")]
#[command(author, version, about = "Stockroom CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Sign in by face from a JSON-lines descriptor stream
    FaceLogin {
        /// Base URL of the Stockroom server
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server: String,

        /// JSON-lines file of descriptors (`null` = no face in frame)
        #[arg(long)]
        frames: PathBuf,

        /// Milliseconds between captures
        #[arg(long, default_value_t = 900)]
        interval_ms: u64,

        /// Maximum descriptor distance for a match
        #[arg(long, default_value_t = DEFAULT_MATCH_THRESHOLD)]
        threshold: f32,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new account
    Create {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Display name (defaults to the email's local part)
        #[arg(short, long)]
        name: Option<String>,

        /// Password (omit for a face/token-only account)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Store a face descriptor for an account
    EnrollFace {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// JSON file holding one 128-number descriptor
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                password,
            } => {
                commands::user::create(&email, name.as_deref(), password.as_deref()).await?;
            }
            UserAction::EnrollFace { email, file } => {
                commands::user::enroll_face(&email, &file).await?;
            }
        },
        Commands::FaceLogin {
            server,
            frames,
            interval_ms,
            threshold,
        } => {
            commands::face_login::run(commands::face_login::FaceLoginOptions {
                server,
                frames,
                interval: Duration::from_millis(interval_ms),
                threshold,
            })
            .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_face_login_defaults() {
        let cli = Cli::parse_from(["stockroom", "face-login", "--frames", "f.jsonl"]);
        let Commands::FaceLogin {
            server,
            interval_ms,
            ..
        } = cli.command
        else {
            panic!("expected face-login");
        };
        assert_eq!(server, "http://127.0.0.1:3000");
        assert_eq!(
            Duration::from_millis(interval_ms),
            stockroom_server::services::face_login::DEFAULT_INTERVAL
        );
    }
}
