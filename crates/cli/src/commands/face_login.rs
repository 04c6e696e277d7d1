//! Terminal face login.
//!
//! Reads descriptors produced by an external extractor from a JSON-lines
//! file (one 128-number array per frame, `null` when the frame has no
//! face), matches them against every enrolled face in the database, and on
//! the first match asks the server for a custom token.
//!
//! # Usage
//!
//! ```bash
//! stockroom face-login --server http://127.0.0.1:3000 --frames frames.jsonl
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use stockroom_core::{Email, FaceDescriptor, FaceMatcher};
use stockroom_server::db::{RepositoryError, UserRepository};
use stockroom_server::services::face_login::{
    Capture, CredentialExchange, FaceLoginError, FaceLoginLoop, FrameSource, LoginOutcome,
};

use super::{ConnectError, connect};

/// Errors from the face-login command.
#[derive(Debug, Error)]
pub enum FaceLoginCommandError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Could not open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("Could not build HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("{0}")]
    Login(#[from] FaceLoginError<ExchangeError>),
}

/// Frames read line by line from a JSON-lines file.
pub struct JsonLinesFrames<R> {
    lines: Option<Lines<R>>,
    line_no: usize,
}

impl JsonLinesFrames<BufReader<File>> {
    /// Open a frames file.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened.
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path).await?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R> JsonLinesFrames<R>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: Some(reader.lines()),
            line_no: 0,
        }
    }
}

impl<R> FrameSource for JsonLinesFrames<R>
where
    R: tokio::io::AsyncBufRead + Unpin + Send,
{
    type Error = String;

    async fn next_capture(&mut self) -> Result<Capture, String> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(Capture::Exhausted);
        };

        loop {
            let Some(line) = lines.next_line().await.map_err(|e| e.to_string())? else {
                return Ok(Capture::Exhausted);
            };
            self.line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let values: Option<Vec<f32>> = serde_json::from_str(line)
                .map_err(|e| format!("line {}: {e}", self.line_no))?;
            return match values {
                None => Ok(Capture::NoFace),
                Some(values) => FaceDescriptor::new(values)
                    .map(Capture::Face)
                    .map_err(|e| format!("line {}: {e}", self.line_no)),
            };
        }
    }

    fn release(&mut self) {
        self.lines = None;
    }
}

/// Exchange failures.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Serialize)]
struct CustomTokenRequest<'a> {
    email: &'a str,
}

#[derive(Deserialize)]
struct CustomTokenResponse {
    token: String,
}

/// Mints custom tokens through `POST /api/auth/custom-token`.
pub struct HttpTokenExchange {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTokenExchange {
    /// Exchange against the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/auth/custom-token", base_url.trim_end_matches('/')),
        })
    }
}

impl CredentialExchange<Email> for HttpTokenExchange {
    type Credential = String;
    type Error = ExchangeError;

    async fn exchange(&self, label: &Email) -> Result<String, ExchangeError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&CustomTokenRequest {
                email: label.as_str(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Status { status, body });
        }

        Ok(response.json::<CustomTokenResponse>().await?.token)
    }
}

/// Options for [`run`].
pub struct FaceLoginOptions {
    pub server: String,
    pub frames: PathBuf,
    pub interval: Duration,
    pub threshold: f32,
}

/// Run the face-login loop until a match, Ctrl+C, or the end of the frames file.
pub async fn run(options: FaceLoginOptions) -> Result<(), FaceLoginCommandError> {
    let pool = connect().await?;
    let labeled = UserRepository::new(&pool).labeled_descriptors().await?;
    tracing::info!("Loaded {} enrolled face(s)", labeled.len());

    let mut frames =
        JsonLinesFrames::open(&options.frames)
            .await
            .map_err(|source| FaceLoginCommandError::Open {
                path: options.frames.display().to_string(),
                source,
            })?;
    let exchange = HttpTokenExchange::new(&options.server).map_err(FaceLoginCommandError::Client)?;

    let login = FaceLoginLoop::new(FaceMatcher::new(labeled, options.threshold), options.interval);
    let stop = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    match login.run(&mut frames, &exchange, stop).await? {
        LoginOutcome::Authenticated {
            label,
            distance,
            credential,
        } => {
            tracing::info!("Signed in as {label} (distance {distance:.3})");
            #[allow(clippy::print_stdout)]
            {
                println!("{credential}");
            }
        }
        LoginOutcome::Cancelled => tracing::info!("Face login cancelled"),
        LoginOutcome::SourceExhausted => tracing::warn!("No face recognized"),
    }
    Ok(())
}
