//! Periodic face-login loop.
//!
//! A terminal camera (or anything else that yields descriptors) is polled
//! on a fixed interval. Each capture is matched against the enrolled
//! faces; the first match is exchanged for a credential exactly once and
//! the loop ends. The loop also ends when the stop future completes or the
//! source runs dry. The source is released on every exit.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::instrument;

use stockroom_core::{FaceDescriptor, FaceMatch, FaceMatcher};

/// Default time between captures.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(900);

/// What a frame source produced on one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    /// A face was detected and described.
    Face(FaceDescriptor),
    /// The frame had no face in it.
    NoFace,
    /// The source has nothing more to give.
    Exhausted,
}

/// Something that captures face descriptors.
pub trait FrameSource: Send {
    /// Capture failure. Failures are logged and the loop keeps going.
    type Error: std::fmt::Display + Send;

    /// Capture the next frame.
    fn next_capture(&mut self) -> impl Future<Output = Result<Capture, Self::Error>> + Send;

    /// Release the underlying device.
    fn release(&mut self);
}

/// Turns a matched label into a credential.
pub trait CredentialExchange<L>: Sync {
    /// What the exchange hands back (e.g. a custom token).
    type Credential: Send;
    /// Exchange failure.
    type Error: std::error::Error + Send + 'static;

    /// Exchange a matched label for a credential.
    fn exchange(
        &self,
        label: &L,
    ) -> impl Future<Output = Result<Self::Credential, Self::Error>> + Send;
}

/// How the loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome<L, C> {
    /// A face matched and the exchange succeeded.
    Authenticated {
        label: L,
        distance: f32,
        credential: C,
    },
    /// The stop future completed first.
    Cancelled,
    /// The source ran dry without a match.
    SourceExhausted,
}

/// Errors that end the loop early.
#[derive(Debug, Error)]
pub enum FaceLoginError<E: std::error::Error + 'static> {
    /// There is nothing to match against.
    #[error("no faces registered")]
    NoFacesRegistered,
    /// The matched label could not be exchanged.
    #[error("credential exchange failed: {0}")]
    Exchange(#[source] E),
}

/// The face-login loop.
#[derive(Debug, Clone)]
pub struct FaceLoginLoop<L> {
    matcher: FaceMatcher<L>,
    interval: Duration,
}

impl<L> FaceLoginLoop<L>
where
    L: Clone + std::fmt::Display + Send + Sync,
{
    /// Create a loop over `matcher`, capturing every `interval`.
    #[must_use]
    pub const fn new(matcher: FaceMatcher<L>, interval: Duration) -> Self {
        Self { matcher, interval }
    }

    /// Run until a match, cancellation, or exhaustion.
    ///
    /// # Errors
    ///
    /// Returns `FaceLoginError::NoFacesRegistered` if the matcher is empty,
    /// or `FaceLoginError::Exchange` if the exchange for a matched face
    /// fails. `source` is released in every case.
    #[instrument(skip_all, fields(interval_ms = self.interval.as_millis()))]
    pub async fn run<S, X>(
        &self,
        source: &mut S,
        exchange: &X,
        stop: impl Future<Output = ()> + Send,
    ) -> Result<LoginOutcome<L, X::Credential>, FaceLoginError<X::Error>>
    where
        S: FrameSource,
        X: CredentialExchange<L>,
    {
        let result = if self.matcher.is_empty() {
            Err(FaceLoginError::NoFacesRegistered)
        } else {
            self.drive(source, exchange, stop).await
        };
        source.release();
        result
    }

    async fn drive<S, X>(
        &self,
        source: &mut S,
        exchange: &X,
        stop: impl Future<Output = ()> + Send,
    ) -> Result<LoginOutcome<L, X::Credential>, FaceLoginError<X::Error>>
    where
        S: FrameSource,
        X: CredentialExchange<L>,
    {
        tokio::pin!(stop);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = &mut stop => return Ok(LoginOutcome::Cancelled),
                _ = ticker.tick() => {}
            }

            let capture = tokio::select! {
                biased;
                () = &mut stop => return Ok(LoginOutcome::Cancelled),
                capture = source.next_capture() => capture,
            };

            let descriptor = match capture {
                Ok(Capture::Face(descriptor)) => descriptor,
                Ok(Capture::NoFace) => continue,
                Ok(Capture::Exhausted) => {
                    tracing::info!("Frame source exhausted without a match");
                    return Ok(LoginOutcome::SourceExhausted);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Frame capture failed");
                    continue;
                }
            };

            match self.matcher.best_match(&descriptor) {
                FaceMatch::Known { label, distance } => {
                    tracing::info!(%label, distance, "Face recognized");
                    let credential = exchange
                        .exchange(&label)
                        .await
                        .map_err(FaceLoginError::Exchange)?;
                    return Ok(LoginOutcome::Authenticated {
                        label,
                        distance,
                        credential,
                    });
                }
                FaceMatch::Unknown { distance } => {
                    tracing::debug!(?distance, "Face not recognized");
                }
            }
        }
    }
}
