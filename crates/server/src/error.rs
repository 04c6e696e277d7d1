//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry and answered with a generic message; client errors
//! carry their message in a JSON `{"error": ...}` body.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use stockroom_core::SaleCommitError;

use crate::db::RepositoryError;
use crate::db::sales::CommitError;
use crate::services::auth::AuthError;
use crate::services::invoice::InvoiceError;
use crate::services::reports::ReportError;
use crate::services::storage::StorageError;

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Object store operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// The sale could not be committed against current stock.
    #[error("{0}")]
    SaleRejected(#[from] SaleCommitError),

    /// Report generation failed.
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Invoice rendering failed.
    #[error("Invoice error: {0}")]
    Invoice(#[from] InvoiceError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Body, path or query could not be extracted.
    #[error("Invalid request: {message}")]
    Extract { status: StatusCode, message: String },

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CommitError> for AppError {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::Rejected(e) => Self::SaleRejected(e),
            CommitError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match &rejection {
            JsonRejection::JsonDataError(_) => StatusCode::BAD_REQUEST,
            _ => rejection.status(),
        };
        Self::Extract {
            status,
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Extract {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Extract {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

const INTERNAL: &str = "Internal server error";

fn repository_response(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
        }
    }
}

impl AppError {
    /// Status code and client-facing message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Database(err) => repository_response(err),
            Self::Storage(err) => match err {
                StorageError::NotFound => (StatusCode::NOT_FOUND, "Object not found".to_string()),
                StorageError::InvalidKey(_) => {
                    (StatusCode::BAD_REQUEST, "Invalid object key".to_string())
                }
                StorageError::BadSignature | StorageError::Expired => {
                    (StatusCode::FORBIDDEN, err.to_string())
                }
                StorageError::Io(_) | StorageError::Signing(_) => {
                    (StatusCode::BAD_GATEWAY, "Object storage error".to_string())
                }
            },
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, "Invalid email address".to_string())
                }
                AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
                }
                AuthError::InvalidToken(_) => (
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired token".to_string(),
                ),
                AuthError::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
                AuthError::NoFacesRegistered => {
                    (StatusCode::NOT_FOUND, "No faces registered".to_string())
                }
                AuthError::UserAlreadyExists => (
                    StatusCode::CONFLICT,
                    "An account with this email already exists".to_string(),
                ),
                AuthError::Repository(inner) => repository_response(inner),
                AuthError::PasswordHash => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
                }
            },
            Self::SaleRejected(err) => (StatusCode::CONFLICT, err.to_string()),
            Self::Report(_) | Self::Invoice(_) | Self::Session(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
            }
            Self::Extract { status, message } => (*status, message.clone()),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("sale 12".to_string());
        assert_eq!(err.to_string(), "Not found: sale 12");

        let err = AppError::SaleRejected(SaleCommitError::InsufficientStock {
            name: "Soap".to_string(),
            requested: 3,
            available: 1,
        });
        assert_eq!(err.to_string(), "Insufficient stock for Soap.");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Conflict("test".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_domain_error_status_codes() {
        assert_eq!(
            get_status(SaleCommitError::ProductMissing {
                name: "Soap".to_string()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(CommitError::Repository(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(get_status(StorageError::Expired), StatusCode::FORBIDDEN);
        assert_eq!(get_status(StorageError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(StorageError::Io(std::io::Error::other("disk"))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AuthError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(get_status(AuthError::UserNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(AuthError::UserAlreadyExists),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AuthError::Repository(RepositoryError::Conflict(
                "x".to_string()
            ))),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_internal_details_hidden() {
        let (_, message) =
            AppError::Database(RepositoryError::DataCorruption("secret".to_string()))
                .status_and_message();
        assert_eq!(message, INTERNAL);

        let (_, message) = AppError::from(StorageError::Io(std::io::Error::other("/var/x")))
            .status_and_message();
        assert_eq!(message, "Object storage error");
    }
}
