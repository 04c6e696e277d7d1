//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                        - Liveness
//! GET    /health/ready                  - Readiness (database reachable)
//!
//! # Auth
//! POST   /api/auth/register             - Create an account
//! POST   /api/auth/login                - Email/password sign-in
//! POST   /api/auth/logout               - Sign out
//! GET    /api/auth/me                   - Current user
//! POST   /api/auth/custom-token         - Mint a custom token for an email
//! POST   /api/auth/token                - Sign in with a custom token
//! POST   /api/auth/face                 - Match a face descriptor, mint a token
//!
//! # Profile
//! PUT    /api/profile/face              - Enroll own face descriptor
//! DELETE /api/profile/face              - Remove own face descriptor
//!
//! # Products
//! GET    /api/products                  - List (?order=name|newest)
//! POST   /api/products                  - Create
//! GET    /api/products/{id}             - Get one
//! PATCH  /api/products/{id}             - Edit
//! DELETE /api/products/{id}             - Delete (and its image)
//!
//! # Objects
//! POST   /api/uploads                   - Upload a product image
//! GET    /objects/{*key}                - Signed download
//!
//! # Sales
//! POST   /api/sales                     - Commit a sale
//! GET    /api/sales/{id}                - Sale with items
//! GET    /api/sales/{id}/invoice        - PDF invoice
//!
//! # Reports
//! GET    /api/reports/sales             - XLSX sales value report
//! GET    /api/reports/stock             - XLSX stock report
//! GET    /api/reports/customers/{id}    - XLSX purchases of one customer
//! ```

pub mod auth;
pub mod objects;
pub mod products;
pub mod profile;
pub mod reports;
pub mod sales;
pub mod uploads;

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::state::AppState;

/// Build the complete router.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(auth::router())
        .merge(profile::router())
        .merge(products::router())
        .merge(uploads::router(max_upload_bytes))
        .merge(objects::router())
        .merge(sales::router())
        .merge(reports::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// A file download with `Content-Disposition: attachment`.
pub(crate) fn attachment(content_type: &'static str, file_name: &str, body: Vec<u8>) -> Response {
    let disposition = content_disposition(file_name);
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name.
fn content_disposition(file_name: &str) -> HeaderValue {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut encoded = String::with_capacity(file_name.len());
    for byte in file_name.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'-' | b'_' | b'~') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }

    let value = format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}");
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("stock_report.xlsx"),
            "attachment; filename=\"stock_report.xlsx\"; filename*=UTF-8''stock_report.xlsx"
        );
    }

    #[test]
    fn test_content_disposition_utf8() {
        assert_eq!(
            content_disposition("invoice_Ana_Pérez.pdf"),
            "attachment; filename=\"invoice_Ana_P_rez.pdf\"; \
             filename*=UTF-8''invoice_Ana_P%C3%A9rez.pdf"
        );
    }

    #[test]
    fn test_attachment_headers() {
        let response = attachment("application/pdf", "a.pdf", b"%PDF".to_vec());
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert!(
            response.headers()[header::CONTENT_DISPOSITION]
                .to_str()
                .unwrap()
                .starts_with("attachment;")
        );
    }
}
