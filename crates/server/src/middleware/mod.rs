//! HTTP middleware for the server.
//!
//! - `session` - tower-sessions layer backed by `PostgreSQL`
//! - `auth` - Extractors that read the signed-in user from the session

pub mod auth;
pub mod session;

pub use auth::{RequireAuth, clear_current_user, set_current_user};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
