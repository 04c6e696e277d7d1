//! User accounts.

use chrono::{DateTime, Utc};
use serde::Serialize;

use stockroom_core::{Email, UserId};

use super::CurrentUser;

/// A user account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub display_name: String,
    /// Whether a face descriptor is enrolled.
    pub has_face: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
        }
    }
}
