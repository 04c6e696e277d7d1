//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a cashier account with a password
//! stockroom user create -e cashier@store.test -n "Front Till" -p 'long passphrase'
//!
//! # Create an account that signs in by face only
//! stockroom user create -e cashier@store.test
//!
//! # Enroll a face descriptor (a JSON array of 128 numbers)
//! stockroom user enroll-face -e cashier@store.test -f descriptor.json
//! ```

use std::path::Path;

use thiserror::Error;

use stockroom_core::{DescriptorError, Email, EmailError, FaceDescriptor, UserId};
use stockroom_server::db::{RepositoryError, UserRepository};
use stockroom_server::services::{AuthError, AuthService};

use super::{ConnectError, connect};

/// Errors from account commands.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("No account with email: {0}")]
    NotFound(String),

    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Descriptor file is not a JSON number array: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid descriptor: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create an account.
///
/// # Returns
///
/// The ID of the created account.
pub async fn create(
    email: &str,
    name: Option<&str>,
    password: Option<&str>,
) -> Result<UserId, UserError> {
    let pool = connect().await?;

    let user = AuthService::new(&pool)
        .register(email, password, name)
        .await?;

    tracing::info!(
        "Account created! ID: {}, Email: {}, Name: {}",
        user.id,
        user.email,
        user.display_name
    );
    if password.is_none() {
        tracing::warn!(
            "Account has no password. Enroll a face with 'user enroll-face' so it can sign in."
        );
    }
    Ok(user.id)
}

/// Read a descriptor file.
pub fn read_descriptor(path: &Path) -> Result<FaceDescriptor, UserError> {
    let raw = std::fs::read_to_string(path).map_err(|source| UserError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let values: Vec<f32> = serde_json::from_str(&raw)?;
    Ok(FaceDescriptor::new(values)?)
}

/// Store a face descriptor for an existing account, replacing any previous one.
pub async fn enroll_face(email: &str, descriptor_path: &Path) -> Result<(), UserError> {
    let email = Email::parse(email)?;
    let descriptor = read_descriptor(descriptor_path)?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);
    let user = users
        .get_by_email(&email)
        .await?
        .ok_or_else(|| UserError::NotFound(email.to_string()))?;

    users.set_face_descriptor(user.id, &descriptor).await?;
    tracing::info!("Face enrolled for {} (ID: {})", user.email, user.id);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use stockroom_core::face::DESCRIPTOR_LEN;

    use super::*;

    #[test]
    fn test_read_descriptor() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let values = vec![0.25_f32; DESCRIPTOR_LEN];
        write!(file, "{}", serde_json::to_string(&values).unwrap()).unwrap();

        let descriptor = read_descriptor(file.path()).unwrap();
        assert_eq!(descriptor.as_slice(), values.as_slice());
    }

    #[test]
    fn test_read_descriptor_wrong_length() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[0.1, 0.2]").unwrap();

        assert!(matches!(
            read_descriptor(file.path()),
            Err(UserError::Descriptor(DescriptorError::WrongLength(2)))
        ));
    }

    #[test]
    fn test_read_descriptor_missing_file() {
        assert!(matches!(
            read_descriptor(Path::new("/nonexistent/descriptor.json")),
            Err(UserError::Read { .. })
        ));
    }
}
