//! Authentication service.
//!
//! Email/password accounts, custom-token minting and sign-in, and a
//! single-shot face match against every enrolled profile.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use tracing::instrument;

use stockroom_core::{Email, FaceDescriptor, FaceMatch, FaceMatcher};

use crate::db::RepositoryError;
use crate::db::UserRepository;
use crate::models::User;
use crate::services::token::TokenSigner;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new account.
    ///
    /// Without a password the account can only sign in by custom token or
    /// face. The display name defaults to the email's local part.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let password_hash = match password {
            Some(password) => {
                validate_password(password)?;
                Some(hash_password(password)?)
            }
            None => None,
        };

        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| default_display_name(&email));

        let user = self
            .users
            .create(&email, display_name, password_hash.as_deref())
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "Account registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login_with_password(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let password_hash = password_hash.ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, &password_hash)?;

        Ok(user)
    }

    // =========================================================================
    // Custom tokens
    // =========================================================================

    /// Look up the account a custom token is being minted for.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email is blank or malformed.
    /// Returns `AuthError::UserNotFound` if no account has that email.
    #[instrument(skip(self))]
    pub async fn user_for_custom_token(&self, email: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        self.users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Exchange a custom token for the account it was minted for.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is malformed, forged or
    /// expired, and `AuthError::UserNotFound` if the account has since been
    /// removed or changed its email.
    #[instrument(skip_all)]
    pub async fn sign_in_with_token(
        &self,
        signer: &TokenSigner,
        token: &str,
    ) -> Result<User, AuthError> {
        let claims = signer.verify_token(token)?;
        let user = self
            .users
            .get_by_id(claims.uid)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.email != claims.email {
            return Err(AuthError::UserNotFound);
        }
        Ok(user)
    }

    // =========================================================================
    // Face login
    // =========================================================================

    /// Match one descriptor against every enrolled face.
    ///
    /// Returns `None` when no profile is within `threshold`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NoFacesRegistered` if nobody has enrolled a face.
    #[instrument(skip(self, descriptor))]
    pub async fn login_with_face(
        &self,
        threshold: f32,
        descriptor: &FaceDescriptor,
    ) -> Result<Option<User>, AuthError> {
        let labeled = self.users.labeled_descriptors().await?;
        let matcher = FaceMatcher::new(labeled, threshold);
        if matcher.is_empty() {
            return Err(AuthError::NoFacesRegistered);
        }

        match matcher.best_match(descriptor) {
            FaceMatch::Known { label, distance } => {
                tracing::info!(email = %label, distance, "Face recognized");
                Ok(self.users.get_by_email(&label).await?)
            }
            FaceMatch::Unknown { distance } => {
                tracing::info!(?distance, "Face not recognized");
                Ok(None)
            }
        }
    }
}

fn default_display_name(email: &Email) -> &str {
    email
        .as_str()
        .split_once('@')
        .map_or(email.as_str(), |(local, _)| local)
}

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
        // Counted in characters, not bytes
        assert!(validate_password("ñññññññ").is_err());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_default_display_name() {
        let email = Email::parse("Cashier.One@Store.test").unwrap();
        assert_eq!(default_display_name(&email), "cashier.one");
    }
}
