//! User and face profile repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use stockroom_core::{Email, FaceDescriptor, LabeledDescriptors, UserId};

use super::{RepositoryError, map_unique_violation};
use crate::models::User;

const USER_COLUMNS: &str = "u.id, u.email, u.display_name, u.created_at, u.updated_at, \
     EXISTS (SELECT 1 FROM stockroom.face_profile f WHERE f.user_id = u.id) AS has_face";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: Email,
    display_name: String,
    has_face: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::new(row.id),
            email: row.email,
            display_name: row.display_name,
            has_face: row.has_face,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: Option<String>,
}

#[derive(sqlx::FromRow)]
struct FaceRow {
    email: Email,
    descriptor: Vec<f32>,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, password_hash), fields(email = %email))]
    pub async fn create(
        &self,
        email: &Email,
        display_name: &str,
        password_hash: Option<&str>,
    ) -> Result<User, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO stockroom.app_user (email, display_name, password_hash) \
             VALUES ($1, $2, $3) \
             RETURNING id",
        )
        .bind(email)
        .bind(display_name)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "email already exists"))?;

        self.get_by_id(UserId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM stockroom.app_user u WHERE u.id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    /// Get a user by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM stockroom.app_user u WHERE u.email = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    /// Get a user and their password hash (if a password is set).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, Option<String>)>, RepositoryError> {
        let sql = format!(
            "SELECT {USER_COLUMNS}, u.password_hash FROM stockroom.app_user u WHERE u.email = $1"
        );
        let row = sqlx::query_as::<_, UserWithHashRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|r| (User::from(r.user), r.password_hash)))
    }

    /// Store (or replace) a user's face descriptor.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    #[instrument(skip(self, descriptor), fields(user_id = %user_id))]
    pub async fn set_face_descriptor(
        &self,
        user_id: UserId,
        descriptor: &FaceDescriptor,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO stockroom.face_profile (user_id, descriptor) \
             VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE \
             SET descriptor = EXCLUDED.descriptor, updated_at = now()",
        )
        .bind(user_id)
        .bind(descriptor.as_slice())
        .execute(self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                RepositoryError::NotFound
            }
            other => RepositoryError::Database(other),
        })?;

        tracing::info!("Face descriptor stored");
        Ok(())
    }

    /// Remove a user's face descriptor. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn delete_face_descriptor(&self, user_id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM stockroom.face_profile WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All enrolled face descriptors, labelled by account email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored descriptor is
    /// no longer valid.
    #[instrument(skip(self))]
    pub async fn labeled_descriptors(
        &self,
    ) -> Result<Vec<LabeledDescriptors<Email>>, RepositoryError> {
        let rows = sqlx::query_as::<_, FaceRow>(
            "SELECT u.email, f.descriptor \
             FROM stockroom.face_profile f \
             JOIN stockroom.app_user u ON u.id = f.user_id \
             ORDER BY u.id",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let descriptor = FaceDescriptor::new(row.descriptor).map_err(|e| {
                    RepositoryError::DataCorruption(format!(
                        "invalid face descriptor for {}: {e}",
                        row.email
                    ))
                })?;
                Ok(LabeledDescriptors::single(row.email, descriptor))
            })
            .collect()
    }
}
