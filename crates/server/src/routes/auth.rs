//! Sign-in, sign-out and custom-token routes.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use stockroom_core::{Email, FaceDescriptor};

use crate::db::UserRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::extract::Json;
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::AuthService;
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/custom-token", post(custom_token))
        .route("/api/auth/token", post(token_sign_in))
        .route("/api/auth/face", post(face_login))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Custom-token mint request. `email` is optional so a missing field is a
/// 400 rather than a body rejection.
#[derive(Debug, Deserialize)]
pub struct CustomTokenRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CustomTokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenSignInRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct FaceLoginRequest {
    pub descriptor: FaceDescriptor,
}

#[derive(Debug, Serialize)]
pub struct FaceLoginResponse {
    pub email: Email,
    pub token: String,
}

async fn start_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Create an account and sign it in.
#[instrument(skip_all, fields(email = %body.email))]
async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = AuthService::new(state.pool())
        .register(
            &body.email,
            Some(&body.password),
            body.display_name.as_deref(),
        )
        .await?;
    start_session(&session, &user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Email/password sign-in.
#[instrument(skip_all, fields(email = %body.email))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .login_with_password(&body.email, &body.password)
        .await?;
    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "Signed in with password");
    Ok(Json(user))
}

/// End the session.
async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in account.
async fn me(RequireAuth(current): RequireAuth, State(state): State<AppState>) -> Result<Json<User>> {
    UserRepository::new(state.pool())
        .get_by_id(current.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::Unauthorized("account no longer exists".to_string()))
}

/// Mint a custom token for the account with `email`.
#[instrument(skip_all)]
async fn custom_token(
    State(state): State<AppState>,
    Json(body): Json<CustomTokenRequest>,
) -> Result<Json<CustomTokenResponse>> {
    let email = body
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("email is required".to_string()))?;

    let user = AuthService::new(state.pool())
        .user_for_custom_token(&email)
        .await?;
    let token = state
        .tokens()
        .mint(user.id, &user.email)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(user_id = %user.id, "Custom token minted");
    Ok(Json(CustomTokenResponse { token }))
}

/// Exchange a custom token for a session.
#[instrument(skip_all)]
async fn token_sign_in(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<TokenSignInRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .sign_in_with_token(state.tokens(), &body.token)
        .await?;
    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "Signed in with custom token");
    Ok(Json(user))
}

/// Match one descriptor and, on success, mint a custom token.
#[instrument(skip_all)]
async fn face_login(
    State(state): State<AppState>,
    Json(body): Json<FaceLoginRequest>,
) -> Result<Json<FaceLoginResponse>> {
    let user = AuthService::new(state.pool())
        .login_with_face(state.config().face_threshold, &body.descriptor)
        .await?
        .ok_or_else(|| AppError::Unauthorized("face not recognized".to_string()))?;

    let token = state
        .tokens()
        .mint(user.id, &user.email)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(FaceLoginResponse {
        email: user.email,
        token,
    }))
}
