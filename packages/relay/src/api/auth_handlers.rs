// ABOUTME: HTTP request handlers for the OAuth relay
// ABOUTME: Code exchange per provider, public provider listing and password sign-in endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{extract::JsonBody, AppState};
use crate::error::{ApiResult, AppError};
use pr4kh4r_auth::{
    credentials::validate_password, AccessToken, ExchangeOutcome, NormalizedUserProfile,
    OAuthProvider, PublicProviderConfig,
};

/// Body of a callback relay request
#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    #[serde(default)]
    pub code: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPasswordRequest {
    pub access_token: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct EmailLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: NormalizedUserProfile,
}

/// Exchange an authorization code for a normalized profile
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    JsonBody(request): JsonBody<CallbackRequest>,
) -> ApiResult<Json<ExchangeOutcome>> {
    let provider: OAuthProvider = provider.parse()?;
    info!("📥 Received {} OAuth callback", provider);

    let outcome = state.exchange.exchange(provider, &request.code).await?;
    Ok(Json(outcome))
}

/// List client-safe provider configurations
pub async fn list_providers(State(state): State<AppState>) -> Json<Vec<PublicProviderConfig>> {
    Json(state.exchange.registry().public_configs())
}

/// Set a password for the account behind the caller's access token
pub async fn set_password(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    JsonBody(request): JsonBody<SetPasswordRequest>,
) -> ApiResult<StatusCode> {
    let provider: OAuthProvider = provider.parse()?;
    validate_password(&request.password)?;

    // The token proves which account is asking; the email is never taken from the body
    let access_token = AccessToken::new(request.access_token);
    let identity = state.exchange.fetch_identity(provider, &access_token).await?;
    state.vault.set_password(&identity, &request.password).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Email + password sign-in
pub async fn email_login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<EmailLoginRequest>,
) -> ApiResult<Json<UserResponse>> {
    if request.email.trim().is_empty() {
        return Err(AppError::validation("Email is required"));
    }
    info!("Email login attempt");
    let user = state.vault.login(&request.email, &request.password).await?;
    Ok(Json(UserResponse { user }))
}
