// ABOUTME: Strategy table of per-provider request building and profile normalization
// ABOUTME: Adding a provider means one OAuthProvider variant plus one ProviderAdapter impl

mod github;
mod google;

pub use github::GitHubAdapter;
pub use google::GoogleAdapter;

use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::error;

use crate::{
    error::{AuthError, AuthResult},
    oauth::{
        registry::ProviderConfig,
        types::{AccessToken, ProviderIdentity, TokenResponse},
    },
};

/// Provider-specific halves of the authorization-code flow
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Query parameters appended to the consent URL after the standard ones
    fn extra_authorization_params(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Build the code-for-token request in the shape this provider expects
    fn token_request(&self, client: &Client, config: &ProviderConfig, code: &str)
        -> RequestBuilder;

    /// Fetch the account behind `token`, normalize it and report whether
    /// the provider has verified its email
    async fn fetch_identity(
        &self,
        client: &Client,
        config: &ProviderConfig,
        token: &AccessToken,
    ) -> AuthResult<ProviderIdentity>;
}

/// Pull the access token out of a token endpoint response
///
/// Providers report a rejected code (reused, expired, redirect mismatch) as a
/// body without `access_token`, sometimes with a 200 status. The provider's
/// own `error_description` is surfaced to the caller.
pub(crate) async fn read_access_token(response: Response) -> AuthResult<AccessToken> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AuthError::UpstreamUnavailable(format!("Failed to read token response: {}", e)))?;

    let tokens: TokenResponse = match serde_json::from_str(&body) {
        Ok(tokens) => tokens,
        Err(e) if status.is_success() => {
            return Err(AuthError::MalformedUpstreamResponse(format!(
                "Failed to parse token response: {}",
                e
            )));
        }
        Err(_) => {
            error!("Token endpoint failed with status {}", status);
            return Err(AuthError::UpstreamUnavailable(format!(
                "Token endpoint failed with status {}",
                status
            )));
        }
    };

    match tokens.access_token.filter(|token| !token.is_empty()) {
        Some(token) => Ok(AccessToken::new(token)),
        None => {
            // Don't leak the full response body, only the provider's diagnostics
            error!(
                status = %status,
                error = tokens.error.as_deref().unwrap_or("none"),
                "Failed to get access token"
            );
            Err(AuthError::TokenExchangeFailed(
                tokens
                    .error_description
                    .unwrap_or_else(|| "Failed to get access token".to_string()),
            ))
        }
    }
}

/// GET a JSON resource with the bearer token
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    token: &AccessToken,
    what: &str,
) -> AuthResult<T> {
    let response = client
        .get(url)
        .bearer_auth(token.secret())
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| AuthError::UpstreamUnavailable(format!("Failed to fetch {}: {}", what, e)))?;

    let status = response.status();
    if !status.is_success() {
        error!("Fetching {} failed with status {}", what, status);
        return Err(AuthError::UpstreamUnavailable(format!(
            "Fetching {} failed with status {}",
            what, status
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| AuthError::MalformedUpstreamResponse(format!("Failed to parse {}: {}", what, e)))
}

/// Treat empty strings from provider payloads as absent
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
