// ABOUTME: Server-side token exchange service turning an authorization code into a normalized profile
// ABOUTME: Holds the confidential client secrets; never caches codes, tokens or profiles

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    error::{AuthError, AuthResult},
    oauth::{
        adapters::read_access_token,
        provider::OAuthProvider,
        registry::{ProviderConfig, ProviderRegistry},
        types::{AccessToken, ExchangeOutcome, NormalizedUserProfile, ProviderIdentity},
    },
};

/// Default timeout for each upstream provider call
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Token exchange service for the relay server
#[derive(Clone)]
pub struct TokenExchangeService {
    registry: Arc<ProviderRegistry>,
    client: Client,
}

impl TokenExchangeService {
    /// Create a service with the default upstream timeout
    pub fn new(registry: Arc<ProviderRegistry>) -> AuthResult<Self> {
        Self::with_timeout(registry, DEFAULT_UPSTREAM_TIMEOUT)
    }

    /// Create a service whose upstream calls give up after `timeout`
    pub fn with_timeout(registry: Arc<ProviderRegistry>, timeout: Duration) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            // GitHub rejects API calls without a User-Agent
            .user_agent(concat!("pr4kh4r-auth/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuthError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { registry, client })
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Exchange an authorization code for the caller's normalized profile
    ///
    /// This will:
    /// 1. Exchange the code at the provider's token endpoint
    /// 2. Fetch the user profile with the access token
    /// 3. Normalize it (GitHub may need a second call for the email)
    ///
    /// Codes are single-use; a replayed code goes to the provider again and
    /// its rejection is returned as `TokenExchangeFailed`.
    pub async fn exchange(&self, provider: OAuthProvider, code: &str) -> AuthResult<ExchangeOutcome> {
        info!("Received {} OAuth callback with code", provider);

        if code.trim().is_empty() {
            return Err(AuthError::MissingAuthorizationCode);
        }

        let config = self.configured(provider)?;
        let access_token = self.exchange_code_for_token(config, code).await?;
        debug!("Got access token, fetching user info");

        let user = provider
            .adapter()
            .fetch_identity(&self.client, config, &access_token)
            .await?
            .profile;

        info!("✅ {} user data fetched for {}", provider, user.email);
        Ok(ExchangeOutcome { user, access_token })
    }

    /// Resolve the account behind an access token the client already holds
    pub async fn fetch_profile(
        &self,
        provider: OAuthProvider,
        access_token: &AccessToken,
    ) -> AuthResult<NormalizedUserProfile> {
        Ok(self.fetch_identity(provider, access_token).await?.profile)
    }

    /// Like `fetch_profile`, keeping whether the provider verified the email
    pub async fn fetch_identity(
        &self,
        provider: OAuthProvider,
        access_token: &AccessToken,
    ) -> AuthResult<ProviderIdentity> {
        let config = self.configured(provider)?;
        provider
            .adapter()
            .fetch_identity(&self.client, config, access_token)
            .await
    }

    fn configured(&self, provider: OAuthProvider) -> AuthResult<&ProviderConfig> {
        let config = self.registry.config_for(provider)?;
        if !config.is_configured() {
            return Err(AuthError::Configuration(format!(
                "{} OAuth credentials are not configured",
                provider
            )));
        }
        Ok(config)
    }

    async fn exchange_code_for_token(
        &self,
        config: &ProviderConfig,
        code: &str,
    ) -> AuthResult<AccessToken> {
        let response = config
            .provider
            .adapter()
            .token_request(&self.client, config, code)
            .send()
            .await
            .map_err(|e| {
                AuthError::UpstreamUnavailable(format!("Failed to exchange code: {}", e))
            })?;

        read_access_token(response).await
    }
}
