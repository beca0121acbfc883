// ABOUTME: Provider registry mapping provider identifiers to client credentials and endpoints
// ABOUTME: Loaded once from the environment; only the public projection is shared with browsers

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::{
    error::{AuthError, AuthResult},
    oauth::{provider::OAuthProvider, types::ClientSecret},
};

/// Server-side configuration for one identity provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: OAuthProvider,
    pub client_id: String,
    pub client_secret: ClientSecret,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    /// Must exactly match the value registered with the provider
    pub redirect_uri: String,
    pub scope: String,
    pub user_info_endpoint: String,
    pub user_emails_endpoint: Option<String>,
}

impl ProviderConfig {
    /// Configuration using the provider's well-known endpoints and default scope
    pub fn new(
        provider: OAuthProvider,
        client_id: impl Into<String>,
        client_secret: ClientSecret,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            client_id: client_id.into(),
            client_secret,
            authorization_endpoint: provider.authorization_endpoint().to_string(),
            token_endpoint: provider.token_endpoint().to_string(),
            redirect_uri: redirect_uri.into(),
            scope: provider.default_scope().to_string(),
            user_info_endpoint: provider.user_info_endpoint().to_string(),
            user_emails_endpoint: provider.user_emails_endpoint().map(str::to_string),
        }
    }

    /// Both halves of the client credentials are present
    pub fn is_configured(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.is_empty()
    }

    pub fn public(&self) -> PublicProviderConfig {
        PublicProviderConfig {
            provider: self.provider,
            client_id: self.client_id.clone(),
            redirect_uri: self.redirect_uri.clone(),
            scope: self.scope.clone(),
            authorization_endpoint: self.authorization_endpoint.clone(),
        }
    }
}

/// The subset of a provider's configuration a browser may see
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProviderConfig {
    pub provider: OAuthProvider,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub authorization_endpoint: String,
}

impl PublicProviderConfig {
    /// Client-side configuration from variables such as `GOOGLE_CLIENT_ID`
    /// (or the `VITE_` prefixed names the web build uses)
    pub fn from_vars<F>(provider: OAuthProvider, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = provider.env_prefix();
        let var = |name: &str| {
            lookup(&format!("{}_{}", prefix, name))
                .or_else(|| lookup(&format!("VITE_{}_{}", prefix, name)))
                .filter(|value| !value.trim().is_empty())
        };

        Self {
            provider,
            client_id: var("CLIENT_ID").unwrap_or_default(),
            redirect_uri: var("REDIRECT_URI")
                .unwrap_or_else(|| provider.default_redirect_uri().to_string()),
            scope: provider.default_scope().to_string(),
            authorization_endpoint: provider.authorization_endpoint().to_string(),
        }
    }

    pub fn from_env(provider: OAuthProvider) -> Self {
        Self::from_vars(provider, |key| std::env::var(key).ok())
    }
}

/// Immutable lookup table of provider configurations
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    configs: HashMap<OAuthProvider, ProviderConfig>,
}

impl ProviderRegistry {
    pub fn new(configs: impl IntoIterator<Item = ProviderConfig>) -> Self {
        Self {
            configs: configs
                .into_iter()
                .map(|config| (config.provider, config))
                .collect(),
        }
    }

    /// Load every supported provider from the process environment
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load every supported provider through an arbitrary variable lookup
    ///
    /// Missing credentials are reported once here; exchanges against such a
    /// provider fail with a configuration error.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let configs = OAuthProvider::all().into_iter().map(|provider| {
            let public = PublicProviderConfig::from_vars(provider, &lookup);
            let secret = lookup(&format!("{}_CLIENT_SECRET", provider.env_prefix()))
                .map(ClientSecret::new)
                .unwrap_or_default();

            let mut config =
                ProviderConfig::new(provider, public.client_id, secret, public.redirect_uri);
            config.scope = public.scope;

            if !config.is_configured() {
                warn!(
                    provider = %provider,
                    "OAuth credentials missing; set {}_CLIENT_ID and {}_CLIENT_SECRET",
                    provider.env_prefix(),
                    provider.env_prefix()
                );
            }
            config
        });

        Self::new(configs)
    }

    /// Look up a provider's configuration
    pub fn config_for(&self, provider: OAuthProvider) -> AuthResult<&ProviderConfig> {
        self.configs
            .get(&provider)
            .ok_or_else(|| AuthError::UnknownProvider(provider.to_string()))
    }

    /// Look up a provider by its textual identifier
    pub fn resolve(&self, identifier: &str) -> AuthResult<&ProviderConfig> {
        self.config_for(identifier.parse()?)
    }

    pub fn public_config(&self, provider: OAuthProvider) -> AuthResult<PublicProviderConfig> {
        self.config_for(provider).map(ProviderConfig::public)
    }

    /// Public projections of all registered providers, in a stable order
    pub fn public_configs(&self) -> Vec<PublicProviderConfig> {
        OAuthProvider::all()
            .into_iter()
            .filter_map(|provider| self.configs.get(&provider))
            .map(ProviderConfig::public)
            .collect()
    }

    pub fn providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.configs.values()
    }
}
