// ABOUTME: Client-side authentication flow controller driving the two-leg redirect dance
// ABOUTME: Builds consent URLs, handles the return redirect once per code and hands off to the relay

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use url::Url;

use crate::{
    error::{AuthError, AuthResult},
    oauth::{
        exchange::TokenExchangeService,
        provider::OAuthProvider,
        registry::PublicProviderConfig,
        types::{AccessToken, ExchangeOutcome, NormalizedUserProfile},
    },
};

/// Query parameters that must not survive a return redirect
const CALLBACK_PARAMS: &[&str] = &["code", "state", "error", "error_description", "error_uri"];

/// Recently exchanged codes remembered by the once-per-code guard
const HANDLED_CODE_CAPACITY: usize = 16;

/// Default relay address used by the web client
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3031";

/// Anything that can turn `(provider, code)` into a normalized profile
#[async_trait]
pub trait CodeExchanger: Send + Sync {
    async fn exchange(&self, provider: OAuthProvider, code: &str) -> AuthResult<ExchangeOutcome>;
}

#[async_trait]
impl CodeExchanger for TokenExchangeService {
    async fn exchange(&self, provider: OAuthProvider, code: &str) -> AuthResult<ExchangeOutcome> {
        TokenExchangeService::exchange(self, provider, code).await
    }
}

/// Full-page navigation to the provider's consent screen
pub trait Browser: Send + Sync {
    fn navigate(&self, url: &Url) -> AuthResult<()>;
}

/// Opens consent URLs in the user's default browser
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn navigate(&self, url: &Url) -> AuthResult<()> {
        open::that(url.as_str()).map_err(|e| {
            error!("Failed to open browser: {}", e);
            AuthError::BrowserOpen(format!(
                "Failed to open browser. Please manually visit: {}",
                url
            ))
        })
    }
}

/// HTTP client for the relay's exchange and password endpoints
#[derive(Clone)]
pub struct RelayClient {
    client: Client,
    backend_url: String,
}

#[derive(Serialize)]
struct CodeRequest<'a> {
    code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SetPasswordRequest<'a> {
    access_token: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct EmailLoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct UserResponse {
    user: NormalizedUserProfile,
}

#[derive(Deserialize)]
struct RelayErrorBody {
    error: String,
}

impl RelayClient {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            backend_url: backend_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Relay address from `BACKEND_URL` (or `VITE_BACKEND_URL`)
    pub fn from_env() -> Self {
        let backend_url = std::env::var("BACKEND_URL")
            .or_else(|_| std::env::var("VITE_BACKEND_URL"))
            .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());
        Self::new(backend_url)
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    /// Store a password for the account behind `access_token`
    pub async fn set_password(
        &self,
        provider: OAuthProvider,
        access_token: &AccessToken,
        password: &str,
    ) -> AuthResult<()> {
        let url = format!("{}/api/auth/{}/password", self.backend_url, provider);
        let response = self
            .client
            .post(&url)
            .json(&SetPasswordRequest {
                access_token: access_token.secret(),
                password,
            })
            .send()
            .await
            .map_err(|e| AuthError::UpstreamUnavailable(format!("Relay unreachable: {}", e)))?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::relay_error(response, Some(provider)).await)
    }

    /// Email + password sign-in against credentials stored on the relay
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> AuthResult<NormalizedUserProfile> {
        let url = format!("{}/api/auth/email/login", self.backend_url);
        let response = self
            .client
            .post(&url)
            .json(&EmailLoginRequest { email, password })
            .send()
            .await
            .map_err(|e| AuthError::UpstreamUnavailable(format!("Relay unreachable: {}", e)))?;

        if response.status().is_success() {
            return Ok(response.json::<UserResponse>().await?.user);
        }
        Err(Self::relay_error(response, None).await)
    }

    /// Map a relay error response back onto the error the relay reported
    async fn relay_error(response: reqwest::Response, provider: Option<OAuthProvider>) -> AuthError {
        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED => return AuthError::InvalidCredentials,
            StatusCode::FORBIDDEN => return AuthError::UnverifiedEmail,
            StatusCode::CONFLICT => return AuthError::EmailAlreadyClaimed,
            StatusCode::NOT_FOUND => {
                if let Some(provider) = provider {
                    return AuthError::UnknownProvider(provider.to_string());
                }
            }
            _ => {}
        }

        match response.json::<RelayErrorBody>().await {
            Ok(body) if status == StatusCode::BAD_REQUEST => AuthError::InvalidPassword(body.error),
            Ok(body) => AuthError::UpstreamUnavailable(body.error),
            Err(_) => AuthError::UpstreamUnavailable(format!("Relay failed with status {}", status)),
        }
    }
}

#[async_trait]
impl CodeExchanger for RelayClient {
    async fn exchange(&self, provider: OAuthProvider, code: &str) -> AuthResult<ExchangeOutcome> {
        let url = format!("{}/api/auth/{}/callback", self.backend_url, provider);
        let response = self
            .client
            .post(&url)
            .json(&CodeRequest { code })
            .send()
            .await
            .map_err(|e| {
                warn!("Make sure the relay server is running on {}", self.backend_url);
                AuthError::UpstreamUnavailable(format!("Relay unreachable: {}", e))
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AuthError::UnknownProvider(provider.to_string()));
        }
        if !status.is_success() {
            return Err(match response.json::<RelayErrorBody>().await {
                Ok(body) => AuthError::TokenExchangeFailed(body.error),
                Err(_) => AuthError::UpstreamUnavailable(format!(
                    "Backend OAuth exchange failed with status {}",
                    status
                )),
            });
        }

        response.json::<ExchangeOutcome>().await.map_err(|e| {
            AuthError::MalformedUpstreamResponse(format!("Failed to parse relay response: {}", e))
        })
    }
}

/// How a return redirect resolved
#[derive(Debug)]
pub struct CallbackOutcome {
    pub provider: OAuthProvider,
    pub result: AuthResult<ExchangeOutcome>,
    /// The arrival URL with `code`/`state`/`error` removed, for history replacement
    pub clean_url: Url,
}

impl CallbackOutcome {
    pub fn profile(&self) -> Option<&NormalizedUserProfile> {
        self.result.as_ref().ok().map(|outcome| &outcome.user)
    }

    pub fn into_profile(self) -> Option<NormalizedUserProfile> {
        self.result.ok().map(|outcome| outcome.user)
    }
}

/// Client-side orchestrator of the OAuth redirect flow
pub struct AuthFlowController {
    providers: HashMap<OAuthProvider, PublicProviderConfig>,
    exchanger: Arc<dyn CodeExchanger>,
    browser: Arc<dyn Browser>,
    handled_codes: Mutex<VecDeque<String>>,
}

impl AuthFlowController {
    pub fn new(
        providers: impl IntoIterator<Item = PublicProviderConfig>,
        exchanger: Arc<dyn CodeExchanger>,
        browser: Arc<dyn Browser>,
    ) -> Self {
        Self {
            providers: providers
                .into_iter()
                .map(|config| (config.provider, config))
                .collect(),
            exchanger,
            browser,
            handled_codes: Mutex::new(VecDeque::with_capacity(HANDLED_CODE_CAPACITY)),
        }
    }

    /// Controller configured from the environment, talking to the relay and system browser
    pub fn from_env() -> Self {
        Self::new(
            OAuthProvider::all()
                .into_iter()
                .map(PublicProviderConfig::from_env),
            Arc::new(RelayClient::from_env()),
            Arc::new(SystemBrowser),
        )
    }

    /// Consent URL for `provider`
    pub fn authorization_url(&self, provider: OAuthProvider) -> AuthResult<Url> {
        let config = self
            .providers
            .get(&provider)
            .ok_or_else(|| AuthError::UnknownProvider(provider.to_string()))?;

        let mut url = Url::parse(&config.authorization_endpoint)
            .map_err(|e| AuthError::Configuration(format!("Invalid auth URL: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &config.client_id)
                .append_pair("redirect_uri", &config.redirect_uri)
                .append_pair("scope", &config.scope)
                .append_pair("response_type", "code");
            for (key, value) in provider.adapter().extra_authorization_params() {
                query.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Navigate to the provider's consent screen; the flow resumes in `handle_return`
    pub fn begin_login(&self, provider: OAuthProvider) -> AuthResult<Url> {
        let url = self.authorization_url(provider)?;
        info!("Redirecting to {} for authentication", provider);
        self.browser.navigate(&url)?;
        Ok(url)
    }

    /// Resolve a return redirect into a profile, or a failure
    ///
    /// Never retries. Each code is handled at most once; a repeat arrival of
    /// one of the recent codes fails with `CallbackAlreadyHandled` without
    /// network traffic.
    pub async fn handle_return(&self, provider: OAuthProvider, current_url: &Url) -> CallbackOutcome {
        let clean_url = strip_callback_params(current_url);
        let result = self.complete(provider, current_url).await;

        match &result {
            Ok(outcome) => info!("✅ OAuth login successful for {}: {}", provider, outcome.user.email),
            Err(e) => error!("OAuth callback for {} failed: {}", provider, e),
        }

        CallbackOutcome {
            provider,
            result,
            clean_url,
        }
    }

    async fn complete(&self, provider: OAuthProvider, url: &Url) -> AuthResult<ExchangeOutcome> {
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

        if let Some(error) = params.get("error") {
            return Err(AuthError::ProviderDeniedConsent(error.clone()));
        }

        let code = params
            .get("code")
            .filter(|code| !code.is_empty())
            .ok_or(AuthError::MissingAuthorizationCode)?;

        // Consume before the network call so a duplicate trigger can't replay it
        self.mark_handled(code)?;

        let mut outcome = self.exchanger.exchange(provider, code).await?;
        outcome.user.stamp(Utc::now());
        Ok(outcome)
    }

    fn mark_handled(&self, code: &str) -> AuthResult<()> {
        let mut handled = self
            .handled_codes
            .lock()
            .map_err(|_| AuthError::Storage("Callback guard poisoned".to_string()))?;
        if handled.iter().any(|seen| seen == code) {
            return Err(AuthError::CallbackAlreadyHandled);
        }
        if handled.len() == HANDLED_CODE_CAPACITY {
            handled.pop_front();
        }
        handled.push_back(code.to_string());
        Ok(())
    }
}

/// Provider named by a `/auth/{provider}/callback` path
pub fn provider_from_callback_path(url: &Url) -> Option<OAuthProvider> {
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [.., "auth", provider, "callback"] => provider.parse().ok(),
        _ => None,
    }
}

/// Copy of `url` without OAuth callback parameters
pub fn strip_callback_params(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !CALLBACK_PARAMS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut clean = url.clone();
    if kept.is_empty() {
        clean.set_query(None);
    } else {
        clean.query_pairs_mut().clear().extend_pairs(kept);
    }
    clean
}
