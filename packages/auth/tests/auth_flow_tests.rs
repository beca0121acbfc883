// ABOUTME: Integration tests for the client-side authentication flow controller
// ABOUTME: Uses a recording exchanger and browser to observe redirects and exchange calls

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;
use wiremock::{
    matchers::{body_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use pr4kh4r_auth::{
    oauth::{flow::Browser, types::AccountProvider},
    AccessToken, AuthError, AuthFlowController, AuthResult, CodeExchanger, ExchangeOutcome,
    NormalizedUserProfile, OAuthProvider, PublicProviderConfig, RelayClient,
};

/// Exchanger that records every call and answers from a script
#[derive(Default)]
struct RecordingExchanger {
    calls: Mutex<Vec<(OAuthProvider, String)>>,
    fail_with: Option<String>,
}

impl RecordingExchanger {
    fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<(OAuthProvider, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeExchanger for RecordingExchanger {
    async fn exchange(&self, provider: OAuthProvider, code: &str) -> AuthResult<ExchangeOutcome> {
        self.calls.lock().unwrap().push((provider, code.to_string()));
        if let Some(message) = &self.fail_with {
            return Err(AuthError::TokenExchangeFailed(message.clone()));
        }
        Ok(ExchangeOutcome {
            user: NormalizedUserProfile::new("1", "e@x.com", "N", provider.into()),
            access_token: AccessToken::new("t"),
        })
    }
}

#[derive(Default)]
struct RecordingBrowser {
    visited: Mutex<Vec<Url>>,
}

impl Browser for RecordingBrowser {
    fn navigate(&self, url: &Url) -> AuthResult<()> {
        self.visited.lock().unwrap().push(url.clone());
        Ok(())
    }
}

fn public_config(provider: OAuthProvider) -> PublicProviderConfig {
    PublicProviderConfig {
        provider,
        client_id: format!("{}-client", provider),
        redirect_uri: format!("http://localhost:3030/auth/{}/callback", provider),
        scope: provider.default_scope().to_string(),
        authorization_endpoint: provider.authorization_endpoint().to_string(),
    }
}

fn controller(
    exchanger: Arc<RecordingExchanger>,
    browser: Arc<RecordingBrowser>,
) -> AuthFlowController {
    AuthFlowController::new(
        OAuthProvider::all().into_iter().map(public_config),
        exchanger,
        browser,
    )
}

fn query_map(url: &Url) -> HashMap<String, String> {
    url.query_pairs().into_owned().collect()
}

#[test]
fn test_authorization_url_parameters() {
    let flow = controller(Arc::default(), Arc::default());

    let google = flow.authorization_url(OAuthProvider::Google).unwrap();
    assert!(google
        .as_str()
        .starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
    let params = query_map(&google);
    assert_eq!(params.len(), 6);
    assert_eq!(params["client_id"], "google-client");
    assert_eq!(params["redirect_uri"], "http://localhost:3030/auth/google/callback");
    assert_eq!(params["scope"], "openid email profile");
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["access_type"], "offline");
    assert_eq!(params["prompt"], "consent");

    let github = flow.authorization_url(OAuthProvider::GitHub).unwrap();
    assert!(github
        .as_str()
        .starts_with("https://github.com/login/oauth/authorize?"));
    let params = query_map(&github);
    assert_eq!(params.len(), 4);
    assert_eq!(params["scope"], "read:user user:email");
    assert!(!params.contains_key("access_type"));
    assert!(!params.contains_key("prompt"));
}

#[test]
fn test_begin_login_navigates() {
    let browser = Arc::new(RecordingBrowser::default());
    let flow = controller(Arc::default(), browser.clone());

    let url = flow.begin_login(OAuthProvider::GitHub).unwrap();

    assert_eq!(*browser.visited.lock().unwrap(), vec![url]);
}

#[test]
fn test_begin_login_unknown_provider() {
    let flow = AuthFlowController::new(
        [public_config(OAuthProvider::Google)],
        Arc::new(RecordingExchanger::default()),
        Arc::new(RecordingBrowser::default()),
    );
    assert!(matches!(
        flow.begin_login(OAuthProvider::GitHub),
        Err(AuthError::UnknownProvider(_))
    ));
}

#[tokio::test]
async fn test_handle_return_with_error_skips_exchange() {
    let exchanger = Arc::new(RecordingExchanger::default());
    let flow = controller(exchanger.clone(), Arc::default());
    let url =
        Url::parse("http://localhost:3030/auth/google/callback?error=access_denied&state=s").unwrap();

    let outcome = flow.handle_return(OAuthProvider::Google, &url).await;

    assert!(outcome.profile().is_none());
    assert!(matches!(
        outcome.result,
        Err(AuthError::ProviderDeniedConsent(ref reason)) if reason == "access_denied"
    ));
    assert!(exchanger.calls().is_empty());
    assert_eq!(outcome.clean_url.as_str(), "http://localhost:3030/auth/google/callback");
}

#[tokio::test]
async fn test_handle_return_without_code_skips_exchange() {
    let exchanger = Arc::new(RecordingExchanger::default());
    let flow = controller(exchanger.clone(), Arc::default());
    let url = Url::parse("http://localhost:3030/auth/github/callback").unwrap();

    let outcome = flow.handle_return(OAuthProvider::GitHub, &url).await;

    assert!(matches!(outcome.result, Err(AuthError::MissingAuthorizationCode)));
    assert!(outcome.into_profile().is_none());
    assert!(exchanger.calls().is_empty());
}

#[tokio::test]
async fn test_handle_return_success_stamps_profile() {
    let exchanger = Arc::new(RecordingExchanger::default());
    let flow = controller(exchanger.clone(), Arc::default());
    let url = Url::parse("http://localhost:3030/auth/github/callback?code=abc123&state=x").unwrap();

    let outcome = flow.handle_return(OAuthProvider::GitHub, &url).await;

    assert_eq!(exchanger.calls(), vec![(OAuthProvider::GitHub, "abc123".to_string())]);
    assert_eq!(outcome.clean_url.query(), None);
    let profile = outcome.into_profile().unwrap();
    assert_eq!(profile.provider, AccountProvider::GitHub);
    assert!(profile.last_login.is_some());
    assert!(profile.created_at.is_some());
}

#[tokio::test]
async fn test_handle_return_failure_resolves_without_profile() {
    let exchanger = Arc::new(RecordingExchanger::failing("Backend OAuth exchange failed"));
    let flow = controller(exchanger.clone(), Arc::default());
    let url = Url::parse("http://localhost:3030/auth/google/callback?code=abc").unwrap();

    let outcome = flow.handle_return(OAuthProvider::Google, &url).await;

    assert!(outcome.profile().is_none());
    assert!(matches!(outcome.result, Err(AuthError::TokenExchangeFailed(_))));
    // No automatic retry
    assert_eq!(exchanger.calls().len(), 1);
}

#[tokio::test]
async fn test_handle_return_runs_once_per_code() {
    let exchanger = Arc::new(RecordingExchanger::default());
    let flow = controller(exchanger.clone(), Arc::default());
    let url = Url::parse("http://localhost:3030/auth/google/callback?code=single-use").unwrap();

    let first = flow.handle_return(OAuthProvider::Google, &url).await;
    let second = flow.handle_return(OAuthProvider::Google, &url).await;

    assert!(first.profile().is_some());
    assert!(matches!(second.result, Err(AuthError::CallbackAlreadyHandled)));
    assert_eq!(exchanger.calls().len(), 1);
}

#[tokio::test]
async fn test_relay_client_exchange() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/github/callback"))
        .and(body_json(serde_json::json!({"code": "abc"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "user": {"id": "1", "email": "b@x.com", "name": "octo", "provider": "github"},
            "accessToken": "t"
        })))
        .mount(&server)
        .await;

    let relay = RelayClient::new(server.uri());
    let outcome = relay.exchange(OAuthProvider::GitHub, "abc").await.unwrap();

    assert_eq!(outcome.user.email, "b@x.com");
    assert_eq!(outcome.access_token.secret(), "t");
}

#[tokio::test]
async fn test_relay_client_surfaces_relay_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/google/callback"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(serde_json::json!({"error": "Bad Request"})),
        )
        .mount(&server)
        .await;

    let relay = RelayClient::new(server.uri());
    let result = relay.exchange(OAuthProvider::Google, "abc").await;

    assert!(matches!(
        result,
        Err(AuthError::TokenExchangeFailed(msg)) if msg == "Bad Request"
    ));
}

#[tokio::test]
async fn test_relay_client_password_login() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/email/login"))
        .and(body_json(serde_json::json!({"email": "e@x.com", "password": "hunter22"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "user": {"id": "1", "email": "e@x.com", "name": "N", "provider": "email"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/email/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({"error": "Invalid email or password"})),
        )
        .mount(&server)
        .await;

    let relay = RelayClient::new(server.uri());
    let user = relay.login_with_password("e@x.com", "hunter22").await.unwrap();
    assert_eq!(user.provider, AccountProvider::Email);

    let rejected = relay.login_with_password("e@x.com", "nope-nope").await;
    assert!(matches!(rejected, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn test_relay_client_set_password() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/google/password"))
        .and(body_json(serde_json::json!({"accessToken": "t", "password": "hunter22"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let relay = RelayClient::new(server.uri());
    relay
        .set_password(OAuthProvider::Google, &AccessToken::new("t"), "hunter22")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_relay_client_set_password_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/google/password"))
        .respond_with(ResponseTemplate::new(400).set_body_json(
            serde_json::json!({"error": "Password must be at least 6 characters"}),
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/github/password"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": "Upstream unavailable: Fetching GitHub user failed with status 401 Unauthorized"
        })))
        .mount(&server)
        .await;

    let relay = RelayClient::new(server.uri());
    let token = AccessToken::new("t");

    let short = relay.set_password(OAuthProvider::Google, &token, "123").await;
    assert!(matches!(
        short,
        Err(AuthError::InvalidPassword(msg)) if msg == "Password must be at least 6 characters"
    ));

    let rejected = relay.set_password(OAuthProvider::GitHub, &token, "hunter22").await;
    assert!(matches!(
        rejected,
        Err(AuthError::UpstreamUnavailable(msg)) if msg.contains("status 401")
    ));
}

#[tokio::test]
async fn test_relay_client_maps_account_conflicts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/github/password"))
        .respond_with(ResponseTemplate::new(403).set_body_json(
            serde_json::json!({"error": "Email is not verified by the provider"}),
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/google/password"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            serde_json::json!({"error": "Email is already linked to another account"}),
        ))
        .mount(&server)
        .await;

    let relay = RelayClient::new(server.uri());
    let token = AccessToken::new("t");

    assert!(matches!(
        relay.set_password(OAuthProvider::GitHub, &token, "hunter22").await,
        Err(AuthError::UnverifiedEmail)
    ));
    assert!(matches!(
        relay.set_password(OAuthProvider::Google, &token, "hunter22").await,
        Err(AuthError::EmailAlreadyClaimed)
    ));
}

#[tokio::test]
async fn test_relay_client_not_found_is_unknown_provider() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_json(
            serde_json::json!({"error": "Unknown provider: github. Supported: google, github"}),
        ))
        .mount(&server)
        .await;

    let relay = RelayClient::new(server.uri());

    let result = relay
        .set_password(OAuthProvider::GitHub, &AccessToken::new("t"), "hunter22")
        .await;
    assert!(matches!(result, Err(AuthError::UnknownProvider(p)) if p == "github"));

    let result = relay.exchange(OAuthProvider::GitHub, "abc").await;
    assert!(matches!(result, Err(AuthError::UnknownProvider(p)) if p == "github"));
}
