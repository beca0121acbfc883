// ABOUTME: Error types for the OAuth flow, token exchange and session management
// ABOUTME: Every variant is terminal for the current login attempt; nothing is retried

use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Unknown provider: {0}. Supported: google, github")]
    UnknownProvider(String),

    #[error("Missing authorization code")]
    MissingAuthorizationCode,

    #[error("Provider denied consent: {0}")]
    ProviderDeniedConsent(String),

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Malformed upstream response: {0}")]
    MalformedUpstreamResponse(String),

    #[error("Authorization code was already handled")]
    CallbackAlreadyHandled,

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("No active session")]
    NotAuthenticated,

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email is not verified by the provider")]
    UnverifiedEmail,

    #[error("Email is already linked to another account")]
    EmailAlreadyClaimed,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to open browser: {0}")]
    BrowserOpen(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthError {
    /// Whether the failure was caused by the caller's input rather than the upstream
    /// provider or the local environment
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownProvider(_)
                | Self::MissingAuthorizationCode
                | Self::ProviderDeniedConsent(_)
                | Self::CallbackAlreadyHandled
                | Self::InvalidPassword(_)
                | Self::InvalidCredentials
                | Self::UnverifiedEmail
                | Self::EmailAlreadyClaimed
        )
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedUpstreamResponse(err.to_string())
        } else {
            Self::UpstreamUnavailable(err.to_string())
        }
    }
}
