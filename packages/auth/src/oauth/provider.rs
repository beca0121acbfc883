// ABOUTME: Identity provider identifiers and their well-known OAuth endpoints
// ABOUTME: Supports Google and GitHub; each provider maps to one adapter in the strategy table

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AuthError, AuthResult};
use crate::oauth::adapters::{GitHubAdapter, GoogleAdapter, ProviderAdapter};

/// Supported OAuth identity providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    GitHub,
}

impl OAuthProvider {
    /// Consent screen URL
    pub fn authorization_endpoint(&self) -> &'static str {
        match self {
            Self::Google => "https://accounts.google.com/o/oauth2/v2/auth",
            Self::GitHub => "https://github.com/login/oauth/authorize",
        }
    }

    /// Code-for-token exchange URL
    pub fn token_endpoint(&self) -> &'static str {
        match self {
            Self::Google => "https://oauth2.googleapis.com/token",
            Self::GitHub => "https://github.com/login/oauth/access_token",
        }
    }

    /// Profile URL called with the bearer token
    pub fn user_info_endpoint(&self) -> &'static str {
        match self {
            Self::Google => "https://www.googleapis.com/oauth2/v2/userinfo",
            Self::GitHub => "https://api.github.com/user",
        }
    }

    /// Secondary email-list URL, only GitHub withholds the address from the profile
    pub fn user_emails_endpoint(&self) -> Option<&'static str> {
        match self {
            Self::Google => None,
            Self::GitHub => Some("https://api.github.com/user/emails"),
        }
    }

    /// Space-delimited scopes requested at consent time
    pub fn default_scope(&self) -> &'static str {
        match self {
            Self::Google => "openid email profile",
            Self::GitHub => "read:user user:email",
        }
    }

    pub fn default_redirect_uri(&self) -> &'static str {
        match self {
            Self::Google => "http://localhost:3030/auth/google/callback",
            Self::GitHub => "http://localhost:3030/auth/github/callback",
        }
    }

    /// Prefix of the environment variables holding this provider's credentials
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Self::Google => "GOOGLE",
            Self::GitHub => "GITHUB",
        }
    }

    /// Request building and profile normalization for this provider
    pub fn adapter(&self) -> &'static dyn ProviderAdapter {
        match self {
            Self::Google => &GoogleAdapter,
            Self::GitHub => &GitHubAdapter,
        }
    }

    /// Get all supported providers
    pub fn all() -> Vec<Self> {
        vec![Self::Google, Self::GitHub]
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Google => write!(f, "google"),
            Self::GitHub => write!(f, "github"),
        }
    }
}

impl FromStr for OAuthProvider {
    type Err = AuthError;

    fn from_str(s: &str) -> AuthResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "github" => Ok(Self::GitHub),
            _ => Err(AuthError::UnknownProvider(s.to_string())),
        }
    }
}

impl TryFrom<&str> for OAuthProvider {
    type Error = AuthError;

    fn try_from(s: &str) -> AuthResult<Self> {
        s.parse()
    }
}
