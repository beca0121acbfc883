// ABOUTME: Core type definitions for authentication
// ABOUTME: Normalized user profiles, access tokens and the raw provider payloads they are built from

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

use crate::oauth::provider::OAuthProvider;

/// How the account signed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountProvider {
    Google,
    GitHub,
    Email,
}

impl From<OAuthProvider> for AccountProvider {
    fn from(provider: OAuthProvider) -> Self {
        match provider {
            OAuthProvider::Google => Self::Google,
            OAuthProvider::GitHub => Self::GitHub,
        }
    }
}

/// Provider-agnostic identity record
///
/// The relay leaves both timestamps empty; the client stamps them when the
/// session is established.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedUserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub provider: AccountProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl NormalizedUserProfile {
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
        provider: AccountProvider,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
            avatar: None,
            phone: None,
            bio: None,
            provider,
            created_at: None,
            last_login: None,
        }
    }

    pub fn with_avatar(mut self, avatar: Option<String>) -> Self {
        self.avatar = avatar;
        self
    }

    /// Fill in missing timestamps without overwriting ones already set
    pub fn stamp(&mut self, now: DateTime<Utc>) {
        self.created_at.get_or_insert(now);
        self.last_login.get_or_insert(now);
    }

    /// Apply a partial profile edit
    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(avatar) = update.avatar {
            self.avatar = Some(avatar);
        }
        if let Some(phone) = update.phone {
            self.phone = Some(phone);
        }
        if let Some(bio) = update.bio {
            self.bio = Some(bio);
        }
    }
}

/// Editable profile fields. Credentials are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
}

/// Opaque bearer credential returned by a provider's token endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(**redacted**)")
    }
}

impl Drop for AccessToken {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.0.zeroize();
    }
}

/// Result of one successful code exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeOutcome {
    pub user: NormalizedUserProfile,
    pub access_token: AccessToken,
}

/// A provider profile together with what the provider vouches for
///
/// `email_verified` is false for addresses the provider has not confirmed
/// and for synthesized fallbacks such as `<login>@github.com`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderIdentity {
    pub profile: NormalizedUserProfile,
    pub email_verified: bool,
}

/// Confidential client secret; never serialized, redacted in logs, wiped on drop
#[derive(Clone, Default)]
pub struct ClientSecret(Zeroizing<String>);

impl ClientSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret(**redacted**)")
    }
}

/// Token endpoint response; success and error fields share one shape
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Google `oauth2/v2/userinfo` payload
#[derive(Debug, Deserialize)]
pub struct GoogleUserInfo {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    #[serde(default)]
    pub verified_email: bool,
}

/// GitHub `/user` payload
#[derive(Debug, Deserialize)]
pub struct GitHubUser {
    pub id: serde_json::Value,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// One entry of GitHub `/user/emails`
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubEmail {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub verified: bool,
}
