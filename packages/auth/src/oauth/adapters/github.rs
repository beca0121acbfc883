// ABOUTME: GitHub adapter: JSON token exchange, /user normalization and primary-email lookup
// ABOUTME: Falls back to an unverified <login>@github.com when the account exposes no primary email

use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, RequestBuilder};
use serde::Serialize;
use tracing::debug;

use super::{fetch_json, non_empty, ProviderAdapter};
use crate::{
    error::{AuthError, AuthResult},
    oauth::{
        registry::ProviderConfig,
        types::{
            AccessToken, AccountProvider, GitHubEmail, GitHubUser, NormalizedUserProfile,
            ProviderIdentity,
        },
    },
};

pub struct GitHubAdapter;

/// GitHub answers form-encoded unless asked for JSON, so the body is JSON too
#[derive(Serialize)]
struct GitHubTokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
}

#[async_trait]
impl ProviderAdapter for GitHubAdapter {
    fn token_request(
        &self,
        client: &Client,
        config: &ProviderConfig,
        code: &str,
    ) -> RequestBuilder {
        client
            .post(&config.token_endpoint)
            .header(ACCEPT, "application/json")
            .json(&GitHubTokenRequest {
                client_id: &config.client_id,
                client_secret: config.client_secret.expose(),
                code,
                redirect_uri: &config.redirect_uri,
            })
    }

    async fn fetch_identity(
        &self,
        client: &Client,
        config: &ProviderConfig,
        token: &AccessToken,
    ) -> AuthResult<ProviderIdentity> {
        let user: GitHubUser =
            fetch_json(client, &config.user_info_endpoint, token, "GitHub user").await?;

        // GitHub only publishes verified addresses on the public profile
        let (email, email_verified) = match non_empty(user.email.clone()) {
            Some(email) => (email, true),
            None => {
                debug!("GitHub profile has no public email, querying email list");
                let emails: Vec<GitHubEmail> = match &config.user_emails_endpoint {
                    Some(url) => fetch_json(client, url, token, "GitHub emails").await?,
                    None => Vec::new(),
                };
                select_email(&emails, &user.login)
            }
        };

        Ok(ProviderIdentity {
            profile: normalize(user, email)?,
            email_verified,
        })
    }
}

/// Primary (preferably verified) address, else the synthetic login address
///
/// Returns the address and whether GitHub has verified it.
pub(crate) fn select_email(emails: &[GitHubEmail], login: &str) -> (String, bool) {
    emails
        .iter()
        .find(|e| e.primary && e.verified)
        .or_else(|| emails.iter().find(|e| e.primary))
        .map(|e| (e.email.clone(), e.verified))
        .unwrap_or_else(|| (format!("{}@github.com", login), false))
}

fn normalize(user: GitHubUser, email: String) -> AuthResult<NormalizedUserProfile> {
    let id = match &user.id {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) if !s.is_empty() => s.clone(),
        other => {
            return Err(AuthError::MalformedUpstreamResponse(format!(
                "GitHub user id has unexpected shape: {}",
                other
            )));
        }
    };
    let name = non_empty(user.name).unwrap_or_else(|| user.login.clone());

    Ok(NormalizedUserProfile::new(id, email, name, AccountProvider::GitHub)
        .with_avatar(non_empty(user.avatar_url)))
}
