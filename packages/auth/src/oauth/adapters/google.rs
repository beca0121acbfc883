// ABOUTME: Google adapter: form-encoded token exchange and oauth2/v2/userinfo normalization
// ABOUTME: Forces offline access and re-consent so Google issues a refresh token

use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, RequestBuilder};

use super::{fetch_json, non_empty, ProviderAdapter};
use crate::{
    error::{AuthError, AuthResult},
    oauth::{
        registry::ProviderConfig,
        types::{
            AccessToken, AccountProvider, GoogleUserInfo, NormalizedUserProfile, ProviderIdentity,
        },
    },
};

pub struct GoogleAdapter;

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn extra_authorization_params(&self) -> &'static [(&'static str, &'static str)] {
        &[("access_type", "offline"), ("prompt", "consent")]
    }

    fn token_request(
        &self,
        client: &Client,
        config: &ProviderConfig,
        code: &str,
    ) -> RequestBuilder {
        client
            .post(&config.token_endpoint)
            .header(ACCEPT, "application/json")
            .form(&[
                ("code", code),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.expose()),
                ("redirect_uri", config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
    }

    async fn fetch_identity(
        &self,
        client: &Client,
        config: &ProviderConfig,
        token: &AccessToken,
    ) -> AuthResult<ProviderIdentity> {
        let info: GoogleUserInfo =
            fetch_json(client, &config.user_info_endpoint, token, "Google user info").await?;
        let email_verified = info.verified_email;
        Ok(ProviderIdentity {
            profile: normalize(info)?,
            email_verified,
        })
    }
}

fn normalize(info: GoogleUserInfo) -> AuthResult<NormalizedUserProfile> {
    let email = non_empty(info.email).ok_or_else(|| {
        AuthError::MalformedUpstreamResponse("Google user info has no email".to_string())
    })?;
    let name = non_empty(info.name).unwrap_or_else(|| email.clone());

    Ok(
        NormalizedUserProfile::new(info.id, email, name, AccountProvider::Google)
            .with_avatar(non_empty(info.picture)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_maps_fields() {
        let info: GoogleUserInfo = serde_json::from_str(
            r#"{"id":"1","email":"e@x.com","name":"N","picture":"u","verified_email":true}"#,
        )
        .unwrap();

        let profile = normalize(info).unwrap();
        assert_eq!(profile.id, "1");
        assert_eq!(profile.email, "e@x.com");
        assert_eq!(profile.name, "N");
        assert_eq!(profile.avatar.as_deref(), Some("u"));
        assert_eq!(profile.provider, AccountProvider::Google);
    }

    #[test]
    fn test_normalize_requires_email() {
        let info: GoogleUserInfo = serde_json::from_str(r#"{"id":"1","name":"N"}"#).unwrap();
        assert!(matches!(
            normalize(info),
            Err(AuthError::MalformedUpstreamResponse(_))
        ));
    }

    #[test]
    fn test_extra_params() {
        assert_eq!(
            GoogleAdapter.extra_authorization_params(),
            &[("access_type", "offline"), ("prompt", "consent")]
        );
    }
}
