// ABOUTME: Server-side password vault for email sign-in after an OAuth sign-up
// ABOUTME: Stores Argon2id hashes keyed by email; plaintext never leaves the request

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::LazyLock;
use tokio::sync::RwLock;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::{
    error::{AuthError, AuthResult},
    oauth::types::{AccountProvider, NormalizedUserProfile, ProviderIdentity},
};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Verified against when the email is unknown so both paths cost one hash
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("pr4kh4r-unknown-account").ok());

#[derive(Clone)]
struct Credential {
    password_hash: String,
    profile: NormalizedUserProfile,
}

impl Credential {
    fn owned_by(&self, profile: &NormalizedUserProfile) -> bool {
        self.profile.provider == profile.provider && self.profile.id == profile.id
    }
}

/// In-process credential store
#[derive(Default)]
pub struct PasswordVault {
    credentials: RwLock<HashMap<String, Credential>>,
}

impl PasswordVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash and store `password` for the account in `identity`
    ///
    /// The email must be verified by the provider, and an email already linked
    /// to a different provider account cannot be taken over.
    pub async fn set_password(&self, identity: &ProviderIdentity, password: &str) -> AuthResult<()> {
        validate_password(password)?;

        let profile = &identity.profile;
        if !identity.email_verified {
            warn!("Refusing password for unverified email {}", profile.email);
            return Err(AuthError::UnverifiedEmail);
        }

        let key = normalize_email(&profile.email);
        self.ensure_unclaimed(&key, profile).await?;

        let plaintext = Zeroizing::new(password.to_string());
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&plaintext))
            .await
            .map_err(|e| AuthError::Storage(format!("Password hashing task failed: {}", e)))??;

        let mut snapshot = profile.clone();
        snapshot.last_login = None;

        let mut credentials = self.credentials.write().await;
        // Another request may have linked the email while we were hashing
        if credentials.get(&key).is_some_and(|c| !c.owned_by(profile)) {
            return Err(AuthError::EmailAlreadyClaimed);
        }
        credentials.insert(
            key,
            Credential {
                password_hash,
                profile: snapshot,
            },
        );
        info!("Password set for {}", profile.email);
        Ok(())
    }

    /// Verify an email + password pair and return the account as an email login
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<NormalizedUserProfile> {
        let credential = self
            .credentials
            .read()
            .await
            .get(&normalize_email(email))
            .cloned();

        // Unknown email and wrong password are indistinguishable to the caller
        let hash = credential.as_ref().map(|c| c.password_hash.clone());
        let plaintext = Zeroizing::new(password.to_string());
        let verified = tokio::task::spawn_blocking(move || match hash {
            Some(hash) => verify_password(&plaintext, &hash),
            None => {
                if let Some(dummy) = DUMMY_HASH.as_deref() {
                    let _ = verify_password(&plaintext, dummy);
                }
                false
            }
        })
        .await
        .map_err(|e| AuthError::Storage(format!("Password verification task failed: {}", e)))?;

        let Some(credential) = credential.filter(|_| verified) else {
            warn!("Rejected email login");
            return Err(AuthError::InvalidCredentials);
        };

        let mut profile = credential.profile;
        profile.provider = AccountProvider::Email;
        profile.last_login = Some(Utc::now());
        Ok(profile)
    }

    pub async fn has_password(&self, email: &str) -> bool {
        self.credentials
            .read()
            .await
            .contains_key(&normalize_email(email))
    }

    async fn ensure_unclaimed(&self, key: &str, profile: &NormalizedUserProfile) -> AuthResult<()> {
        match self.credentials.read().await.get(key) {
            Some(existing) if !existing.owned_by(profile) => {
                warn!("Email already linked to another {:?} account", existing.profile.provider);
                Err(AuthError::EmailAlreadyClaimed)
            }
            _ => Ok(()),
        }
    }
}

pub fn validate_password(password: &str) -> AuthResult<()> {
    if password.is_empty() {
        return Err(AuthError::InvalidPassword("Password is required".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::InvalidPassword(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn hash_password(password: &str) -> AuthResult<String> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AuthError::Storage(format!("Failed to encode salt: {}", e)))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Storage(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
