// ABOUTME: Client-held session: one owned profile with explicit login, logout and update
// ABOUTME: Persisted through a key-value SessionStore (JSON file or in-memory)

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::{
    error::{AuthError, AuthResult},
    oauth::types::{NormalizedUserProfile, ProfileUpdate},
};

/// Storage key of the persisted profile
pub const USER_STORAGE_KEY: &str = "pr4kh4r_user_profile";

/// Flat key-value persistence for the active profile
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Raw persisted blob, if any
    async fn load(&self) -> AuthResult<Option<String>>;
    async fn save(&self, blob: &str) -> AuthResult<()>;
    async fn clear(&self) -> AuthResult<()>;
}

/// Volatile store, mostly for tests and embedded use
#[derive(Default)]
pub struct MemorySessionStore {
    blob: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> AuthResult<Option<String>> {
        Ok(self.blob.lock().await.clone())
    }

    async fn save(&self, blob: &str) -> AuthResult<()> {
        *self.blob.lock().await = Some(blob.to_string());
        Ok(())
    }

    async fn clear(&self) -> AuthResult<()> {
        *self.blob.lock().await = None;
        Ok(())
    }
}

/// JSON file store, by default `~/.pr4kh4r/pr4kh4r_user_profile.json`
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> AuthResult<Self> {
        let path = dirs::home_dir()
            .ok_or_else(|| {
                AuthError::Configuration("Could not determine home directory".to_string())
            })?
            .join(".pr4kh4r")
            .join(format!("{}.json", USER_STORAGE_KEY));
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> AuthResult<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AuthError::Storage(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn save(&self, blob: &str) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, blob).await?;
        Ok(())
    }

    async fn clear(&self) -> AuthResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The single owned session of this client
///
/// Created by `login` after a successful exchange and destroyed by `logout`.
pub struct SessionManager<S: SessionStore> {
    store: S,
    current: Option<NormalizedUserProfile>,
}

impl<S: SessionStore> SessionManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            current: None,
        }
    }

    /// Reload the persisted profile; a corrupt blob is discarded
    pub async fn restore(&mut self) -> AuthResult<Option<&NormalizedUserProfile>> {
        self.current = match self.store.load().await? {
            Some(blob) => match serde_json::from_str::<NormalizedUserProfile>(&blob) {
                Ok(profile) => {
                    debug!("Restored session for {}", profile.email);
                    Some(profile)
                }
                Err(e) => {
                    error!("Failed to parse stored user: {}", e);
                    self.store.clear().await?;
                    None
                }
            },
            None => None,
        };
        Ok(self.current.as_ref())
    }

    /// Establish a session for `profile`, stamping the login time
    pub async fn login(
        &mut self,
        mut profile: NormalizedUserProfile,
    ) -> AuthResult<&NormalizedUserProfile> {
        let now = Utc::now();
        profile.last_login = Some(now);
        profile.created_at.get_or_insert(now);

        self.persist(&profile).await?;
        info!("Logged in as {} via {:?}", profile.email, profile.provider);
        Ok(self.current.insert(profile))
    }

    /// Destroy the session and its persisted copy
    pub async fn logout(&mut self) -> AuthResult<()> {
        if let Some(profile) = self.current.take() {
            info!("Logged out {}", profile.email);
        }
        self.store.clear().await
    }

    /// Merge profile edits into the active session
    pub async fn update(&mut self, update: ProfileUpdate) -> AuthResult<&NormalizedUserProfile> {
        let mut profile = self.current.clone().ok_or(AuthError::NotAuthenticated)?;
        profile.apply(update);
        self.persist(&profile).await?;
        Ok(self.current.insert(profile))
    }

    pub fn current(&self) -> Option<&NormalizedUserProfile> {
        self.current.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn persist(&self, profile: &NormalizedUserProfile) -> AuthResult<()> {
        let blob = serde_json::to_string(profile)?;
        self.store.save(&blob).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::types::AccountProvider;

    fn profile() -> NormalizedUserProfile {
        NormalizedUserProfile::new("42", "octo@github.com", "Octo", AccountProvider::GitHub)
    }

    #[tokio::test]
    async fn test_login_stamps_and_persists() {
        let mut session = SessionManager::new(MemorySessionStore::new());
        let user = session.login(profile()).await.unwrap();
        assert!(user.last_login.is_some());
        assert!(user.created_at.is_some());
        assert!(session.is_authenticated());

        let blob = session.store().load().await.unwrap().unwrap();
        assert!(blob.contains("\"lastLogin\""));
        assert!(blob.contains("octo@github.com"));
    }

    #[tokio::test]
    async fn test_logout_clears_store() {
        let mut session = SessionManager::new(MemorySessionStore::new());
        session.login(profile()).await.unwrap();
        session.logout().await.unwrap();

        assert!(!session.is_authenticated());
        assert!(session.store().load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_requires_session() {
        let mut session = SessionManager::new(MemorySessionStore::new());
        let result = session.update(ProfileUpdate::default()).await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_restore_discards_corrupt_blob() {
        let mut session = SessionManager::new(MemorySessionStore::with_blob("{not json"));
        assert!(session.restore().await.unwrap().is_none());
        assert!(session.store().load().await.unwrap().is_none());
    }
}
