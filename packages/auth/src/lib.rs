// ABOUTME: Pr4kh4r AI authentication library: OAuth code exchange, login flow and sessions
// ABOUTME: Supports Google and GitHub sign-in plus email login with server-side password hashes

pub mod credentials;
pub mod error;
pub mod oauth;
pub mod session;

// Re-export main types
pub use credentials::PasswordVault;
pub use error::{AuthError, AuthResult};
pub use oauth::{
    AccessToken, AccountProvider, AuthFlowController, CallbackOutcome, CodeExchanger,
    ExchangeOutcome, NormalizedUserProfile, OAuthProvider, ProfileUpdate, ProviderConfig,
    ProviderIdentity, ProviderRegistry, PublicProviderConfig, RelayClient, TokenExchangeService,
};
pub use session::{FileSessionStore, MemorySessionStore, SessionManager, SessionStore};
