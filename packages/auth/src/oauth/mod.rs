// ABOUTME: OAuth module providing the authorization-code flow for Google and GitHub
// ABOUTME: Includes the provider registry, adapters, token exchange service and flow controller

pub mod adapters;
pub mod exchange;
pub mod flow;
pub mod provider;
pub mod registry;
pub mod types;

pub use adapters::ProviderAdapter;
pub use exchange::TokenExchangeService;
pub use flow::{AuthFlowController, Browser, CallbackOutcome, CodeExchanger, RelayClient, SystemBrowser};
pub use provider::OAuthProvider;
pub use registry::{ProviderConfig, ProviderRegistry, PublicProviderConfig};
pub use types::{AccessToken, AccountProvider, ClientSecret, ExchangeOutcome, NormalizedUserProfile, ProfileUpdate, ProviderIdentity};
