use axum::http::Method;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod api;
pub mod config;
pub mod error;


use api::AppState;
use config::Config;
use pr4kh4r_auth::{ProviderRegistry, TokenExchangeService};

pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let registry = Arc::new(ProviderRegistry::from_env());
    for provider in registry.providers() {
        if provider.is_configured() {
            info!("{} OAuth client: ✅ Set", provider.provider);
        } else {
            warn!("{} OAuth client: ❌ Missing", provider.provider);
        }
    }

    let exchange = TokenExchangeService::with_timeout(registry, config.upstream_timeout)?;

    // Create CORS layer
    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.parse::<axum::http::HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let app = api::create_router(AppState::new(exchange))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("🚀 OAuth relay listening on http://{}", addr);
    info!("🔗 CORS origin: {}", config.cors_origin);

    axum::serve(listener, app).await?;

    Ok(())
}
