use axum::{
    routing::{get, post},
    Router,
};
use pr4kh4r_auth::{PasswordVault, TokenExchangeService};
use std::sync::Arc;

pub mod auth_handlers;
pub mod extract;
pub mod health;

/// Shared handler state; every request is otherwise independent
#[derive(Clone)]
pub struct AppState {
    pub exchange: TokenExchangeService,
    pub vault: Arc<PasswordVault>,
}

impl AppState {
    pub fn new(exchange: TokenExchangeService) -> Self {
        Self {
            exchange,
            vault: Arc::new(PasswordVault::new()),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/auth/providers", get(auth_handlers::list_providers))
        .route("/api/auth/email/login", post(auth_handlers::email_login))
        .route(
            "/api/auth/{provider}/callback",
            post(auth_handlers::oauth_callback),
        )
        .route(
            "/api/auth/{provider}/password",
            post(auth_handlers::set_password),
        )
        .with_state(state)
}
