//! Gatehouse - a small OAuth2 SSO web application
//!
//! Signs users in via third-party identity providers (GitHub, Google) using
//! the authorization-code grant, keeps sessions server-side behind an opaque
//! cookie, and serves a few pages plus a JSON profile API.
//!
//! # Modules
//!
//! - `auth`: login flow, sessions, route policy, middleware
//! - `api`: JSON endpoints reflecting the current principal
//! - `pages`: server-rendered HTML pages
//! - `config`: configuration management
//! - `error`: error types

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod pages;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains shared resources:
/// the immutable configuration and provider registry, the session store,
/// and the HTTP client used for provider calls.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Configured OAuth2 provider registrations (immutable)
    pub providers: Arc<auth::ProviderRegistry>,

    /// Server-side session and login-state store
    pub sessions: Arc<auth::SessionStore>,

    /// Route authorization table (immutable)
    pub policy: Arc<auth::RoutePolicy>,

    /// HTTP client for token exchange and user-info fetches
    pub http_client: Arc<reqwest::Client>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let providers = auth::ProviderRegistry::from_config(&config.providers);
        let sessions = auth::SessionStore::new(&config.session);

        // Both outbound provider calls are bounded by this timeout; an
        // elapsed timeout surfaces as TokenExchange / UserInfoFetch.
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("Gatehouse/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        Ok(Self {
            config: Arc::new(config),
            providers: Arc::new(providers),
            sessions: Arc::new(sessions),
            policy: Arc::new(auth::RoutePolicy::new()),
            http_client: Arc::new(http_client),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments. The route guard wraps all
/// routes and enforces the authorization policy before dispatch.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, middleware};
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(pages::pages_router())
        .merge(auth::auth_router())
        .nest("/api", api::user_api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::route_guard,
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
