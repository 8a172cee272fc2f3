//! Web server adapter.
//!
//! JSON API over axum. The backtest endpoint sits behind API key
//! validation and per-key rate limiting; the root route is open.

mod auth;
mod error;
mod handlers;
mod rate_limit;

pub use auth::{API_KEY_HEADER, require_api_key};
pub use error::{WebError, status_from_error};
pub use handlers::*;
pub use rate_limit::RateLimiter;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

use crate::domain::error::FlatlandError;
use crate::ports::api_key_port::ApiKeyPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

pub struct AppState {
    pub data_port: Arc<dyn DataPort + Send + Sync>,
    pub api_keys: Arc<dyn ApiKeyPort + Send + Sync>,
    pub rate_limiter: RateLimiter,
    pub timeframe: String,
}

impl AppState {
    /// Build state from `[web]` and `[backtest]` settings.
    pub fn from_config(
        config: &dyn ConfigPort,
        data_port: Arc<dyn DataPort + Send + Sync>,
        api_keys: Arc<dyn ApiKeyPort + Send + Sync>,
    ) -> Result<Self, FlatlandError> {
        crate::domain::config_validation::validate_web_config(config)?;
        let max = config.get_int("web", "rate_limit_max", 100) as usize;
        let window = config.get_int("web", "rate_limit_window", 3600) as u64;
        let timeframe = config
            .get_string("backtest", "timeframe")
            .unwrap_or_else(|| "30m".to_string());

        Ok(Self {
            data_port,
            api_keys,
            rate_limiter: RateLimiter::new(max, Duration::from_secs(window)),
            timeframe,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let state = Arc::new(state);

    let api = Router::new()
        .route("/api/v1/flatland-backtest", post(handlers::flatland_backtest))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .merge(api)
        .fallback(handlers::not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
