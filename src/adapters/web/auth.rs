//! API key gatekeeping for `/api` routes.
//!
//! Every request must carry a known `X-API-Key`. Only the `free` role exists
//! today; other roles are let through as free. Each key is then charged
//! against the sliding-window rate limiter.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::{AppState, WebError};

pub const API_KEY_HEADER: &str = "x-api-key";

pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| WebError::forbidden("Could not validate API key"))?;

    let record = state
        .api_keys
        .lookup(&key)?
        .ok_or_else(|| WebError::forbidden("Could not validate API key"))?;

    if record.role != "free" {
        tracing::warn!(role = %record.role, "unsupported API key role, treating as free");
    }

    if !state.rate_limiter.check(&record.key) {
        tracing::warn!(
            limit = state.rate_limiter.max_requests(),
            window_secs = state.rate_limiter.window().as_secs(),
            "rate limit exceeded"
        );
        return Err(WebError::too_many_requests("Rate limit exceeded"));
    }

    request.extensions_mut().insert(record);
    Ok(next.run(request).await)
}
