//! HTTP error responses for web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::error::{BacktestError, FlatlandError};

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }
}

pub fn status_from_error(err: &FlatlandError) -> StatusCode {
    match err {
        FlatlandError::ConfigMissing { .. }
        | FlatlandError::ConfigInvalid { .. }
        | FlatlandError::ConfigParse { .. } => StatusCode::BAD_REQUEST,
        FlatlandError::NoData { .. } | FlatlandError::Backtest(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        FlatlandError::Database { .. }
        | FlatlandError::DatabaseQuery { .. }
        | FlatlandError::DataFormat { .. }
        | FlatlandError::Report { .. }
        | FlatlandError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<FlatlandError> for WebError {
    fn from(err: FlatlandError) -> Self {
        let status = status_from_error(&err);
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }
        Self::new(status, err.to_string())
    }
}

impl From<BacktestError> for WebError {
    fn from(err: BacktestError) -> Self {
        FlatlandError::from(err).into()
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let err = FlatlandError::ConfigInvalid {
            section: "request".into(),
            key: "signal_limit".into(),
            reason: "must be at least 1".into(),
        };
        assert_eq!(status_from_error(&err), StatusCode::BAD_REQUEST);

        let err = FlatlandError::NoData {
            symbol: "BTC".into(),
            timeframe: "30m".into(),
        };
        assert_eq!(status_from_error(&err), StatusCode::UNPROCESSABLE_ENTITY);

        let err = FlatlandError::from(BacktestError::NoSignalsFound { threshold: 350.0 });
        assert_eq!(status_from_error(&err), StatusCode::UNPROCESSABLE_ENTITY);

        let err = FlatlandError::Database {
            reason: "locked".into(),
        };
        assert_eq!(status_from_error(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn backtest_error_converts() {
        let web: WebError = BacktestError::InsufficientData { candles: 1 }.into();
        assert_eq!(web.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(web.message.contains("insufficient data"));
    }
}
