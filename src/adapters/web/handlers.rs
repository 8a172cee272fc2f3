//! HTTP request handlers for web adapter.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Response},
};
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::adapters::html_report_adapter::HtmlReportAdapter;
use crate::domain::backtest::{self, BacktestParams};
use crate::domain::candle::parse_timestamp;
use crate::domain::error::FlatlandError;
use crate::domain::signal::SignalSelection;
use crate::ports::report_port::ReportPort;

use super::{AppState, WebError};

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Flatland backtest API" }))
}

pub async fn not_found() -> WebError {
    WebError::not_found("Not found")
}

#[derive(Debug, Deserialize)]
pub struct BacktestRequest {
    pub symbol: String,
    pub start_time: String,
    pub end_time: String,
    pub threshold: Option<f64>,
    pub distance_threshold: Option<f64>,
    pub signal_limit: Option<usize>,
    pub signal_selection: Option<SignalSelection>,
}

fn invalid(key: &str, reason: impl Into<String>) -> FlatlandError {
    FlatlandError::ConfigInvalid {
        section: "request".to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn request_time(key: &str, value: &str) -> Result<NaiveDateTime, FlatlandError> {
    parse_timestamp(value)
        .ok_or_else(|| invalid(key, "expected YYYY-MM-DD[THH:MM:SS]"))
}

impl BacktestRequest {
    /// Validate the request and resolve defaults.
    pub fn into_params(
        self,
    ) -> Result<(BacktestParams, NaiveDateTime, NaiveDateTime), FlatlandError> {
        let symbol = self.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(invalid("symbol", "symbol must not be empty"));
        }

        let start = request_time("start_time", &self.start_time)?;
        let end = request_time("end_time", &self.end_time)?;
        if start >= end {
            return Err(invalid("start_time", "start_time must be before end_time"));
        }

        let mut params = BacktestParams::new(symbol);
        if let Some(threshold) = self.threshold {
            if !threshold.is_finite() {
                return Err(invalid("threshold", "threshold must be finite"));
            }
            params.threshold = threshold;
        }
        if let Some(d) = self.distance_threshold {
            if !(0.0..1.0).contains(&d) {
                return Err(invalid("distance_threshold", "distance_threshold must be in [0, 1)"));
            }
            params.distance_threshold = d;
        }
        if let Some(limit) = self.signal_limit {
            if limit == 0 {
                return Err(invalid("signal_limit", "signal_limit must be at least 1"));
            }
            params.signal_limit = limit;
        }
        if let Some(selection) = self.signal_selection {
            params.selection = selection;
        }

        Ok((params, start, end))
    }
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

pub async fn flatland_backtest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<BacktestRequest>, JsonRejection>,
) -> Result<Response, WebError> {
    let Json(request) = payload.map_err(|rejection| WebError::bad_request(rejection.body_text()))?;
    let (params, start, end) = request.into_params()?;

    let candles = state.data_port.fetch_candles(
        &params.symbol,
        &state.timeframe,
        Some(start),
        Some(end),
    )?;
    if candles.is_empty() {
        return Err(FlatlandError::NoData {
            symbol: params.symbol,
            timeframe: state.timeframe.clone(),
        }
        .into());
    }

    let report = backtest::run(&candles, &params)?;
    tracing::info!(
        symbol = %report.symbol,
        candles = candles.len(),
        trades = report.performance.total_trades,
        net_profit = report.performance.net_profit,
        "backtest served"
    );

    if wants_html(&headers) {
        let html = HtmlReportAdapter::new(params.signal_limit).render(&report)?;
        Ok(Html(html).into_response())
    } else {
        Ok(Json(report).into_response())
    }
}
