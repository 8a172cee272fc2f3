//! HTML report adapter implementing ReportPort.
//!
//! Renders `templates/report.html` with Askama: each trade becomes a segment
//! from entry to exit on an inline SVG with a dark background. Winning trades
//! are green, everything else red.

use askama::Template;
use chrono::NaiveDateTime;

use crate::domain::backtest::{BacktestReport, DEFAULT_SIGNAL_LIMIT};
use crate::domain::candle::format_timestamp;
use crate::domain::error::FlatlandError;
use crate::domain::trade::Trade;
use crate::ports::report_port::ReportPort;

const WIDTH: f64 = 900.0;
const HEIGHT: f64 = 450.0;
const PADDING: f64 = 60.0;

const BACKGROUND: &str = "#111111";
const GRID: &str = "#444444";
const TEXT: &str = "#e0e0e0";
const WIN: &str = "#00c853";
const LOSS: &str = "#ff1744";

/// Renders backtest reports. The title names the configured signal limit,
/// not the number of trades found.
pub struct HtmlReportAdapter {
    signal_limit: usize,
}

impl HtmlReportAdapter {
    pub fn new(signal_limit: usize) -> Self {
        Self { signal_limit }
    }
}

impl Default for HtmlReportAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_SIGNAL_LIMIT)
    }
}

pub fn chart_title(report: &BacktestReport, signal_limit: usize) -> String {
    format!(
        "Flatland Backtest for {} (Last {} Signals)",
        report.symbol,
        signal_limit
    )
}

fn tooltip(trade: &Trade) -> String {
    format!(
        "{} Entry: {:.2} at {}\nR_1: {:.2}\nR_2: {:.2}\nExit: {:.2} at {}\nProfit: {:.2}",
        trade.direction,
        trade.entry_price,
        format_timestamp(&trade.entry_time),
        trade.r1,
        trade.r2,
        trade.exit_price,
        format_timestamp(&trade.exit_time),
        trade.profit
    )
}

/// Maps trade times and prices into SVG coordinates.
struct Scale {
    t0: NaiveDateTime,
    seconds_per_px: f64,
    min_price: f64,
    price_per_px: f64,
}

impl Scale {
    fn fit(trades: &[Trade]) -> Option<Self> {
        let t0 = trades.iter().map(|t| t.entry_time).min()?;
        let t1 = trades.iter().map(|t| t.exit_time).max()?;
        let prices = trades.iter().flat_map(|t| [t.entry_price, t.exit_price]);
        let min_price = prices.clone().fold(f64::INFINITY, f64::min);
        let max_price = prices.fold(f64::NEG_INFINITY, f64::max);

        let plot_w = WIDTH - 2.0 * PADDING;
        let plot_h = HEIGHT - 2.0 * PADDING;
        let span_secs = (t1 - t0).num_seconds().max(1) as f64;
        let span_price = if max_price > min_price {
            max_price - min_price
        } else {
            1.0
        };

        Some(Self {
            t0,
            seconds_per_px: span_secs / plot_w,
            min_price,
            price_per_px: span_price / plot_h,
        })
    }

    fn x(&self, t: NaiveDateTime) -> f64 {
        PADDING + (t - self.t0).num_seconds() as f64 / self.seconds_per_px
    }

    fn y(&self, price: f64) -> f64 {
        HEIGHT - PADDING - (price - self.min_price) / self.price_per_px
    }
}

struct Segment {
    tooltip: String,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    color: &'static str,
}

impl Segment {
    fn new(trade: &Trade, scale: &Scale) -> Self {
        Self {
            tooltip: tooltip(trade),
            x1: scale.x(trade.entry_time),
            y1: scale.y(trade.entry_price),
            x2: scale.x(trade.exit_time),
            y2: scale.y(trade.exit_price),
            color: if trade.profit > 0.0 { WIN } else { LOSS },
        }
    }
}

#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate {
    title: String,
    segments: Vec<Segment>,
    width: f64,
    height: f64,
    padding: f64,
    bottom: f64,
    right: f64,
    label_y: f64,
    background: &'static str,
    grid: &'static str,
    text: &'static str,
}

impl ReportPort for HtmlReportAdapter {
    fn render(&self, report: &BacktestReport) -> Result<String, FlatlandError> {
        if report.trades.is_empty() {
            tracing::warn!(symbol = %report.symbol, "no trades to plot");
            return Ok(String::new());
        }

        if let Some(bad) = report
            .trades
            .iter()
            .find(|t| !t.entry_price.is_finite() || !t.exit_price.is_finite())
        {
            return Err(FlatlandError::Report {
                reason: format!(
                    "cannot plot trade entered at {}: non-finite price",
                    format_timestamp(&bad.entry_time)
                ),
            });
        }

        let scale = Scale::fit(&report.trades).ok_or_else(|| FlatlandError::Report {
            reason: "no trades to scale".to_string(),
        })?;

        let template = ReportTemplate {
            title: chart_title(report, self.signal_limit),
            segments: report
                .trades
                .iter()
                .map(|t| Segment::new(t, &scale))
                .collect(),
            width: WIDTH,
            height: HEIGHT,
            padding: PADDING,
            bottom: HEIGHT - PADDING,
            right: WIDTH - PADDING,
            label_y: HEIGHT - PADDING / 3.0,
            background: BACKGROUND,
            grid: GRID,
            text: TEXT,
        };

        template.render().map_err(|e| FlatlandError::Report {
            reason: e.to_string(),
        })
    }
}
