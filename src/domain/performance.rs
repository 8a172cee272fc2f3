//! Trade performance summary.

use serde::{Deserialize, Serialize};

use super::trade::Trade;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_trades: usize,
    pub winning_trades: usize,
    /// Gross profit over gross loss. Infinite with winners and no losers,
    /// zero when there is neither. Serialized as `null` when infinite.
    #[serde(with = "non_finite_as_null")]
    pub profit_factor: f64,
    pub win_rate: f64,
    pub net_profit: f64,
    pub threshold: f64,
}

impl PerformanceSummary {
    pub fn aggregate(trades: &[Trade], threshold: f64) -> Self {
        let mut winning_trades = 0usize;
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;

        for trade in trades {
            if trade.profit > 0.0 {
                winning_trades += 1;
                gross_profit += trade.profit;
            } else if trade.profit < 0.0 {
                gross_loss += trade.profit.abs();
            }
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        PerformanceSummary {
            total_trades,
            winning_trades,
            profit_factor,
            win_rate,
            net_profit: gross_profit - gross_loss,
            threshold,
        }
    }
}

mod non_finite_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}
