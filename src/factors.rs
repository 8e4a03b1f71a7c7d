use serde::{Deserialize, Serialize};

/// Predefined factors expressed in the expression language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NamedFactor {
    /// Return over `lookback` scaled by the volatility of daily returns.
    Momentum { lookback: usize },
    /// Negative z-score of price against its rolling mean.
    MeanReversion { lookback: usize },
    /// Weighted time-series rank of returns over three horizons.
    RelativeStrength { lookback: usize },
    /// Alpha101 #42 variant on high price and volume.
    Alpha42,
}

impl NamedFactor {
    pub const fn momentum() -> Self {
        Self::Momentum { lookback: 252 }
    }

    pub const fn mean_reversion() -> Self {
        Self::MeanReversion { lookback: 20 }
    }

    pub const fn relative_strength() -> Self {
        Self::RelativeStrength { lookback: 60 }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Momentum { .. } => "momentum",
            Self::MeanReversion { .. } => "mean_reversion",
            Self::RelativeStrength { .. } => "relative_strength",
            Self::Alpha42 => "alpha42",
        }
    }

    pub fn expression(&self) -> String {
        match *self {
            Self::Momentum { lookback } => format!(
                "ts_pct_change(close, {lookback}) / ts_std(ts_pct_change(close, 1), {lookback})"
            ),
            Self::MeanReversion { lookback } => {
                format!("-(close - ts_mean(close, {lookback})) / ts_std(close, {lookback})")
            }
            Self::RelativeStrength { lookback } => {
                // Window params must stay >= 1.
                let short = (lookback / 3).max(1);
                let long = lookback.saturating_mul(2);
                format!(
                    "0.5 * ts_rank(ts_pct_change(close, {short}), {lookback}) + \
                     0.3 * ts_rank(ts_pct_change(close, {lookback}), {lookback}) + \
                     0.2 * ts_rank(ts_pct_change(close, {long}), {lookback})"
                )
            }
            Self::Alpha42 => {
                "-ts_rank(ts_std(high, 10), 10) * ts_correlation(high, volume, 10)".to_string()
            }
        }
    }
}
