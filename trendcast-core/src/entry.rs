//! Entry/stop decision.
//!
//! An entry fires only when the trend is bullish, RSI is below the
//! overbought level and MACD is above its signal line. The stop is a fixed
//! percentage below the entry. When the conditions do not align the result
//! is `None`, never a zero or NaN price.

use serde::{Deserialize, Serialize};

use crate::indicators::IndicatorSnapshot;
use crate::trend::Trend;

/// Recommended long entry and protective stop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryPlan {
    pub entry_price: f64,
    pub stop_loss: f64,
}

/// Thresholds for the entry decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryRule {
    /// RSI must be strictly below this level.
    pub rsi_overbought: f64,
    /// Stop distance below entry, in percent (5.0 = 5%).
    pub stoploss_percent: f64,
}

impl Default for EntryRule {
    fn default() -> Self {
        Self {
            rsi_overbought: 70.0,
            stoploss_percent: 5.0,
        }
    }
}

impl EntryRule {
    pub fn evaluate(&self, trend: Trend, snap: &IndicatorSnapshot) -> Option<EntryPlan> {
        // NaN fails every comparison, so undefined inputs never fire.
        let fires =
            trend.is_bullish() && snap.rsi < self.rsi_overbought && snap.macd > snap.macd_signal;
        if !fires || !snap.close.is_finite() {
            return None;
        }
        let entry_price = snap.close;
        Some(EntryPlan {
            entry_price,
            stop_loss: entry_price * (1.0 - self.stoploss_percent / 100.0),
        })
    }
}
