//! Per-fill transaction cost estimate.
//!
//! FX candles usually carry the quoted spread. When they do, the mean
//! relative spread over the primary bars is a better cost proxy than a flat
//! fee; when they don't, the configured fee is used as-is.

use serde::{Deserialize, Serialize};

use mtflab_core::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostModel {
    /// Always charge the configured fee.
    Fixed,
    /// Mean of `spread / close` over bars that quote a spread.
    #[default]
    MeanSpread,
}

/// Where the fee used in a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeeSource {
    Fixed,
    Spread { bars_with_spread: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeEstimate {
    /// Fraction of traded value charged per fill.
    pub fee: f64,
    pub source: FeeSource,
}

pub fn estimate_fee(bars: &[Bar], model: CostModel, fixed_fee: f64) -> FeeEstimate {
    let fixed = FeeEstimate {
        fee: fixed_fee,
        source: FeeSource::Fixed,
    };
    if model == CostModel::Fixed {
        return fixed;
    }

    let (sum, count) = bars
        .iter()
        .filter_map(Bar::relative_spread)
        .filter(|s| s.is_finite() && *s >= 0.0)
        .fold((0.0, 0usize), |(sum, n), s| (sum + s, n + 1));

    if count == 0 {
        tracing::debug!("no spread column on primary bars, using fixed fee");
        return fixed;
    }

    FeeEstimate {
        fee: sum / count as f64,
        source: FeeSource::Spread {
            bars_with_spread: count,
        },
    }
}
