//! Per-timeframe directional signal.
//!
//! A timeframe's signal is the sum of two named component votes, each worth
//! ±0.5, so the signal takes values in {-1, 0, +1}. Any undefined input
//! indicator makes the whole signal undefined (NaN) at that bar.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Granularity, TimeSeries};
use crate::indicators::{Indicator, Rsi, Sma};
use crate::timeframe::TimeframeSpec;

const VOTE: f64 = 0.5;
const RSI_MIDLINE: f64 = 50.0;

/// Indicator readings at one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorReadings {
    pub fast_ma: f64,
    pub slow_ma: f64,
    pub rsi: f64,
}

/// The voting components of a timeframe signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalComponent {
    /// +0.5 when the fast MA is strictly above the slow MA, else -0.5.
    Trend,
    /// +0.5 when RSI is strictly above 50, else -0.5.
    Momentum,
}

impl SignalComponent {
    pub const ALL: [SignalComponent; 2] = [SignalComponent::Trend, SignalComponent::Momentum];

    /// This component's vote, NaN when its inputs are undefined.
    pub fn vote(self, readings: &IndicatorReadings) -> f64 {
        match self {
            SignalComponent::Trend => {
                if readings.fast_ma.is_nan() || readings.slow_ma.is_nan() {
                    f64::NAN
                } else if readings.fast_ma > readings.slow_ma {
                    VOTE
                } else {
                    -VOTE
                }
            }
            SignalComponent::Momentum => {
                if readings.rsi.is_nan() {
                    f64::NAN
                } else if readings.rsi > RSI_MIDLINE {
                    VOTE
                } else {
                    -VOTE
                }
            }
        }
    }
}

/// Sum of all component votes; NaN propagates.
pub fn combine_votes(readings: &IndicatorReadings) -> f64 {
    SignalComponent::ALL.iter().map(|c| c.vote(readings)).sum()
}

/// Directional signal of one timeframe on its native index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalSignal {
    pub granularity: Granularity,
    pub series: TimeSeries,
}

impl DirectionalSignal {
    /// Fraction of defined bars with a positive signal.
    pub fn bullish_fraction(&self) -> f64 {
        self.fraction(|v| v > 0.0)
    }

    /// Fraction of defined bars with a negative signal.
    pub fn bearish_fraction(&self) -> f64 {
        self.fraction(|v| v < 0.0)
    }

    fn fraction(&self, pred: impl Fn(f64) -> bool) -> f64 {
        let defined = self.series.defined_count();
        if defined == 0 {
            return 0.0;
        }
        let hits = self
            .series
            .values
            .iter()
            .filter(|v| !v.is_nan() && pred(**v))
            .count();
        hits as f64 / defined as f64
    }
}

/// Compute the directional signal of one timeframe.
///
/// Windows must be >= 1; `TimeframeSpec::validate` guarantees this for
/// configured specs.
pub fn compute_timeframe_signal(bars: &[Bar], spec: &TimeframeSpec) -> DirectionalSignal {
    let fast = Sma::new(spec.fast_window).compute(bars);
    let slow = Sma::new(spec.slow_window).compute(bars);
    let rsi = Rsi::new(spec.rsi_period).compute(bars);

    let values = (0..bars.len())
        .map(|i| {
            combine_votes(&IndicatorReadings {
                fast_ma: fast[i],
                slow_ma: slow[i],
                rsi: rsi[i],
            })
        })
        .collect();

    DirectionalSignal {
        granularity: spec.granularity,
        series: TimeSeries::new(bars.iter().map(|b| b.timestamp).collect(), values),
    }
}
