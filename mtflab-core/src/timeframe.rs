//! Per-timeframe configuration: indicator windows and blending weight.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Granularity;

pub const DEFAULT_FAST_WINDOW: usize = 20;
pub const DEFAULT_SLOW_WINDOW: usize = 50;
pub const DEFAULT_RSI_PERIOD: usize = 14;

/// One configured timeframe. Built once from configuration, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeSpec {
    pub granularity: Granularity,
    pub fast_window: usize,
    pub slow_window: usize,
    pub rsi_period: usize,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimeframeError {
    #[error("{granularity}: weight must be a finite value in [0, 1], got {weight}")]
    InvalidWeight { granularity: Granularity, weight: f64 },

    #[error("{granularity}: {field} must be >= 1")]
    ZeroWindow {
        granularity: Granularity,
        field: &'static str,
    },

    #[error("{granularity}: fast window ({fast}) must be shorter than slow window ({slow})")]
    FastNotBelowSlow {
        granularity: Granularity,
        fast: usize,
        slow: usize,
    },
}

impl TimeframeSpec {
    /// Spec with the default windows (20 / 50 / RSI 14).
    pub fn new(granularity: Granularity, weight: f64) -> Self {
        Self {
            granularity,
            fast_window: DEFAULT_FAST_WINDOW,
            slow_window: DEFAULT_SLOW_WINDOW,
            rsi_period: DEFAULT_RSI_PERIOD,
            weight,
        }
    }

    pub fn with_windows(mut self, fast: usize, slow: usize) -> Self {
        self.fast_window = fast;
        self.slow_window = slow;
        self
    }

    pub fn with_rsi_period(mut self, period: usize) -> Self {
        self.rsi_period = period;
        self
    }

    /// Bars required before the signal is defined.
    pub fn warmup(&self) -> usize {
        (self.slow_window.max(self.fast_window) - 1).max(self.rsi_period)
    }

    pub fn validate(&self) -> Result<(), TimeframeError> {
        let granularity = self.granularity;
        if !self.weight.is_finite() || !(0.0..=1.0).contains(&self.weight) {
            return Err(TimeframeError::InvalidWeight {
                granularity,
                weight: self.weight,
            });
        }
        for (field, value) in [
            ("fast_ma", self.fast_window),
            ("slow_ma", self.slow_window),
            ("rsi_period", self.rsi_period),
        ] {
            if value == 0 {
                return Err(TimeframeError::ZeroWindow { granularity, field });
            }
        }
        if self.fast_window >= self.slow_window {
            return Err(TimeframeError::FastNotBelowSlow {
                granularity,
                fast: self.fast_window,
                slow: self.slow_window,
            });
        }
        Ok(())
    }
}
