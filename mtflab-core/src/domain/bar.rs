//! Bar: one OHLC candle of a single instrument at a single granularity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLC candle stamped with its open time (UTC).
///
/// `spread` is the quoted bid/ask spread in price units when the source
/// carries it; it feeds the transaction-cost estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: u64,
    #[serde(default)]
    pub spread: Option<f64>,
}

impl Bar {
    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// High bounds open/close from above, low from below, prices positive.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low > 0.0
    }

    /// Spread as a fraction of the close, if both are usable.
    pub fn relative_spread(&self) -> Option<f64> {
        match self.spread {
            Some(s) if s.is_finite() && s >= 0.0 && self.close > 0.0 => Some(s / self.close),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_bar() -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap(),
            open: 1.1000,
            high: 1.1050,
            low: 1.0980,
            close: 1.1030,
            volume: 1_200,
            spread: Some(0.00011),
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.close = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_inverted_range() {
        let mut bar = sample_bar();
        bar.high = 1.0900;
        assert!(!bar.is_sane());
    }

    #[test]
    fn relative_spread_uses_close() {
        let bar = sample_bar();
        let rel = bar.relative_spread().unwrap();
        assert!((rel - 0.00011 / 1.1030).abs() < 1e-15);
    }

    #[test]
    fn relative_spread_absent_or_invalid() {
        let mut bar = sample_bar();
        bar.spread = None;
        assert_eq!(bar.relative_spread(), None);
        bar.spread = Some(f64::NAN);
        assert_eq!(bar.relative_spread(), None);
    }

    #[test]
    fn bar_deserializes_without_optional_columns() {
        let json = r#"{"timestamp":"2024-01-02T08:00:00Z","open":1.0,"high":1.2,"low":0.9,"close":1.1}"#;
        let bar: Bar = serde_json::from_str(json).unwrap();
        assert_eq!(bar.volume, 0);
        assert_eq!(bar.spread, None);
    }
}
