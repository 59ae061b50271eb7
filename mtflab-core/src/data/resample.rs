//! Aggregation of fine bars into coarser granularities.

use crate::domain::{Bar, Granularity};

/// Aggregate ascending `bars` into buckets of `target`.
///
/// Each output bar is stamped with its bucket start: open of the first bar,
/// close of the last, extreme high/low, summed volume, mean of the available
/// spreads.
pub fn resample(bars: &[Bar], target: Granularity) -> Vec<Bar> {
    let mut out: Vec<Bar> = Vec::new();
    let mut spread_sum = 0.0;
    let mut spread_n = 0usize;

    for bar in bars {
        let bucket = target.bucket_start(bar.timestamp);
        match out.last_mut() {
            Some(current) if current.timestamp == bucket => {
                current.high = current.high.max(bar.high);
                current.low = current.low.min(bar.low);
                current.close = bar.close;
                current.volume += bar.volume;
            }
            _ => {
                if let Some(prev) = out.last_mut() {
                    prev.spread = mean_spread(spread_sum, spread_n);
                }
                spread_sum = 0.0;
                spread_n = 0;
                out.push(Bar {
                    timestamp: bucket,
                    spread: None,
                    ..bar.clone()
                });
            }
        }
        if let Some(s) = bar.spread {
            spread_sum += s;
            spread_n += 1;
        }
    }
    if let Some(last) = out.last_mut() {
        last.spread = mean_spread(spread_sum, spread_n);
    }
    out
}

fn mean_spread(sum: f64, n: usize) -> Option<f64> {
    (n > 0).then(|| sum / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn hourly(closes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                timestamp: start + Duration::hours(i as i64),
                open: c - 0.5,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 10,
                spread: Some(0.1 * (i + 1) as f64),
            })
            .collect()
    }

    #[test]
    fn h1_to_h4_ohlc() {
        let bars = hourly(&[10.0, 12.0, 8.0, 11.0, 20.0]);
        let h4 = resample(&bars, Granularity::H4);
        assert_eq!(h4.len(), 2);

        assert_eq!(h4[0].timestamp, bars[0].timestamp);
        assert_eq!(h4[0].open, 9.5);
        assert_eq!(h4[0].high, 13.0);
        assert_eq!(h4[0].low, 7.0);
        assert_eq!(h4[0].close, 11.0);
        assert_eq!(h4[0].volume, 40);
        assert!((h4[0].spread.unwrap() - 0.25).abs() < 1e-12);

        assert_eq!(h4[1].timestamp, bars[4].timestamp);
        assert_eq!(h4[1].close, 20.0);
        assert!((h4[1].spread.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn same_granularity_keeps_bars() {
        let bars = hourly(&[1.0, 2.0, 3.0]);
        let out = resample(&bars, Granularity::H1);
        assert_eq!(out.len(), 3);
        assert_eq!(out[2].close, 3.0);
    }

    #[test]
    fn empty_input() {
        assert!(resample(&[], Granularity::D).is_empty());
    }

    #[test]
    fn missing_spreads_stay_missing() {
        let mut bars = hourly(&[1.0, 2.0]);
        for b in &mut bars {
            b.spread = None;
        }
        assert_eq!(resample(&bars, Granularity::D)[0].spread, None);
    }
}
