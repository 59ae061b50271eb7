//! Look-ahead contamination tests.
//!
//! No value at primary bar t may depend on data from after t, at any stage:
//! indicators, per-timeframe signals, and the blended confluence score.
//!
//! Method: compute on a truncated history and on the full history, assert
//! the overlapping prefix is identical.

use chrono::{Duration, TimeZone, Utc};
use mtflab_core::confluence::{build_confluence, WeightedSignal};
use mtflab_core::data::{resample, SyntheticConfig, SyntheticStore};
use mtflab_core::domain::{Bar, Granularity};
use mtflab_core::indicators::{Indicator, Rsi, Sma};
use mtflab_core::signal::compute_timeframe_signal;
use mtflab_core::timeframe::TimeframeSpec;

/// Hourly bars with a deterministic LCG walk.
fn make_test_bars(n: usize) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut price = 100.0;
    (0..n)
        .map(|i| {
            let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
            let change = ((seed % 200) as f64 - 100.0) * 0.05;
            price = (price + change).max(10.0);
            Bar {
                timestamp: start + Duration::hours(i as i64),
                open: price - 0.5,
                high: price + 2.0,
                low: price - 2.0,
                close: price + 0.3,
                volume: 1000,
                spread: None,
            }
        })
        .collect()
}

fn assert_prefix_equal(label: &str, truncated: &[f64], full: &[f64]) {
    for (i, (t, f)) in truncated.iter().zip(full).enumerate() {
        if t.is_nan() && f.is_nan() {
            continue;
        }
        assert!(
            !t.is_nan() && !f.is_nan(),
            "{label}: NaN mismatch at bar {i} (truncated={t}, full={f})"
        );
        assert!(
            (t - f).abs() < 1e-10,
            "{label}: look-ahead contamination at bar {i}: truncated={t}, full={f}"
        );
    }
}

fn assert_no_lookahead(indicator: &dyn Indicator, full_bars: &[Bar], truncated_len: usize) {
    let truncated = indicator.compute(&full_bars[..truncated_len]);
    let full = indicator.compute(full_bars);
    assert_eq!(truncated.len(), truncated_len);
    assert_eq!(full.len(), full_bars.len());
    assert_prefix_equal(indicator.name(), &truncated, &full);
}

#[test]
fn lookahead_sma() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Sma::new(10), &bars, 100);
    assert_no_lookahead(&Sma::new(50), &bars, 100);
}

#[test]
fn lookahead_rsi() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Rsi::new(14), &bars, 100);
    assert_no_lookahead(&Rsi::new(3), &bars, 100);
}

#[test]
fn lookahead_timeframe_signal() {
    let bars = make_test_bars(300);
    let spec = TimeframeSpec::new(Granularity::H1, 1.0).with_windows(5, 20);
    let truncated = compute_timeframe_signal(&bars[..150], &spec);
    let full = compute_timeframe_signal(&bars, &spec);
    assert_prefix_equal("signal", &truncated.series.values, &full.series.values);
}

fn weighted(bars: &[Bar], spec: &TimeframeSpec) -> WeightedSignal {
    WeightedSignal {
        signal: compute_timeframe_signal(bars, spec),
        weight: spec.weight,
    }
}

fn confluence_from_hourly(
    h1: &[Bar],
    h4_spec: &TimeframeSpec,
    d_spec: &TimeframeSpec,
) -> mtflab_core::confluence::ConfluenceScore {
    let h4 = resample(h1, Granularity::H4);
    let d = resample(h1, Granularity::D);
    build_confluence(
        Granularity::H4,
        &[weighted(&h4, h4_spec), weighted(&d, d_spec)],
    )
    .unwrap()
}

/// Every H4 score must already be final when that H4 bar closes: rebuilding
/// all timeframes from the hourly history known at that moment, including a
/// still-forming daily bar, gives the same value as the full history.
#[test]
fn lookahead_confluence_score() {
    let store = SyntheticStore::new(SyntheticConfig {
        bars: 24 * 120,
        ..Default::default()
    });
    let h1 = store.base_bars("EUR_USD");

    let h4_spec = TimeframeSpec::new(Granularity::H4, 0.6).with_windows(5, 20);
    let d_spec = TimeframeSpec::new(Granularity::D, 0.4)
        .with_windows(3, 10)
        .with_rsi_period(5);

    let full = confluence_from_hourly(&h1, &h4_spec, &d_spec);
    assert_eq!(full.len(), 120 * 6);

    let mut leaks = Vec::new();
    for k in 0..full.len() {
        let known = &h1[..(k + 1) * 4];
        let partial = confluence_from_hourly(known, &h4_spec, &d_spec);
        assert_eq!(partial.len(), k + 1);

        let (p, f) = (partial.series.values[k], full.series.values[k]);
        let same = (p.is_nan() && f.is_nan()) || (p - f).abs() < 1e-10;
        if !same {
            leaks.push((k, full.series.index[k], p, f));
        }
    }
    assert!(leaks.is_empty(), "scores depend on later hourly data: {leaks:?}");
}

#[test]
fn lookahead_confluence_prefix_survives_truncation() {
    let store = SyntheticStore::new(SyntheticConfig {
        bars: 24 * 60,
        ..Default::default()
    });
    let h1 = store.base_bars("EUR_USD");
    let h4_spec = TimeframeSpec::new(Granularity::H4, 0.6).with_windows(5, 20);
    let d_spec = TimeframeSpec::new(Granularity::D, 0.4)
        .with_windows(3, 10)
        .with_rsi_period(5);

    let full = confluence_from_hourly(&h1, &h4_spec, &d_spec);
    // Cut mid-day so the last daily bar is incomplete.
    let truncated = confluence_from_hourly(&h1[..24 * 30 + 13], &h4_spec, &d_spec);
    let closed = truncated.len() - 1;
    assert_prefix_equal(
        "confluence",
        &truncated.series.values[..closed],
        &full.series.values[..closed],
    );
}
