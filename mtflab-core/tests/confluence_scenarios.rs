//! End-to-end confluence scenarios: bars in, entries out.

use chrono::{Duration, TimeZone, Utc};
use mtflab_core::confluence::{build_confluence, ConfluenceError, WeightedSignal};
use mtflab_core::domain::{Bar, Granularity};
use mtflab_core::rules::{self, Direction};
use mtflab_core::signal::compute_timeframe_signal;
use mtflab_core::timeframe::TimeframeSpec;

/// Monotone bars so every signal is fully bullish or fully bearish after warmup.
fn trending_bars(granularity: Granularity, n: usize, step: f64) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let dt = Duration::seconds(granularity.seconds());
    (0..n)
        .map(|i| {
            let close = 100.0 + step * i as f64;
            let open = close - step;
            Bar {
                timestamp: start + dt * i as i32,
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume: 100,
                spread: None,
            }
        })
        .collect()
}

fn spec(granularity: Granularity, weight: f64) -> TimeframeSpec {
    TimeframeSpec::new(granularity, weight)
        .with_windows(2, 4)
        .with_rsi_period(3)
}

fn weighted(bars: &[Bar], spec: &TimeframeSpec) -> WeightedSignal {
    WeightedSignal {
        signal: compute_timeframe_signal(bars, spec),
        weight: spec.weight,
    }
}

#[test]
fn opposing_timeframes_blend_to_weight_difference() {
    let h4 = trending_bars(Granularity::H4, 120, 1.0);
    let d = trending_bars(Granularity::D, 20, -1.0);
    let h4_spec = spec(Granularity::H4, 0.6);
    let d_spec = spec(Granularity::D, 0.4);

    let score = build_confluence(
        Granularity::H4,
        &[weighted(&h4, &h4_spec), weighted(&d, &d_spec)],
    )
    .unwrap();

    let mut checked = 0;
    for i in 0..score.len() {
        if score.is_fully_covered(i) {
            assert!((score.series.values[i] - 0.2).abs() < 1e-12, "index {i}");
            checked += 1;
        }
    }
    assert!(checked > 50, "too few fully covered bars: {checked}");

    // While the daily signal is still warming up the primary stands alone.
    assert!(!score.is_fully_covered(h4_spec.warmup()));
    assert!((score.series.values[h4_spec.warmup()] - 1.0).abs() < 1e-12);

    // Threshold 0.3 never confirms on fully covered bars.
    let set = rules::generate(&score.series.values, 0.3).unwrap();
    let (entries, _) = set.for_direction(Direction::Long);
    let covered_entries = (0..score.len())
        .filter(|&i| score.is_fully_covered(i) && entries[i])
        .count();
    assert_eq!(covered_entries, 0);
    assert!(set.short_entries.iter().all(|&e| !e));
}

#[test]
fn partial_weights_recover_unit_scale() {
    let h4 = trending_bars(Granularity::H4, 60, 1.0);
    let d = trending_bars(Granularity::D, 10, 1.0);
    let score = build_confluence(
        Granularity::H4,
        &[
            weighted(&h4, &spec(Granularity::H4, 0.3)),
            weighted(&d, &spec(Granularity::D, 0.2)),
        ],
    )
    .unwrap();

    let last = score.len() - 1;
    assert!(score.is_fully_covered(last));
    assert!((score.series.values[last] - 1.0).abs() < 1e-12);
}

#[test]
fn all_zero_weights_abort() {
    let h4 = trending_bars(Granularity::H4, 30, 1.0);
    let d = trending_bars(Granularity::D, 5, 1.0);
    let err = build_confluence(
        Granularity::H4,
        &[
            weighted(&h4, &spec(Granularity::H4, 0.0)),
            weighted(&d, &spec(Granularity::D, 0.0)),
        ],
    )
    .unwrap_err();
    assert_eq!(err, ConfluenceError::ZeroTotalWeight);
}

#[test]
fn absent_secondary_leaves_primary_alone() {
    let h4 = trending_bars(Granularity::H4, 30, -1.0);
    let score = build_confluence(Granularity::H4, &[weighted(&h4, &spec(Granularity::H4, 0.4))])
        .unwrap();
    assert_eq!(score.contributors.len(), 1);
    assert!((score.series.values[29] + 1.0).abs() < 1e-12);

    let set = rules::generate(&score.series.values, 0.3).unwrap();
    assert!(set.short_entries[29]);
    assert!(set.long_exits[29]);
}
