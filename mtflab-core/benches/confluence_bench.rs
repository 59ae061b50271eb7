//! Criterion benchmarks for the confluence hot paths.
//!
//! Benchmarks:
//! 1. Timeframe signal (SMA pair + RSI votes)
//! 2. Forward-fill of a daily signal onto an H4 index
//! 3. Full confluence build over four timeframes

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use mtflab_core::confluence::{build_confluence, forward_fill_closed, WeightedSignal};
use mtflab_core::data::{resample, SyntheticConfig, SyntheticStore};
use mtflab_core::domain::{Bar, Granularity};
use mtflab_core::signal::compute_timeframe_signal;
use mtflab_core::timeframe::TimeframeSpec;

// ── Helpers ──────────────────────────────────────────────────────────

fn hourly_bars(days: usize) -> Vec<Bar> {
    SyntheticStore::new(SyntheticConfig {
        bars: days * 24,
        ..Default::default()
    })
    .base_bars("BENCH")
}

fn specs() -> Vec<TimeframeSpec> {
    vec![
        TimeframeSpec::new(Granularity::H1, 0.1),
        TimeframeSpec::new(Granularity::H4, 0.4),
        TimeframeSpec::new(Granularity::D, 0.3),
        TimeframeSpec::new(Granularity::W, 0.2).with_windows(4, 12),
    ]
}

// ── 1. Timeframe signal ──────────────────────────────────────────────

fn bench_signal(c: &mut Criterion) {
    let mut group = c.benchmark_group("timeframe_signal");
    let spec = TimeframeSpec::new(Granularity::H4, 1.0);

    for &days in &[90, 365, 730] {
        let h4 = resample(&hourly_bars(days), Granularity::H4);
        group.bench_with_input(BenchmarkId::new("h4_20_50_14", h4.len()), &h4, |b, bars| {
            b.iter(|| compute_timeframe_signal(black_box(bars), black_box(&spec)));
        });
    }

    group.finish();
}

// ── 2. Forward-fill ──────────────────────────────────────────────────

fn bench_forward_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward_fill");

    for &days in &[365, 730] {
        let h1 = hourly_bars(days);
        let h4 = resample(&h1, Granularity::H4);
        let d = resample(&h1, Granularity::D);
        let daily = compute_timeframe_signal(&d, &TimeframeSpec::new(Granularity::D, 1.0));
        let index: Vec<_> = h4.iter().map(|b| b.timestamp).collect();

        group.bench_with_input(BenchmarkId::new("d_onto_h4", index.len()), &index, |b, idx| {
            b.iter(|| {
                forward_fill_closed(
                    black_box(&daily.series),
                    Granularity::D,
                    black_box(idx),
                    Granularity::H4,
                )
            });
        });
    }

    group.finish();
}

// ── 3. Full confluence ───────────────────────────────────────────────

fn bench_confluence(c: &mut Criterion) {
    let mut group = c.benchmark_group("confluence");

    for &days in &[365, 730] {
        let h1 = hourly_bars(days);
        let signals: Vec<WeightedSignal> = specs()
            .iter()
            .map(|spec| {
                let bars = if spec.granularity == Granularity::H1 {
                    h1.clone()
                } else {
                    resample(&h1, spec.granularity)
                };
                WeightedSignal {
                    signal: compute_timeframe_signal(&bars, spec),
                    weight: spec.weight,
                }
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("four_timeframes", days), &signals, |b, s| {
            b.iter(|| build_confluence(Granularity::H4, black_box(s)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_signal, bench_forward_fill, bench_confluence);
criterion_main!(benches);
