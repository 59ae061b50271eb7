//! MTF runner: wires together loading, signals, confluence and validation.
//!
//! Two entry points:
//! - `run_mtf()`: loads every timeframe from a store, then runs. Used by the CLI.
//! - `run_from_data()`: takes pre-loaded data. Used by sweeps, which load once
//!   and vary only thresholds and windows.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mtflab_core::confluence::{build_confluence, ConfluenceError, ConfluenceScore, WeightedSignal};
use mtflab_core::data::TimeSeriesStore;
use mtflab_core::domain::{Granularity, TimeSeries};
use mtflab_core::rules;
use mtflab_core::signal::compute_timeframe_signal;
use mtflab_core::sim::SimulationEngine;
use mtflab_core::validation::{run_validation, ValidationError};

use crate::config::{ConfigError, MtfConfig};
use crate::cost::estimate_fee;
use crate::data_loader::{load_timeframes, LoadError, LoadedData};
use crate::reporting::{MtfReport, SCHEMA_VERSION};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("confluence error: {0}")]
    Confluence(#[from] ConfluenceError),
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

// ─── Diagnostics ─────────────────────────────────────────────────────

/// Native-resolution view of one timeframe's signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeStats {
    pub granularity: Granularity,
    pub weight: f64,
    pub bars: usize,
    /// Share of defined signal bars that are +1.
    pub bullish: f64,
    /// Share of defined signal bars that are -1.
    pub bearish: f64,
}

/// How the blended score sits against the threshold over the full period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalDistribution {
    pub long: usize,
    pub short: usize,
    pub neutral: usize,
    /// Bars where no timeframe had a defined signal yet.
    pub undefined: usize,
}

impl SignalDistribution {
    pub fn from_scores(scores: &[f64], threshold: f64) -> Self {
        scores.iter().fold(Self::default(), |mut d, &s| {
            if s.is_nan() {
                d.undefined += 1;
            } else if rules::long_entry(s, threshold) {
                d.long += 1;
            } else if rules::short_entry(s, threshold) {
                d.short += 1;
            } else {
                d.neutral += 1;
            }
            d
        })
    }

    pub fn total(&self) -> usize {
        self.long + self.short + self.neutral + self.undefined
    }

    /// `count` as a fraction of all bars.
    pub fn share(&self, count: usize) -> f64 {
        match self.total() {
            0 => 0.0,
            total => count as f64 / total as f64,
        }
    }
}

/// Everything one run produces: the report plus the series behind it.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub report: MtfReport,
    pub score: ConfluenceScore,
    pub close: TimeSeries,
}

// ─── Pipeline ────────────────────────────────────────────────────────

/// Per-timeframe signals and their blend onto the primary index.
pub fn compute_confluence(
    data: &LoadedData,
) -> Result<(ConfluenceScore, Vec<TimeframeStats>), ConfluenceError> {
    let signals: Vec<WeightedSignal> = data
        .frames
        .iter()
        .map(|frame| WeightedSignal {
            signal: compute_timeframe_signal(&frame.bars, &frame.spec),
            weight: frame.spec.weight,
        })
        .collect();

    let stats: Vec<TimeframeStats> = signals
        .iter()
        .zip(&data.frames)
        .map(|(ws, frame)| TimeframeStats {
            granularity: frame.spec.granularity,
            weight: ws.weight,
            bars: frame.bars.len(),
            bullish: ws.signal.bullish_fraction(),
            bearish: ws.signal.bearish_fraction(),
        })
        .collect();

    for s in &stats {
        tracing::info!(
            timeframe = %s.granularity,
            weight = s.weight,
            bars = s.bars,
            bullish_pct = s.bullish * 100.0,
            bearish_pct = s.bearish * 100.0,
            "timeframe signal"
        );
    }

    let score = build_confluence(data.primary, &signals)?;
    Ok((score, stats))
}

/// Run on data already in memory.
pub fn run_from_data(
    config: &MtfConfig,
    data: &LoadedData,
    engine: &dyn SimulationEngine,
) -> Result<RunOutput, RunError> {
    config.validate()?;

    let (score, timeframes) = compute_confluence(data)?;
    let distribution =
        SignalDistribution::from_scores(&score.series.values, config.confirmation_threshold);
    tracing::info!(
        long = distribution.long,
        short = distribution.short,
        neutral = distribution.neutral,
        undefined = distribution.undefined,
        "signal distribution"
    );

    let fee = estimate_fee(
        data.primary_bars(),
        config.backtest.cost_model,
        config.backtest.fees,
    );
    tracing::info!(fee = fee.fee, source = ?fee.source, "per-fill cost");

    let close = data.primary_close();
    let validation = run_validation(
        &close,
        &score.series,
        &config.validation_config(fee.fee),
        engine,
    )?;

    let report = MtfReport {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        instrument: data.instrument.clone(),
        primary: data.primary,
        data_source: data.source,
        dataset_hash: data.dataset_hash.clone(),
        threshold: config.confirmation_threshold,
        fee,
        bars: close.len(),
        first_timestamp: close.first_timestamp(),
        last_timestamp: close.last_timestamp(),
        total_weight: score.total_weight,
        timeframes,
        skipped: data.skipped.clone(),
        distribution,
        validation,
    };

    Ok(RunOutput {
        report,
        score,
        close,
    })
}

/// Load from `store`, then run.
pub fn run_mtf(
    config: &MtfConfig,
    store: &dyn TimeSeriesStore,
    engine: &dyn SimulationEngine,
) -> Result<RunOutput, RunError> {
    config.validate()?;
    let data = load_timeframes(store, config)?;
    run_from_data(config, &data, engine)
}
