//! Loading every configured timeframe for one instrument.
//!
//! Policy:
//! 1. The primary timeframe must load, otherwise the run aborts
//! 2. A non-primary timeframe with weight 0 is not loaded at all
//! 3. A missing non-primary timeframe is logged and left out
//! 4. A store error (data present but unusable) always aborts
//!
//! Synthetic data is a demo/test mode; results are tagged with the source.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mtflab_core::data::{CsvStore, DataSource, ParquetStore, StoreError, TimeSeriesStore};
use mtflab_core::domain::{Bar, Granularity, TimeSeries};
use mtflab_core::timeframe::TimeframeSpec;

use crate::config::{BacktestSection, DataFormat, MtfConfig};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("primary timeframe {granularity} unavailable for {instrument}")]
    PrimaryUnavailable {
        instrument: String,
        granularity: Granularity,
    },

    #[error("failed to load {granularity}: {source}")]
    Store {
        granularity: Granularity,
        #[source]
        source: StoreError,
    },
}

/// Bars of one timeframe together with its spec.
#[derive(Debug, Clone)]
pub struct TimeframeData {
    pub spec: TimeframeSpec,
    pub bars: Vec<Bar>,
}

/// Why a configured timeframe is absent from a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ZeroWeight,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTimeframe {
    pub granularity: Granularity,
    pub reason: SkipReason,
}

/// Result of loading, with provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub instrument: String,
    pub primary: Granularity,
    /// Loaded timeframes, fine to coarse. Always contains the primary.
    pub frames: Vec<TimeframeData>,
    pub skipped: Vec<SkippedTimeframe>,
    pub source: DataSource,
    /// BLAKE3 over all loaded bars.
    pub dataset_hash: String,
}

impl LoadedData {
    pub fn frame(&self, granularity: Granularity) -> Option<&TimeframeData> {
        self.frames.iter().find(|f| f.spec.granularity == granularity)
    }

    pub fn primary_bars(&self) -> &[Bar] {
        self.frame(self.primary)
            .map(|f| f.bars.as_slice())
            .unwrap_or_default()
    }

    /// Primary close prices on the primary index.
    pub fn primary_close(&self) -> TimeSeries {
        let bars = self.primary_bars();
        TimeSeries::new(
            bars.iter().map(|b| b.timestamp).collect(),
            bars.iter().map(|b| b.close).collect(),
        )
    }

    /// Same bars, specs taken from `config` (for sweeps that only change windows).
    pub fn with_specs(&self, config: &MtfConfig) -> LoadedData {
        let mut data = self.clone();
        for frame in &mut data.frames {
            if let Some(spec) = config.spec(frame.spec.granularity) {
                frame.spec = spec.clone();
            }
        }
        data
    }
}

/// Load the primary and every weighted timeframe of `config`.
pub fn load_timeframes(
    store: &dyn TimeSeriesStore,
    config: &MtfConfig,
) -> Result<LoadedData, LoadError> {
    let instrument = config.backtest.instrument.as_str();
    let source = store.source();
    if source == DataSource::Synthetic {
        tracing::warn!(instrument, "using synthetic data, results are tagged as synthetic");
    }

    let mut frames = Vec::new();
    let mut skipped = Vec::new();

    for spec in &config.timeframes {
        let granularity = spec.granularity;
        let is_primary = granularity == config.primary;

        if spec.weight == 0.0 && !is_primary {
            tracing::info!(timeframe = %granularity, "weight 0, not loaded");
            skipped.push(SkippedTimeframe {
                granularity,
                reason: SkipReason::ZeroWeight,
            });
            continue;
        }

        let loaded = store
            .load(instrument, granularity)
            .map_err(|source| LoadError::Store {
                granularity,
                source,
            })?;

        match loaded {
            Some(bars) => {
                tracing::info!(timeframe = %granularity, bars = bars.len(), "loaded");
                frames.push(TimeframeData {
                    spec: spec.clone(),
                    bars,
                });
            }
            None if is_primary => {
                return Err(LoadError::PrimaryUnavailable {
                    instrument: instrument.to_string(),
                    granularity,
                });
            }
            None => {
                tracing::warn!(timeframe = %granularity, instrument, "timeframe unavailable, excluded");
                skipped.push(SkippedTimeframe {
                    granularity,
                    reason: SkipReason::Unavailable,
                });
            }
        }
    }

    let dataset_hash = compute_dataset_hash(instrument, &frames);

    Ok(LoadedData {
        instrument: instrument.to_string(),
        primary: config.primary,
        frames,
        skipped,
        source,
        dataset_hash,
    })
}

/// File-backed store for the configured data directory and format.
pub fn open_store(backtest: &BacktestSection) -> Box<dyn TimeSeriesStore> {
    let dir = backtest.data_dir.clone();
    match backtest.format {
        DataFormat::Csv => Box::new(CsvStore::new(dir)),
        DataFormat::Parquet => Box::new(ParquetStore::new(dir)),
    }
}

/// Deterministic BLAKE3 hash over instrument, timeframe codes and every bar.
fn compute_dataset_hash(instrument: &str, frames: &[TimeframeData]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(instrument.as_bytes());

    for frame in frames {
        hasher.update(frame.spec.granularity.code().as_bytes());
        for bar in &frame.bars {
            hasher.update(&bar.timestamp.timestamp_millis().to_le_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
            hasher.update(&bar.spread.unwrap_or(f64::NAN).to_le_bytes());
        }
    }

    hasher.finalize().to_hex().to_string()
}
