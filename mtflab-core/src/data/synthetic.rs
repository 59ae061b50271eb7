//! Synthetic store for demos and tests.
//!
//! Generates one seeded random walk per instrument at a base granularity
//! and resamples it to every coarser request, so all timeframes of an
//! instrument describe the same price path. Finer-than-base requests are
//! unavailable. The data is clearly fake and tagged as synthetic.

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::resample::resample;
use super::store::{DataSource, StoreError, TimeSeriesStore};
use crate::domain::{Bar, Granularity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub start: DateTime<Utc>,
    /// Number of base-granularity bars to generate.
    pub bars: usize,
    pub base: Granularity,
    pub start_price: f64,
    /// Max absolute per-bar return of the noise term.
    pub volatility: f64,
    /// Mean quoted spread in price units.
    pub spread: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            start: Utc
                .with_ymd_and_hms(2020, 1, 6, 0, 0, 0)
                .single()
                .unwrap_or_default(),
            // Two years of hourly bars
            bars: 2 * 365 * 24,
            base: Granularity::H1,
            start_price: 1.10,
            volatility: 0.002,
            spread: 0.00012,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyntheticStore {
    config: SyntheticConfig,
}

impl SyntheticStore {
    pub fn new(config: SyntheticConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    /// Base-granularity bars for `instrument`.
    pub fn base_bars(&self, instrument: &str) -> Vec<Bar> {
        let cfg = &self.config;

        // Deterministic seed from instrument name and configured seed
        let mut hasher = blake3::Hasher::new();
        hasher.update(instrument.as_bytes());
        hasher.update(&cfg.seed.to_le_bytes());
        let mut rng = StdRng::from_seed(*hasher.finalize().as_bytes());

        let step = chrono::Duration::seconds(cfg.base.seconds());
        let mut bars = Vec::with_capacity(cfg.bars);
        let mut price = cfg.start_price;
        let mut timestamp = cfg.start;

        for i in 0..cfg.bars {
            // Slow regime drift so trends exist at every timeframe
            let drift = 0.15 * cfg.volatility * (i as f64 / 700.0).sin();
            let ret = drift + rng.gen_range(-cfg.volatility..=cfg.volatility);
            let open = price;
            let close = (price * (1.0 + ret)).max(cfg.start_price * 0.01);
            let wick = cfg.volatility * 0.5;
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..=wick));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..=wick));

            bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume: rng.gen_range(100..5_000u64),
                spread: Some(cfg.spread * rng.gen_range(0.8..=1.2)),
            });

            price = close;
            timestamp += step;
        }
        bars
    }
}

impl TimeSeriesStore for SyntheticStore {
    fn load(
        &self,
        instrument: &str,
        granularity: Granularity,
    ) -> Result<Option<Vec<Bar>>, StoreError> {
        if granularity < self.config.base || self.config.bars == 0 {
            return Ok(None);
        }
        let base = self.base_bars(instrument);
        if granularity == self.config.base {
            return Ok(Some(base));
        }
        Ok(Some(resample(&base, granularity)))
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }
}
