//! Time-series store port and shared helpers for file-backed adapters.
//!
//! A store answers "bars of instrument X at granularity G". `Ok(None)` means
//! the timeframe is simply unavailable, which callers may tolerate for
//! non-primary timeframes. `Err` means the data exists but is unusable.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::{Bar, Granularity};

/// Where loaded bars came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Csv,
    Parquet,
    Synthetic,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {message}", path.display())]
    Csv { path: PathBuf, message: String },

    #[error("parquet error in {}: {message}", path.display())]
    Parquet { path: PathBuf, message: String },

    #[error("invalid timestamp '{value}' in {} row {row}", path.display())]
    Timestamp {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error("duplicate timestamp {timestamp} in {}", path.display())]
    DuplicateTimestamp {
        path: PathBuf,
        timestamp: DateTime<Utc>,
    },
}

pub trait TimeSeriesStore: Send + Sync {
    /// Bars sorted ascending by timestamp, `None` when not available.
    fn load(&self, instrument: &str, granularity: Granularity)
        -> Result<Option<Vec<Bar>>, StoreError>;

    fn source(&self) -> DataSource;
}

/// `{dir}/{INSTRUMENT}_{GRAN}.{ext}`, e.g. `data/EUR_USD_H4.csv`.
pub fn series_path(dir: &Path, instrument: &str, granularity: Granularity, ext: &str) -> PathBuf {
    dir.join(format!("{instrument}_{}.{ext}", granularity.code()))
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or a bare date.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Sort ascending and reject duplicate timestamps. Empty input is
/// unavailable.
pub fn finalize_bars(path: &Path, mut bars: Vec<Bar>) -> Result<Option<Vec<Bar>>, StoreError> {
    if bars.is_empty() {
        return Ok(None);
    }
    bars.sort_by_key(|b| b.timestamp);
    if let Some(pair) = bars.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
        return Err(StoreError::DuplicateTimestamp {
            path: path.to_path_buf(),
            timestamp: pair[1].timestamp,
        });
    }
    Ok(Some(bars))
}
