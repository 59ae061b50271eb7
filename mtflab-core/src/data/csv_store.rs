//! CSV-backed time-series store.
//!
//! One file per instrument and granularity with a header row:
//! `timestamp,open,high,low,close[,volume][,spread]`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::store::{finalize_bars, parse_timestamp, series_path, DataSource, StoreError, TimeSeriesStore};
use crate::domain::{Bar, Granularity};

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
    #[serde(default)]
    spread: Option<f64>,
}

#[derive(Debug, Serialize)]
struct CsvRecord {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
    spread: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, instrument: &str, granularity: Granularity) -> PathBuf {
        series_path(&self.dir, instrument, granularity, "csv")
    }

    /// Write bars in the layout `load` reads back.
    pub fn write(
        &self,
        instrument: &str,
        granularity: Granularity,
        bars: &[Bar],
    ) -> Result<PathBuf, StoreError> {
        let path = self.path_for(instrument, granularity);
        std::fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let csv_err = |e: csv::Error| StoreError::Csv {
            path: path.clone(),
            message: e.to_string(),
        };

        let mut writer = csv::Writer::from_path(&path).map_err(csv_err)?;
        for bar in bars {
            writer
                .serialize(CsvRecord {
                    timestamp: bar.timestamp.to_rfc3339(),
                    open: bar.open,
                    high: bar.high,
                    low: bar.low,
                    close: bar.close,
                    volume: bar.volume,
                    spread: bar.spread,
                })
                .map_err(csv_err)?;
        }
        writer.flush().map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

impl TimeSeriesStore for CsvStore {
    fn load(
        &self,
        instrument: &str,
        granularity: Granularity,
    ) -> Result<Option<Vec<Bar>>, StoreError> {
        let path = self.path_for(instrument, granularity);
        if !path.exists() {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(&path).map_err(|e| StoreError::Csv {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let mut bars = Vec::new();
        for (row, record) in reader.deserialize::<CsvRow>().enumerate() {
            let record = record.map_err(|e| StoreError::Csv {
                path: path.clone(),
                message: e.to_string(),
            })?;
            let timestamp =
                parse_timestamp(&record.timestamp).ok_or_else(|| StoreError::Timestamp {
                    path: path.clone(),
                    row: row + 1,
                    value: record.timestamp.clone(),
                })?;
            bars.push(Bar {
                timestamp,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                volume: record.volume.map(|v| v.max(0.0).round() as u64).unwrap_or(0),
                spread: record.spread,
            });
        }

        finalize_bars(&path, bars)
    }

    fn source(&self) -> DataSource {
        DataSource::Csv
    }
}
