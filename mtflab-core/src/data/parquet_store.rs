//! Parquet-backed time-series store.
//!
//! Required columns: `timestamp` (datetime, or Int64 epoch milliseconds),
//! `open`, `high`, `low`, `close`. Optional: `volume`, `spread`.

use chrono::DateTime;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use super::store::{finalize_bars, series_path, DataSource, StoreError, TimeSeriesStore};
use crate::domain::{Bar, Granularity};

const REQUIRED_COLUMNS: [&str; 5] = ["timestamp", "open", "high", "low", "close"];

#[derive(Debug, Clone)]
pub struct ParquetStore {
    dir: PathBuf,
}

impl ParquetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, instrument: &str, granularity: Granularity) -> PathBuf {
        series_path(&self.dir, instrument, granularity, "parquet")
    }

    /// Write bars in the layout `load` reads back.
    pub fn write(
        &self,
        instrument: &str,
        granularity: Granularity,
        bars: &[Bar],
    ) -> Result<PathBuf, StoreError> {
        let path = self.path_for(instrument, granularity);
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut df = bars_to_dataframe(bars).map_err(|e| parquet_err(&path, "build", e))?;
        let file = fs::File::create(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        ParquetWriter::new(file)
            .finish(&mut df)
            .map_err(|e| parquet_err(&path, "write", e))?;
        Ok(path)
    }
}

impl TimeSeriesStore for ParquetStore {
    fn load(
        &self,
        instrument: &str,
        granularity: Granularity,
    ) -> Result<Option<Vec<Bar>>, StoreError> {
        let path = self.path_for(instrument, granularity);
        if !path.exists() {
            return Ok(None);
        }

        let file = fs::File::open(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let df = ParquetReader::new(file)
            .finish()
            .map_err(|e| parquet_err(&path, "read", e))?;

        for name in REQUIRED_COLUMNS {
            if df.column(name).is_err() {
                return Err(StoreError::Parquet {
                    path: path.clone(),
                    message: format!("missing column '{name}'"),
                });
            }
        }

        let bars = dataframe_to_bars(&df, &path)?;
        finalize_bars(&path, bars)
    }

    fn source(&self) -> DataSource {
        DataSource::Parquet
    }
}

fn parquet_err(path: &Path, stage: &str, e: PolarsError) -> StoreError {
    StoreError::Parquet {
        path: path.to_path_buf(),
        message: format!("{stage}: {e}"),
    }
}

fn bars_to_dataframe(bars: &[Bar]) -> PolarsResult<DataFrame> {
    let timestamps: Vec<i64> = bars.iter().map(|b| b.timestamp.timestamp_millis()).collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();
    let spreads: Vec<Option<f64>> = bars.iter().map(|b| b.spread).collect();

    DataFrame::new(vec![
        Column::new("timestamp".into(), timestamps)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
        Column::new("spread".into(), spreads),
    ])
}

fn dataframe_to_bars(df: &DataFrame, path: &Path) -> Result<Vec<Bar>, StoreError> {
    let column = |name: &str, dtype: &DataType| -> Result<Column, StoreError> {
        df.column(name)
            .and_then(|c| c.cast(dtype))
            .map_err(|e| parquet_err(path, name, e))
    };

    // Int64 epoch-ms columns reinterpret as milliseconds; datetime columns
    // of any unit convert.
    let timestamps = column("timestamp", &DataType::Datetime(TimeUnit::Milliseconds, None))?
        .cast(&DataType::Int64)
        .map_err(|e| parquet_err(path, "timestamp", e))?;
    let opens = column("open", &DataType::Float64)?;
    let highs = column("high", &DataType::Float64)?;
    let lows = column("low", &DataType::Float64)?;
    let closes = column("close", &DataType::Float64)?;
    let volumes = match df.column("volume") {
        Ok(_) => Some(column("volume", &DataType::UInt64)?),
        Err(_) => None,
    };
    let spreads = match df.column("spread") {
        Ok(_) => Some(column("spread", &DataType::Float64)?),
        Err(_) => None,
    };

    let typed = |stage: &str, e: PolarsError| parquet_err(path, stage, e);
    let ts_ca = timestamps.i64().map_err(|e| typed("timestamp", e))?;
    let open_ca = opens.f64().map_err(|e| typed("open", e))?;
    let high_ca = highs.f64().map_err(|e| typed("high", e))?;
    let low_ca = lows.f64().map_err(|e| typed("low", e))?;
    let close_ca = closes.f64().map_err(|e| typed("close", e))?;
    let vol_ca = volumes
        .as_ref()
        .map(|c| c.u64())
        .transpose()
        .map_err(|e| typed("volume", e))?;
    let spread_ca = spreads
        .as_ref()
        .map(|c| c.f64())
        .transpose()
        .map_err(|e| typed("spread", e))?;

    let mut bars = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let timestamp = ts_ca
            .get(i)
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(|| StoreError::Parquet {
                path: path.to_path_buf(),
                message: format!("null or out-of-range timestamp at row {i}"),
            })?;
        bars.push(Bar {
            timestamp,
            open: open_ca.get(i).unwrap_or(f64::NAN),
            high: high_ca.get(i).unwrap_or(f64::NAN),
            low: low_ca.get(i).unwrap_or(f64::NAN),
            close: close_ca.get(i).unwrap_or(f64::NAN),
            volume: vol_ca.and_then(|ca| ca.get(i)).unwrap_or(0),
            spread: spread_ca.and_then(|ca| ca.get(i)),
        });
    }
    Ok(bars)
}
