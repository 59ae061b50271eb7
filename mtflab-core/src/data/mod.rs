//! Time-series storage: the store port plus CSV, Parquet and synthetic adapters.

pub mod csv_store;
pub mod parquet_store;
pub mod resample;
pub mod store;
pub mod synthetic;

pub use csv_store::CsvStore;
pub use parquet_store::ParquetStore;
pub use resample::resample;
pub use store::{DataSource, StoreError, TimeSeriesStore};
pub use synthetic::{SyntheticConfig, SyntheticStore};
