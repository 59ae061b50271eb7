//! MTFLab Runner: configuration, loading, simulation, reports and sweeps.
//!
//! This crate builds on `mtflab-core` to provide:
//! - TOML run configuration with validation and content-hash run ids
//! - Timeframe loading with primary/secondary failure policy and dataset hash
//! - A from-signals portfolio simulator implementing the core simulation port
//! - Single-run orchestration producing a serializable report and artifacts
//! - Parameter sweeps (rayon) with best-config export
//! - Broker position reconciliation

pub mod config;
pub mod cost;
pub mod data_loader;
pub mod metrics;
pub mod portfolio;
pub mod reconcile;
pub mod reporting;
pub mod runner;
pub mod sweep;

pub use config::{BacktestSection, ConfigError, DataFormat, MtfConfig, RunId};
pub use cost::{estimate_fee, CostModel, FeeEstimate, FeeSource};
pub use data_loader::{load_timeframes, open_store, LoadError, LoadedData, SkipReason};
pub use portfolio::{PortfolioRun, SignalPortfolio, Trade};
pub use reconcile::{
    net_positions, reconcile_json, FlatPositionPolicy, NetPosition, PositionSide, ReconcileError,
};
pub use reporting::{ArtifactManager, ArtifactPaths, MtfReport};
pub use runner::{
    compute_confluence, run_from_data, run_mtf, RunError, RunOutput, SignalDistribution,
    TimeframeStats,
};
pub use sweep::{ParamGrid, ParamSweep, SweepPoint, SweepResults, VerdictCounts};
