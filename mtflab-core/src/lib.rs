//! MTFLab Core: multi-timeframe confluence signals and IS/OOS validation.
//!
//! This crate contains the signal pipeline, leaf-first:
//! - Domain types (bars, granularities, time series)
//! - Per-timeframe directional signal (trend + momentum votes)
//! - Cross-timeframe aligner and weighted blender
//! - Stateless entry/exit rules on the blended score
//! - Validation harness splitting history into in-sample/out-of-sample
//!
//! plus the two ports it talks through: [`data::TimeSeriesStore`] for
//! candles and [`sim::SimulationEngine`] for portfolio simulation.

pub mod confluence;
pub mod data;
pub mod domain;
pub mod indicators;
pub mod rules;
pub mod signal;
pub mod sim;
pub mod timeframe;
pub mod validation;

pub use confluence::{build_confluence, ConfluenceError, ConfluenceScore, WeightedSignal};
pub use domain::{Bar, Granularity, TimeSeries};
pub use rules::{Direction, EntryExitSet, RuleError};
pub use signal::{compute_timeframe_signal, DirectionalSignal, SignalComponent};
pub use sim::{SimulationEngine, SimulationError, SimulationRequest, SimulationStats};
pub use timeframe::{TimeframeError, TimeframeSpec};
pub use validation::{
    classify, parity_ratio, run_validation, ValidationConfig, ValidationError, ValidationResult,
    Verdict,
};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: pipeline types can cross threads for sweeps.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Bar>();
        require_sync::<Bar>();
        require_send::<TimeSeries>();
        require_sync::<TimeSeries>();
        require_send::<TimeframeSpec>();
        require_sync::<TimeframeSpec>();
        require_send::<DirectionalSignal>();
        require_sync::<DirectionalSignal>();
        require_send::<ConfluenceScore>();
        require_sync::<ConfluenceScore>();
        require_send::<EntryExitSet>();
        require_sync::<EntryExitSet>();
        require_send::<ValidationConfig>();
        require_sync::<ValidationConfig>();
        require_send::<ValidationResult>();
        require_sync::<ValidationResult>();

        require_send::<data::CsvStore>();
        require_sync::<data::CsvStore>();
        require_send::<data::ParquetStore>();
        require_sync::<data::ParquetStore>();
        require_send::<data::SyntheticStore>();
        require_sync::<data::SyntheticStore>();
    }
}
