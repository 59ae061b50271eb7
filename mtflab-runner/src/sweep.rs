//! Parameter sweep over confirmation thresholds and primary MA windows.
//!
//! Data is loaded once; every grid point reruns signals, confluence and the
//! IS/OOS harness on it. Points are ranked on in-sample Sharpe only, and the
//! verdict counts across the grid show whether a good point sits on a
//! plateau or is an isolated spike.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use mtflab_core::sim::SimulationEngine;
use mtflab_core::validation::{DirectionParity, Verdict};

use crate::config::{ConfigError, MtfConfig};
use crate::data_loader::LoadedData;
use crate::runner::{run_from_data, RunError};

/// Parameter grid specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub thresholds: Vec<f64>,
    /// Primary timeframe fast MA windows.
    pub fast_windows: Vec<usize>,
    /// Primary timeframe slow MA windows.
    pub slow_windows: Vec<usize>,
}

impl Default for ParamGrid {
    /// Thresholds 0.2–0.5, fast 10/20/30, slow 50/100.
    fn default() -> Self {
        Self {
            thresholds: vec![0.2, 0.3, 0.4, 0.5],
            fast_windows: vec![10, 20, 30],
            slow_windows: vec![50, 100],
        }
    }
}

impl ParamGrid {
    /// Upper bound on grid points (before dropping fast >= slow).
    pub fn size(&self) -> usize {
        self.thresholds.len() * self.fast_windows.len() * self.slow_windows.len()
    }

    /// All valid configurations, in a fixed order.
    pub fn generate_configs(&self, base: &MtfConfig) -> Vec<MtfConfig> {
        let mut configs = Vec::new();
        for &threshold in &self.thresholds {
            for &fast in &self.fast_windows {
                for &slow in &self.slow_windows {
                    if fast >= slow {
                        continue;
                    }
                    configs.push(base.with_threshold(threshold).with_primary_windows(fast, slow));
                }
            }
        }
        configs
    }
}

/// Outcome of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub run_id: String,
    pub threshold: f64,
    pub fast_window: usize,
    pub slow_window: usize,
    pub long: DirectionParity,
    pub short: DirectionParity,
    pub combined_is_return: f64,
    pub combined_oos_return: f64,
}

impl SweepPoint {
    /// Ranking key: long plus short in-sample Sharpe.
    pub fn is_fitness(&self) -> f64 {
        self.long.is_sharpe + self.short.is_sharpe
    }
}

/// Parameter sweep executor.
///
/// Runs every configuration in a grid, optionally in parallel. Each point is
/// a pure function of its config and the shared data, so serial and parallel
/// sweeps return identical results in identical order.
pub struct ParamSweep<E> {
    engine: E,
    parallel: bool,
}

impl<E: SimulationEngine> ParamSweep<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            parallel: true,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn sweep(
        &self,
        grid: &ParamGrid,
        base: &MtfConfig,
        data: &LoadedData,
    ) -> Result<SweepResults, RunError> {
        let configs = grid.generate_configs(base);
        tracing::info!(points = configs.len(), parallel = self.parallel, "sweep started");

        let points: Vec<SweepPoint> = if self.parallel {
            configs
                .par_iter()
                .map(|config| self.run_point(config, data))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            configs
                .iter()
                .map(|config| self.run_point(config, data))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(SweepResults { points })
    }

    fn run_point(&self, config: &MtfConfig, data: &LoadedData) -> Result<SweepPoint, RunError> {
        let data = data.with_specs(config);
        let output = run_from_data(config, &data, &self.engine)?;
        let validation = &output.report.validation;
        let (fast_window, slow_window) = config
            .spec(config.primary)
            .map(|s| (s.fast_window, s.slow_window))
            .unwrap_or_default();

        Ok(SweepPoint {
            run_id: output.report.run_id.clone(),
            threshold: config.confirmation_threshold,
            fast_window,
            slow_window,
            long: validation.long,
            short: validation.short,
            combined_is_return: validation.in_sample.combined_return,
            combined_oos_return: validation.out_of_sample.combined_return,
        })
    }
}

/// How many points earned each verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VerdictCounts {
    pub pass: usize,
    pub weak: usize,
    pub overfit: usize,
}

impl VerdictCounts {
    fn add(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Pass => self.pass += 1,
            Verdict::Weak => self.weak += 1,
            Verdict::Overfit => self.overfit += 1,
        }
    }
}

/// Results from a parameter sweep, in grid order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResults {
    points: Vec<SweepPoint>,
}

impl SweepResults {
    pub fn all(&self) -> &[SweepPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points sorted by in-sample fitness (descending); ties keep grid order.
    pub fn sorted_by_fitness(&self) -> Vec<&SweepPoint> {
        let mut sorted: Vec<_> = self.points.iter().collect();
        sorted.sort_by(|a, b| {
            b.is_fitness()
                .partial_cmp(&a.is_fitness())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    pub fn top_n(&self, n: usize) -> Vec<&SweepPoint> {
        self.sorted_by_fitness().into_iter().take(n).collect()
    }

    pub fn best(&self) -> Option<&SweepPoint> {
        self.sorted_by_fitness().into_iter().next()
    }

    /// Verdict counts for the long and the short side.
    pub fn verdict_counts(&self) -> (VerdictCounts, VerdictCounts) {
        let mut long = VerdictCounts::default();
        let mut short = VerdictCounts::default();
        for p in &self.points {
            long.add(p.long.verdict);
            short.add(p.short.verdict);
        }
        (long, short)
    }

    /// `base` with the best point's parameters, as TOML.
    pub fn best_config_toml(&self, base: &MtfConfig) -> Result<Option<String>, ConfigError> {
        let Some(best) = self.best() else {
            return Ok(None);
        };
        base.with_threshold(best.threshold)
            .with_primary_windows(best.fast_window, best.slow_window)
            .to_toml()
            .map(Some)
    }
}
