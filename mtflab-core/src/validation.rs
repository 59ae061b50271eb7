//! In-sample / out-of-sample validation of the confluence rule.
//!
//! The score is computed once over the full history, then history is split
//! chronologically at `floor(len * split_fraction)`. Each segment is
//! simulated separately for the long and the short side, and each side's
//! OOS/IS Sharpe ratio is classified:
//!
//! - ratio >= 0.5      → PASS
//! - 0 <= ratio < 0.5  → WEAK
//! - ratio < 0         → OVERFIT
//!
//! An IS Sharpe of exactly zero yields a ratio of zero (WEAK).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use thiserror::Error;

use crate::domain::{Granularity, TimeSeries};
use crate::rules::{self, Direction, EntryExitSet, RuleError};
use crate::sim::{SimulationEngine, SimulationError, SimulationRequest, SimulationStats};

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Fraction of bars assigned to the in-sample segment (default 0.70).
    pub split_fraction: f64,
    /// Confirmation threshold for entries (default 0.30).
    pub threshold: f64,
    pub initial_capital: f64,
    /// Cost per fill as a fraction of traded value.
    pub fee: f64,
    /// Bars per year of the primary timeframe.
    pub periods_per_year: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            split_fraction: 0.70,
            threshold: 0.30,
            initial_capital: 10_000.0,
            fee: 0.0002,
            periods_per_year: Granularity::H4.periods_per_year(),
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    InSample,
    OutOfSample,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::InSample => f.write_str("IS"),
            Segment::OutOfSample => f.write_str("OOS"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Weak,
    Overfit,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => f.write_str("PASS"),
            Verdict::Weak => f.write_str("WEAK"),
            Verdict::Overfit => f.write_str("OVERFIT"),
        }
    }
}

/// Both directions simulated over one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentResult {
    pub segment: Segment,
    /// Bar range [start, end) in the full primary index.
    pub start: usize,
    pub end: usize,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub long: SimulationStats,
    pub short: SimulationStats,
    /// Mean of the long and short total returns.
    pub combined_return: f64,
}

impl SegmentResult {
    pub fn bars(&self) -> usize {
        self.end - self.start
    }

    pub fn stats(&self, direction: Direction) -> &SimulationStats {
        match direction {
            Direction::Long => &self.long,
            Direction::Short => &self.short,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionParity {
    pub direction: Direction,
    pub is_sharpe: f64,
    pub oos_sharpe: f64,
    pub ratio: f64,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub split_index: usize,
    pub in_sample: SegmentResult,
    pub out_of_sample: SegmentResult,
    pub long: DirectionParity,
    pub short: DirectionParity,
}

impl ValidationResult {
    pub fn parity(&self, direction: Direction) -> &DirectionParity {
        match direction {
            Direction::Long => &self.long,
            Direction::Short => &self.short,
        }
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("split fraction {fraction} leaves an empty segment over {len} bars")]
    InvalidSplit { fraction: f64, len: usize },

    #[error("close and score indexes differ (close={close} bars, score={score} bars)")]
    IndexMismatch { close: usize, score: usize },

    #[error(transparent)]
    Rules(#[from] RuleError),

    #[error("{direction} simulation failed on {segment} segment: {source}")]
    Simulation {
        segment: Segment,
        direction: Direction,
        #[source]
        source: SimulationError,
    },
}

// ─── Split and classification ────────────────────────────────────────

/// `floor(len * fraction)`, rejecting fractions outside (0, 1) and splits
/// that leave either segment empty.
pub fn split_index(len: usize, fraction: f64) -> Result<usize, ValidationError> {
    let invalid = || ValidationError::InvalidSplit { fraction, len };
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(invalid());
    }
    let split = (len as f64 * fraction).floor() as usize;
    if split == 0 || split >= len {
        return Err(invalid());
    }
    Ok(split)
}

/// OOS Sharpe over IS Sharpe; zero when IS is zero or either is non-finite.
pub fn parity_ratio(is_sharpe: f64, oos_sharpe: f64) -> f64 {
    if is_sharpe == 0.0 || !is_sharpe.is_finite() || !oos_sharpe.is_finite() {
        return 0.0;
    }
    oos_sharpe / is_sharpe
}

pub fn classify(ratio: f64) -> Verdict {
    if ratio >= 0.5 {
        Verdict::Pass
    } else if ratio >= 0.0 {
        Verdict::Weak
    } else {
        Verdict::Overfit
    }
}

fn parity(direction: Direction, is: &SegmentResult, oos: &SegmentResult) -> DirectionParity {
    let is_sharpe = is.stats(direction).sharpe;
    let oos_sharpe = oos.stats(direction).sharpe;
    let ratio = parity_ratio(is_sharpe, oos_sharpe);
    DirectionParity {
        direction,
        is_sharpe,
        oos_sharpe,
        ratio,
        verdict: classify(ratio),
    }
}

// ─── Harness ─────────────────────────────────────────────────────────

/// Split, simulate both directions on both segments, and classify.
///
/// `close` and `score` must share the primary index.
pub fn run_validation(
    close: &TimeSeries,
    score: &TimeSeries,
    config: &ValidationConfig,
    engine: &dyn SimulationEngine,
) -> Result<ValidationResult, ValidationError> {
    if close.index != score.index {
        return Err(ValidationError::IndexMismatch {
            close: close.len(),
            score: score.len(),
        });
    }

    let len = close.len();
    let split = split_index(len, config.split_fraction)?;
    let triggers = rules::generate(&score.values, config.threshold)?;

    let in_sample = run_segment(Segment::InSample, 0..split, close, &triggers, config, engine)?;
    let out_of_sample =
        run_segment(Segment::OutOfSample, split..len, close, &triggers, config, engine)?;

    let long = parity(Direction::Long, &in_sample, &out_of_sample);
    let short = parity(Direction::Short, &in_sample, &out_of_sample);
    for p in [&long, &short] {
        tracing::info!(
            direction = %p.direction,
            is_sharpe = p.is_sharpe,
            oos_sharpe = p.oos_sharpe,
            ratio = p.ratio,
            verdict = %p.verdict,
            "parity"
        );
    }

    Ok(ValidationResult {
        split_index: split,
        in_sample,
        out_of_sample,
        long,
        short,
    })
}

fn run_segment(
    segment: Segment,
    range: Range<usize>,
    close: &TimeSeries,
    triggers: &EntryExitSet,
    config: &ValidationConfig,
    engine: &dyn SimulationEngine,
) -> Result<SegmentResult, ValidationError> {
    let prices = &close.values[range.clone()];
    let seg_triggers = triggers.slice(range.clone());

    let simulate = |direction: Direction| {
        let (entries, exits) = seg_triggers.for_direction(direction);
        tracing::debug!(%segment, %direction, bars = prices.len(), "simulating");
        engine
            .simulate(&SimulationRequest {
                close: prices,
                entries,
                exits,
                direction,
                initial_capital: config.initial_capital,
                fee: config.fee,
                periods_per_year: config.periods_per_year,
            })
            .map_err(|source| ValidationError::Simulation {
                segment,
                direction,
                source,
            })
    };

    let long = simulate(Direction::Long)?;
    let short = simulate(Direction::Short)?;

    Ok(SegmentResult {
        segment,
        start: range.start,
        end: range.end,
        first_timestamp: close.index.get(range.start).copied(),
        last_timestamp: close.index.get(range.end - 1).copied(),
        long,
        short,
        combined_return: (long.total_return + short.total_return) / 2.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    /// Returns a fixed Sharpe per (segment length, direction) and records calls.
    struct ScriptedEngine {
        is_len: usize,
        is_sharpe: f64,
        oos_sharpe: f64,
        calls: Mutex<Vec<(usize, Direction, usize)>>,
    }

    impl ScriptedEngine {
        fn new(is_len: usize, is_sharpe: f64, oos_sharpe: f64) -> Self {
            Self {
                is_len,
                is_sharpe,
                oos_sharpe,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl SimulationEngine for ScriptedEngine {
        fn simulate(
            &self,
            request: &SimulationRequest<'_>,
        ) -> Result<SimulationStats, SimulationError> {
            request.validate()?;
            let entries = request.entries.iter().filter(|&&e| e).count();
            self.calls
                .lock()
                .unwrap()
                .push((request.close.len(), request.direction, entries));
            let sharpe = if request.close.len() == self.is_len {
                self.is_sharpe
            } else {
                self.oos_sharpe
            };
            Ok(SimulationStats {
                total_return: if request.direction == Direction::Long { 0.1 } else { -0.05 },
                sharpe,
                ..Default::default()
            })
        }
    }

    fn series(values: Vec<f64>) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let index = (0..values.len())
            .map(|i| start + Duration::hours(4 * i as i64))
            .collect();
        TimeSeries::new(index, values)
    }

    // ─── Split tests ─────────────────────────────────────────────

    #[test]
    fn split_floors() {
        assert_eq!(split_index(10, 0.7).unwrap(), 7);
        assert_eq!(split_index(11, 0.7).unwrap(), 7);
        assert_eq!(split_index(3, 0.5).unwrap(), 1);
    }

    #[test]
    fn split_rejects_empty_segments() {
        assert!(split_index(1, 0.7).is_err());
        assert!(split_index(10, 0.0).is_err());
        assert!(split_index(10, 1.0).is_err());
        assert!(split_index(10, 0.05).is_err());
        assert!(split_index(0, 0.5).is_err());
    }

    // ─── Classification tests ────────────────────────────────────

    #[test]
    fn classify_pass() {
        let r = parity_ratio(1.0, 0.6);
        assert!((r - 0.6).abs() < 1e-12);
        assert_eq!(classify(r), Verdict::Pass);
    }

    #[test]
    fn classify_weak() {
        assert_eq!(classify(parity_ratio(1.0, 0.3)), Verdict::Weak);
    }

    #[test]
    fn classify_overfit() {
        assert_eq!(classify(parity_ratio(1.0, -0.2)), Verdict::Overfit);
    }

    #[test]
    fn zero_is_sharpe_is_weak() {
        for oos in [-3.0, 0.0, 2.5] {
            assert_eq!(parity_ratio(0.0, oos), 0.0);
            assert_eq!(classify(parity_ratio(0.0, oos)), Verdict::Weak);
        }
    }

    #[test]
    fn boundaries() {
        assert_eq!(classify(0.5), Verdict::Pass);
        assert_eq!(classify(0.0), Verdict::Weak);
        assert_eq!(classify(-1e-12), Verdict::Overfit);
    }

    #[test]
    fn negative_is_flips_sign() {
        // Negative IS, positive OOS → negative ratio
        assert_eq!(classify(parity_ratio(-1.0, 0.5)), Verdict::Overfit);
    }

    #[test]
    fn non_finite_ratio_inputs_are_zero() {
        assert_eq!(parity_ratio(f64::NAN, 1.0), 0.0);
        assert_eq!(parity_ratio(1.0, f64::INFINITY), 0.0);
    }

    // ─── Harness tests ───────────────────────────────────────────

    #[test]
    fn harness_runs_each_segment_and_direction_once() {
        let close = series((0..10).map(|i| 100.0 + i as f64).collect());
        let score = series(vec![0.5; 10]);
        let engine = ScriptedEngine::new(7, 1.0, 0.6);

        let result = run_validation(&close, &score, &ValidationConfig::default(), &engine).unwrap();

        assert_eq!(result.split_index, 7);
        assert_eq!(result.in_sample.bars(), 7);
        assert_eq!(result.out_of_sample.bars(), 3);
        assert_eq!(result.out_of_sample.first_timestamp, Some(close.index[7]));
        assert_eq!(result.long.verdict, Verdict::Pass);
        assert_eq!(result.short.verdict, Verdict::Pass);
        assert!((result.in_sample.combined_return - 0.025).abs() < 1e-12);

        let calls = engine.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                (7, Direction::Long, 7),
                (7, Direction::Short, 0),
                (3, Direction::Long, 3),
                (3, Direction::Short, 0),
            ]
        );
    }

    #[test]
    fn harness_reports_overfit() {
        let close = series(vec![1.0; 10]);
        let score = series(vec![0.0; 10]);
        let engine = ScriptedEngine::new(7, 1.0, -0.2);
        let result = run_validation(&close, &score, &ValidationConfig::default(), &engine).unwrap();
        assert_eq!(result.parity(Direction::Long).verdict, Verdict::Overfit);
    }

    #[test]
    fn harness_rejects_misaligned_inputs() {
        let close = series(vec![1.0; 10]);
        let score = series(vec![0.0; 9]);
        let engine = ScriptedEngine::new(7, 1.0, 1.0);
        let err = run_validation(&close, &score, &ValidationConfig::default(), &engine).unwrap_err();
        assert!(matches!(err, ValidationError::IndexMismatch { .. }));
    }

    #[test]
    fn harness_rejects_bad_threshold() {
        let close = series(vec![1.0; 10]);
        let score = series(vec![0.0; 10]);
        let engine = ScriptedEngine::new(7, 1.0, 1.0);
        let config = ValidationConfig {
            threshold: 0.0,
            ..Default::default()
        };
        let err = run_validation(&close, &score, &config, &engine).unwrap_err();
        assert!(matches!(err, ValidationError::Rules(_)));
    }

    #[test]
    fn harness_wraps_engine_errors() {
        let close = series(vec![1.0; 10]);
        let score = series(vec![0.0; 10]);
        let engine = ScriptedEngine::new(7, 1.0, 1.0);
        let config = ValidationConfig {
            initial_capital: -1.0,
            ..Default::default()
        };
        let err = run_validation(&close, &score, &config, &engine).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Simulation {
                segment: Segment::InSample,
                direction: Direction::Long,
                ..
            }
        ));
    }
}
