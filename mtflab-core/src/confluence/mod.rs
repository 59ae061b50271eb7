//! Cross-timeframe confluence.
//!
//! Aligns every available timeframe signal onto the primary timeframe's
//! index with forward-fill on bar close times and blends them into one
//! bounded score. Timeframes with zero weight are dropped. A zero total weight among the
//! available timeframes is fatal. A total weight >= 1 is neither rescaled
//! nor rejected here; configuration loading enforces the upper bound.

pub mod align;
pub mod blend;

pub use align::{forward_fill, forward_fill_closed};
pub use blend::{blend, normalise, Blended, Contribution, WEIGHT_EPSILON};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Granularity, TimeSeries};
use crate::signal::DirectionalSignal;

/// A timeframe signal paired with its configured weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedSignal {
    pub signal: DirectionalSignal,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContributorWeight {
    pub granularity: Granularity,
    pub weight: f64,
}

/// Blended score on the primary timeframe's index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceScore {
    pub primary: Granularity,
    pub series: TimeSeries,
    /// Weight that contributed a defined value at each index.
    pub coverage: Vec<f64>,
    /// Sum of the weights of all contributing timeframes.
    pub total_weight: f64,
    pub contributors: Vec<ContributorWeight>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfluenceError {
    #[error("primary timeframe {0} has no signal; it defines the master index")]
    PrimaryMissing(Granularity),

    #[error("total weight of available timeframes is zero; nothing to blend")]
    ZeroTotalWeight,

    #[error("{granularity}: weight must be finite and non-negative, got {weight}")]
    InvalidWeight { granularity: Granularity, weight: f64 },

    #[error("timeframe {0} supplied more than once")]
    DuplicateTimeframe(Granularity),
}

impl ConfluenceScore {
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// True when every contributing timeframe is defined at `i`.
    pub fn is_fully_covered(&self, i: usize) -> bool {
        self.coverage
            .get(i)
            .is_some_and(|&w| w >= self.total_weight - WEIGHT_EPSILON)
    }
}

/// Build the confluence score for `primary` from the available signals.
pub fn build_confluence(
    primary: Granularity,
    signals: &[WeightedSignal],
) -> Result<ConfluenceScore, ConfluenceError> {
    for (i, ws) in signals.iter().enumerate() {
        let granularity = ws.signal.granularity;
        if !ws.weight.is_finite() || ws.weight < 0.0 {
            return Err(ConfluenceError::InvalidWeight {
                granularity,
                weight: ws.weight,
            });
        }
        if signals[..i]
            .iter()
            .any(|other| other.signal.granularity == granularity)
        {
            return Err(ConfluenceError::DuplicateTimeframe(granularity));
        }
    }

    let primary_signal = signals
        .iter()
        .find(|ws| ws.signal.granularity == primary)
        .ok_or(ConfluenceError::PrimaryMissing(primary))?;
    let index = &primary_signal.signal.series.index;

    let used: Vec<&WeightedSignal> = signals.iter().filter(|ws| ws.weight > 0.0).collect();
    let total_weight: f64 = used.iter().map(|ws| ws.weight).sum();
    if total_weight <= 0.0 {
        return Err(ConfluenceError::ZeroTotalWeight);
    }
    if total_weight > 1.0 + WEIGHT_EPSILON {
        tracing::warn!(
            total_weight,
            "timeframe weights sum above 1; score is not rescaled and may leave [-1, 1]"
        );
    }

    let contributions: Vec<Contribution> = used
        .iter()
        .map(|ws| {
            let values = if ws.signal.granularity == primary {
                ws.signal.series.values.clone()
            } else {
                forward_fill_closed(&ws.signal.series, ws.signal.granularity, index, primary)
            };
            tracing::debug!(
                timeframe = %ws.signal.granularity,
                weight = ws.weight,
                "aligned onto {primary}"
            );
            Contribution {
                granularity: ws.signal.granularity,
                weight: ws.weight,
                values,
            }
        })
        .collect();

    let Blended { scores, coverage } = blend(index.len(), &contributions);

    Ok(ConfluenceScore {
        primary,
        series: TimeSeries::new(index.clone(), scores),
        coverage,
        total_weight,
        contributors: contributions
            .iter()
            .map(|c| ContributorWeight {
                granularity: c.granularity,
                weight: c.weight,
            })
            .collect(),
    })
}
