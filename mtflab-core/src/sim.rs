//! Port to the portfolio simulation engine.
//!
//! The core never computes returns, Sharpe or drawdown itself; it hands
//! close prices and trigger sequences to a [`SimulationEngine`] and reads
//! back [`SimulationStats`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::Direction;

/// One simulation call: a single direction over a single segment.
#[derive(Debug, Clone, Copy)]
pub struct SimulationRequest<'a> {
    pub close: &'a [f64],
    pub entries: &'a [bool],
    pub exits: &'a [bool],
    pub direction: Direction,
    pub initial_capital: f64,
    /// Cost per fill as a fraction of traded value.
    pub fee: f64,
    /// Bars per year, used to annualise Sharpe.
    pub periods_per_year: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    pub total_return: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub trade_count: usize,
    pub win_rate: f64,
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("input lengths differ: close={close}, entries={entries}, exits={exits}")]
    LengthMismatch {
        close: usize,
        entries: usize,
        exits: usize,
    },

    #[error("initial capital must be positive, got {0}")]
    InvalidCapital(f64),

    #[error("fee must be a finite non-negative fraction, got {0}")]
    InvalidFee(f64),

    #[error("unusable close price {price} at bar {index}")]
    InvalidPrice { index: usize, price: f64 },

    #[error("simulation engine failure: {0}")]
    Engine(String),
}

impl SimulationRequest<'_> {
    /// Checks shared by every engine implementation.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.entries.len() != self.close.len() || self.exits.len() != self.close.len() {
            return Err(SimulationError::LengthMismatch {
                close: self.close.len(),
                entries: self.entries.len(),
                exits: self.exits.len(),
            });
        }
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(SimulationError::InvalidCapital(self.initial_capital));
        }
        if !(self.fee.is_finite() && self.fee >= 0.0) {
            return Err(SimulationError::InvalidFee(self.fee));
        }
        Ok(())
    }
}

/// A portfolio simulator driven by entry/exit sequences.
pub trait SimulationEngine: Send + Sync {
    fn simulate(&self, request: &SimulationRequest<'_>) -> Result<SimulationStats, SimulationError>;
}
