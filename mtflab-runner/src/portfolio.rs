//! From-signals portfolio simulator for a single instrument and direction.
//!
//! Execution model:
//! - An entry while flat opens a position at that bar's close with all equity
//! - Entries while a position is open are ignored
//! - An exit while in position closes at that bar's close
//! - An entry and an exit on the same bar while flat open nothing
//! - The fee is charged on the traded value of every fill
//! - A position still open on the last bar is marked to market and counted
//!
//! Short positions are collateralised by the full equity; the mark is
//! `collateral + units * (entry - price)`. A short whose mark reaches zero
//! is liquidated on that bar.

use serde::{Deserialize, Serialize};

use mtflab_core::rules::Direction;
use mtflab_core::sim::{SimulationEngine, SimulationError, SimulationRequest, SimulationStats};

use crate::metrics;

/// One completed (or still open) round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub direction: Direction,
    pub entry_bar: usize,
    pub exit_bar: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    pub units: f64,
    /// Net of both fills' fees.
    pub pnl: f64,
    /// Equity committed at entry.
    pub capital: f64,
    /// Still open on the last bar and marked to market.
    pub open: bool,
}

impl Trade {
    pub fn return_pct(&self) -> f64 {
        if self.capital <= 0.0 {
            return 0.0;
        }
        self.pnl / self.capital
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}

/// Bar-by-bar result of one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRun {
    /// Equity after each bar's fills, one entry per bar.
    pub equity: Vec<f64>,
    pub trades: Vec<Trade>,
    pub fees_paid: f64,
}

#[derive(Debug, Clone, Copy)]
struct OpenPosition {
    entry_bar: usize,
    entry_price: f64,
    units: f64,
    capital: f64,
    /// Capital left after the entry fee.
    collateral: f64,
}

impl OpenPosition {
    fn mark(&self, direction: Direction, price: f64) -> f64 {
        let delta = self.units * (price - self.entry_price);
        match direction {
            Direction::Long => self.collateral + delta,
            Direction::Short => self.collateral - delta,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SignalPortfolio;

impl SignalPortfolio {
    pub fn new() -> Self {
        Self
    }

    /// Simulate and keep the equity curve and trade list.
    pub fn run(&self, request: &SimulationRequest<'_>) -> Result<PortfolioRun, SimulationError> {
        request.validate()?;
        if let Some((index, &price)) = request
            .close
            .iter()
            .enumerate()
            .find(|(_, p)| !(p.is_finite() && **p > 0.0))
        {
            return Err(SimulationError::InvalidPrice { index, price });
        }

        let direction = request.direction;
        let fee = request.fee;
        let mut cash = request.initial_capital;
        let mut fees_paid = 0.0;
        let mut position: Option<OpenPosition> = None;
        let mut trades = Vec::new();
        let mut equity = Vec::with_capacity(request.close.len());

        for (i, &price) in request.close.iter().enumerate() {
            let entry = request.entries[i];
            let exit = request.exits[i];

            if let Some(pos) = position {
                let mark = pos.mark(direction, price);
                if exit || mark <= 0.0 {
                    let exit_fee = pos.units * price * fee;
                    let proceeds = (mark - exit_fee).max(0.0);
                    fees_paid += exit_fee.min(mark.max(0.0));
                    trades.push(Trade {
                        direction,
                        entry_bar: pos.entry_bar,
                        exit_bar: i,
                        entry_price: pos.entry_price,
                        exit_price: price,
                        units: pos.units,
                        pnl: proceeds - pos.capital,
                        capital: pos.capital,
                        open: false,
                    });
                    cash = proceeds;
                    position = None;
                }
            } else if entry && !exit && cash > 0.0 {
                let units = cash / (price * (1.0 + fee));
                let entry_fee = units * price * fee;
                fees_paid += entry_fee;
                position = Some(OpenPosition {
                    entry_bar: i,
                    entry_price: price,
                    units,
                    capital: cash,
                    collateral: cash - entry_fee,
                });
                cash = 0.0;
            }

            equity.push(match position {
                Some(pos) => pos.mark(direction, price),
                None => cash,
            });
        }

        if let (Some(pos), Some(&last)) = (position, request.close.last()) {
            let mark = pos.mark(direction, last);
            trades.push(Trade {
                direction,
                entry_bar: pos.entry_bar,
                exit_bar: request.close.len() - 1,
                entry_price: pos.entry_price,
                exit_price: last,
                units: pos.units,
                pnl: mark - pos.capital,
                capital: pos.capital,
                open: true,
            });
        }

        Ok(PortfolioRun {
            equity,
            trades,
            fees_paid,
        })
    }
}

impl SimulationEngine for SignalPortfolio {
    fn simulate(&self, request: &SimulationRequest<'_>) -> Result<SimulationStats, SimulationError> {
        let run = self.run(request)?;
        let stats = metrics::compute_stats(
            request.initial_capital,
            &run.equity,
            &run.trades,
            request.periods_per_year,
        );
        tracing::debug!(
            direction = %request.direction,
            bars = request.close.len(),
            trades = stats.trade_count,
            total_return = stats.total_return,
            "simulated"
        );
        Ok(stats)
    }
}
