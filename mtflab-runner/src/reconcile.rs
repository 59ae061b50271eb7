//! Broker position reconciliation.
//!
//! Parses a v20-style open-positions document, where each instrument carries
//! a long and a short leg with units as decimal strings (short units are
//! negative), and nets the legs into one position per instrument.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid positions document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{instrument}: unparseable units '{value}'")]
    InvalidUnits { instrument: String, value: String },

    #[error("invalid instrument name '{0}'")]
    InvalidInstrument(String),
}

// ─── Wire format ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PositionsDocument {
    #[serde(default)]
    pub positions: Vec<BrokerPosition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerPosition {
    pub instrument: String,
    #[serde(default)]
    pub long: Option<PositionLeg>,
    #[serde(default)]
    pub short: Option<PositionLeg>,
}

/// Only the units are read; prices and P&L fields on the leg are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionLeg {
    pub units: String,
}

// ─── Netted view ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
    Flat,
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => f.write_str("LONG"),
            PositionSide::Short => f.write_str("SHORT"),
            PositionSide::Flat => f.write_str("FLAT"),
        }
    }
}

/// What to do with an instrument whose legs cancel out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlatPositionPolicy {
    #[default]
    Skip,
    ReportFlat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetPosition {
    /// Venue symbol, e.g. `EUR/USD`.
    pub symbol: String,
    pub side: PositionSide,
    /// Absolute net units.
    pub quantity: f64,
}

/// `EUR_USD` → `EUR/USD`.
pub fn venue_symbol(instrument: &str) -> Result<String, ReconcileError> {
    let mut parts = instrument.split('_');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(base), Some(quote), None) if !base.is_empty() && !quote.is_empty() => {
            Ok(format!("{base}/{quote}"))
        }
        _ => Err(ReconcileError::InvalidInstrument(instrument.to_string())),
    }
}

fn leg_units(instrument: &str, leg: Option<&PositionLeg>) -> Result<f64, ReconcileError> {
    let Some(leg) = leg else {
        return Ok(0.0);
    };
    leg.units
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|u| u.is_finite())
        .ok_or_else(|| ReconcileError::InvalidUnits {
            instrument: instrument.to_string(),
            value: leg.units.clone(),
        })
}

pub fn parse_positions(json: &str) -> Result<PositionsDocument, ReconcileError> {
    Ok(serde_json::from_str(json)?)
}

/// Net each instrument's legs: positive → LONG, negative → SHORT.
pub fn net_positions(
    document: &PositionsDocument,
    policy: FlatPositionPolicy,
) -> Result<Vec<NetPosition>, ReconcileError> {
    let mut out = Vec::with_capacity(document.positions.len());
    for position in &document.positions {
        let instrument = position.instrument.as_str();
        let net = leg_units(instrument, position.long.as_ref())?
            + leg_units(instrument, position.short.as_ref())?;

        let side = if net > 0.0 {
            PositionSide::Long
        } else if net < 0.0 {
            PositionSide::Short
        } else {
            PositionSide::Flat
        };
        if side == PositionSide::Flat && policy == FlatPositionPolicy::Skip {
            tracing::debug!(instrument, "flat position skipped");
            continue;
        }

        out.push(NetPosition {
            symbol: venue_symbol(instrument)?,
            side,
            quantity: net.abs(),
        });
    }
    Ok(out)
}

/// Parse and net in one step.
pub fn reconcile_json(
    json: &str,
    policy: FlatPositionPolicy,
) -> Result<Vec<NetPosition>, ReconcileError> {
    net_positions(&parse_positions(json)?, policy)
}
