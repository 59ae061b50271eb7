//! Entry/exit rules derived from the confluence score.
//!
//! Per bar, stateless:
//! - long entry  when score >= +threshold
//! - long exit   when score <  0
//! - short entry when score <= -threshold
//! - short exit  when score >  0
//!
//! An undefined score triggers nothing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::Long, Direction::Short];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => f.write_str("long"),
            Direction::Short => f.write_str("short"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    #[error("confirmation threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),
}

/// Boolean trigger sequences, one entry per score position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryExitSet {
    pub long_entries: Vec<bool>,
    pub long_exits: Vec<bool>,
    pub short_entries: Vec<bool>,
    pub short_exits: Vec<bool>,
}

impl EntryExitSet {
    pub fn len(&self) -> usize {
        self.long_entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.long_entries.is_empty()
    }

    /// The `(entries, exits)` pair for one direction.
    pub fn for_direction(&self, direction: Direction) -> (&[bool], &[bool]) {
        match direction {
            Direction::Long => (&self.long_entries, &self.long_exits),
            Direction::Short => (&self.short_entries, &self.short_exits),
        }
    }

    /// Copy of the positions in `range`.
    pub fn slice(&self, range: Range<usize>) -> EntryExitSet {
        EntryExitSet {
            long_entries: self.long_entries[range.clone()].to_vec(),
            long_exits: self.long_exits[range.clone()].to_vec(),
            short_entries: self.short_entries[range.clone()].to_vec(),
            short_exits: self.short_exits[range].to_vec(),
        }
    }
}

pub fn validate_threshold(threshold: f64) -> Result<(), RuleError> {
    if threshold.is_finite() && threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(RuleError::InvalidThreshold(threshold))
    }
}

pub fn long_entry(score: f64, threshold: f64) -> bool {
    score >= threshold
}

pub fn long_exit(score: f64) -> bool {
    score < 0.0
}

pub fn short_entry(score: f64, threshold: f64) -> bool {
    score <= -threshold
}

pub fn short_exit(score: f64) -> bool {
    score > 0.0
}

/// Derive all four trigger sequences from `scores`.
pub fn generate(scores: &[f64], threshold: f64) -> Result<EntryExitSet, RuleError> {
    validate_threshold(threshold)?;
    // NaN compares false in every predicate below.
    Ok(EntryExitSet {
        long_entries: scores.iter().map(|&s| long_entry(s, threshold)).collect(),
        long_exits: scores.iter().map(|&s| long_exit(s)).collect(),
        short_entries: scores.iter().map(|&s| short_entry(s, threshold)).collect(),
        short_exits: scores.iter().map(|&s| short_exit(s)).collect(),
    })
}
