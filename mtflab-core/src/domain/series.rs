//! Timestamp-indexed numeric series. NaN marks an undefined value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub index: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

impl TimeSeries {
    /// Pairs an ascending index with its values.
    ///
    /// Panics if the lengths differ.
    pub fn new(index: Vec<DateTime<Utc>>, values: Vec<f64>) -> Self {
        assert_eq!(
            index.len(),
            values.len(),
            "time series index and values must have equal length"
        );
        Self { index, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at position `i`, `None` when out of range or undefined.
    pub fn get(&self, i: usize) -> Option<f64> {
        self.values.get(i).copied().filter(|v| !v.is_nan())
    }

    /// Copy of the positions in `range`, clamped to the series bounds.
    pub fn slice(&self, range: Range<usize>) -> TimeSeries {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        TimeSeries {
            index: self.index[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        }
    }

    /// Number of defined (non-NaN) values.
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.index.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.index.last().copied()
    }
}
