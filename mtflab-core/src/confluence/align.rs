//! Alignment of a coarser series onto the primary timeline.
//!
//! Each primary position takes the value of the most recent source
//! observation available at it. Positions before the first observation are
//! NaN and nothing is ever filled backward.
//!
//! Bars are stamped at their open, so availability is decided on close
//! times: a source bar reaches primary bar t only once it has closed by the
//! time t closes. A daily bar stamped 00:00 is therefore first seen by the
//! primary bar that ends at the following midnight.

use chrono::{DateTime, Utc};

use crate::domain::{Granularity, TimeSeries};

/// Forward-fill `source` onto `target`: each target timestamp takes the
/// latest source value stamped at or before it. Both indexes must be
/// ascending.
pub fn forward_fill(source: &TimeSeries, target: &[DateTime<Utc>]) -> Vec<f64> {
    fill_as_of(&source.index, &source.values, target.iter().copied())
}

/// Forward-fill on completion time. `source` holds bars of `source_granularity`
/// and `target` is the open-stamped index of `target_granularity` bars.
pub fn forward_fill_closed(
    source: &TimeSeries,
    source_granularity: Granularity,
    target: &[DateTime<Utc>],
    target_granularity: Granularity,
) -> Vec<f64> {
    let closes: Vec<DateTime<Utc>> = source
        .index
        .iter()
        .map(|&t| source_granularity.bar_close(t))
        .collect();
    fill_as_of(
        &closes,
        &source.values,
        target.iter().map(|&t| target_granularity.bar_close(t)),
    )
}

fn fill_as_of(
    index: &[DateTime<Utc>],
    values: &[f64],
    target: impl Iterator<Item = DateTime<Utc>>,
) -> Vec<f64> {
    let mut out = Vec::with_capacity(target.size_hint().0);
    let mut next = 0;
    let mut current = f64::NAN;

    for t in target {
        while next < index.len() && index[next] <= t {
            current = values[next];
            next += 1;
        }
        out.push(current);
    }
    out
}
