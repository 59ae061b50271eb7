//! Weighted blending of aligned timeframe signals.
//!
//! The blend is a fold over `(values, weight)` pairs producing a running
//! weighted sum and the weight that actually contributed at each index.
//! Undefined values contribute neither to the sum nor to the coverage.

use serde::{Deserialize, Serialize};

use crate::domain::Granularity;

/// Tolerance below 1.0 under which coverage counts as partial.
pub const WEIGHT_EPSILON: f64 = 1e-9;

/// One timeframe's signal aligned to the primary index.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub granularity: Granularity,
    pub weight: f64,
    pub values: Vec<f64>,
}

/// Output of [`blend`], one entry per primary index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blended {
    pub scores: Vec<f64>,
    pub coverage: Vec<f64>,
}

/// Weighted sum normalised by contributing weight when that weight is
/// below 1. At or above 1 the sum is returned unchanged. Zero coverage is
/// undefined.
pub fn normalise(weighted_sum: f64, coverage: f64) -> f64 {
    if coverage <= 0.0 {
        f64::NAN
    } else if coverage < 1.0 - WEIGHT_EPSILON {
        weighted_sum / coverage
    } else {
        weighted_sum
    }
}

/// Blend `contributions` over a primary index of length `len`.
///
/// Panics if a contribution's length differs from `len`.
pub fn blend(len: usize, contributions: &[Contribution]) -> Blended {
    let (sums, coverage) = contributions.iter().fold(
        (vec![0.0; len], vec![0.0; len]),
        |(mut sums, mut coverage), c| {
            assert_eq!(
                c.values.len(),
                len,
                "{} contribution not aligned to the primary index",
                c.granularity
            );
            for (i, &v) in c.values.iter().enumerate() {
                if !v.is_nan() {
                    sums[i] += v * c.weight;
                    coverage[i] += c.weight;
                }
            }
            (sums, coverage)
        },
    );

    let scores = sums
        .iter()
        .zip(&coverage)
        .map(|(&s, &w)| normalise(s, w))
        .collect();

    Blended { scores, coverage }
}
