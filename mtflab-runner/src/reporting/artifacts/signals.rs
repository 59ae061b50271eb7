//! Per-bar score and trigger export (CSV).

use anyhow::{bail, Context, Result};
use std::path::Path;

use mtflab_core::confluence::ConfluenceScore;
use mtflab_core::domain::TimeSeries;
use mtflab_core::rules;

/// One row per primary bar. Undefined scores are written as empty fields.
/// Returns the number of rows written.
pub fn write_signals_csv(
    path: &Path,
    close: &TimeSeries,
    score: &ConfluenceScore,
    threshold: f64,
) -> Result<usize> {
    if close.index != score.series.index {
        bail!(
            "close ({} bars) and score ({} bars) are not on the same index",
            close.len(),
            score.len()
        );
    }
    let triggers = rules::generate(&score.series.values, threshold)?;

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create signals CSV {}", path.display()))?;
    writer.write_record([
        "timestamp",
        "close",
        "score",
        "coverage",
        "long_entry",
        "long_exit",
        "short_entry",
        "short_exit",
    ])?;

    let flag = |b: bool| if b { "1" } else { "0" };
    for (i, ts) in score.series.index.iter().enumerate() {
        let value = score.series.values[i];
        writer.write_record([
            ts.to_rfc3339(),
            close.values[i].to_string(),
            if value.is_nan() {
                String::new()
            } else {
                format!("{value:.6}")
            },
            format!("{:.4}", score.coverage[i]),
            flag(triggers.long_entries[i]).to_string(),
            flag(triggers.long_exits[i]).to_string(),
            flag(triggers.short_entries[i]).to_string(),
            flag(triggers.short_exits[i]).to_string(),
        ])?;
    }
    writer.flush().context("Failed to flush signals CSV")?;

    Ok(score.len())
}
