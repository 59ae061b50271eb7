//! The run report and its console rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use mtflab_core::data::DataSource;
use mtflab_core::domain::Granularity;
use mtflab_core::rules::Direction;
use mtflab_core::validation::{SegmentResult, ValidationResult};

use crate::cost::{FeeEstimate, FeeSource};
use crate::data_loader::{SkipReason, SkippedTimeframe};
use crate::runner::{SignalDistribution, TimeframeStats};

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of one confluence run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MtfReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub instrument: String,
    pub primary: Granularity,
    pub data_source: DataSource,
    pub dataset_hash: String,
    pub threshold: f64,
    pub fee: FeeEstimate,
    pub bars: usize,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    /// Sum of weights that actually contributed.
    pub total_weight: f64,
    pub timeframes: Vec<TimeframeStats>,
    pub skipped: Vec<SkippedTimeframe>,
    pub distribution: SignalDistribution,
    pub validation: ValidationResult,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

fn date(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

impl MtfReport {
    pub fn is_synthetic(&self) -> bool {
        self.data_source == DataSource::Synthetic
    }

    /// Plain-text summary for the console.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        let rule = "─".repeat(64);

        let _ = writeln!(
            out,
            "MTF confluence: {} {} ({:?} data, dataset {}, run {})",
            self.instrument,
            self.primary,
            self.data_source,
            short_hash(&self.dataset_hash),
            short_hash(&self.run_id),
        );
        if self.is_synthetic() {
            let _ = writeln!(out, "WARNING: synthetic data, results are not meaningful");
        }
        let fee_note = match self.fee.source {
            FeeSource::Fixed => "fixed".to_string(),
            FeeSource::Spread { bars_with_spread } => {
                format!("mean spread over {bars_with_spread} bars")
            }
        };
        let _ = writeln!(
            out,
            "Threshold ±{:.2} | fee {:.6} ({}) | contributing weight {:.2}",
            self.threshold, self.fee.fee, fee_note, self.total_weight
        );

        let _ = writeln!(out, "{rule}\nTimeframes:");
        for tf in &self.timeframes {
            let _ = writeln!(
                out,
                "  {:<3} w={:.2}  bullish {:>3.0}% | bearish {:>3.0}% | {:>6} bars",
                tf.granularity.code(),
                tf.weight,
                tf.bullish * 100.0,
                tf.bearish * 100.0,
                tf.bars
            );
        }
        for s in &self.skipped {
            let why = match s.reason {
                SkipReason::ZeroWeight => "weight 0",
                SkipReason::Unavailable => "unavailable",
            };
            let _ = writeln!(out, "  {:<3} skipped ({why})", s.granularity.code());
        }

        let d = &self.distribution;
        let _ = writeln!(out, "{rule}\nSignal distribution ({} bars):", d.total());
        for (label, count) in [
            ("Long", d.long),
            ("Short", d.short),
            ("Neutral", d.neutral),
            ("Undefined", d.undefined),
        ] {
            let _ = writeln!(
                out,
                "  {label:<9} {count:>6} ({:>5.1}%)",
                d.share(count) * 100.0
            );
        }

        let v = &self.validation;
        let _ = writeln!(out, "{rule}");
        for seg in [&v.in_sample, &v.out_of_sample] {
            let _ = writeln!(
                out,
                "{:<3} {:>6} bars ({} → {})",
                seg.segment.to_string(),
                seg.bars(),
                date(seg.first_timestamp),
                date(seg.last_timestamp)
            );
        }
        let _ = writeln!(
            out,
            "\n           Return   Sharpe    MaxDD  Trades   Win%"
        );
        for seg in [&v.in_sample, &v.out_of_sample] {
            render_segment(&mut out, seg);
        }

        let _ = writeln!(out, "{rule}\nParity (OOS Sharpe / IS Sharpe):");
        for direction in Direction::BOTH {
            let p = v.parity(direction);
            let _ = writeln!(
                out,
                "  {:<5}  IS {:>6.2}  OOS {:>6.2}  ratio {:>6.2}  {}",
                p.direction.to_string(),
                p.is_sharpe,
                p.oos_sharpe,
                p.ratio,
                p.verdict
            );
        }
        out
    }
}

fn render_segment(out: &mut String, seg: &SegmentResult) {
    for direction in Direction::BOTH {
        let s = seg.stats(direction);
        let _ = writeln!(
            out,
            "{:<3} {:<5} {:>+8.2}% {:>8.2} {:>+7.2}% {:>7} {:>5.1}%",
            seg.segment.to_string(),
            direction.to_string(),
            s.total_return * 100.0,
            s.sharpe,
            s.max_drawdown * 100.0,
            s.trade_count,
            s.win_rate * 100.0
        );
    }
    let _ = writeln!(
        out,
        "{:<3} combined {:>+5.2}%",
        seg.segment.to_string(),
        seg.combined_return * 100.0
    );
}
