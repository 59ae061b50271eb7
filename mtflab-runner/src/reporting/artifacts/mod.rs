//! Artifact manager for persisting run outputs.

mod signals;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::runner::RunOutput;

pub use signals::write_signals_csv;

/// Artifact paths returned after export.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub run_dir: PathBuf,
    pub report_json: PathBuf,
    pub signals_csv: PathBuf,
    pub summary_txt: PathBuf,
}

/// Manages writing all artifacts for a run.
#[derive(Debug, Clone)]
pub struct ArtifactManager {
    output_dir: PathBuf,
}

impl ArtifactManager {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)
            .context("Failed to create artifact output directory")?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Save report, per-bar signals and the text summary under
    /// `{output_dir}/{instrument}_{run_id prefix}/`.
    pub fn save_run(&self, output: &RunOutput) -> Result<ArtifactPaths> {
        let report = &output.report;
        let prefix = report.run_id.get(..12).unwrap_or(&report.run_id);
        let run_dir = self
            .output_dir
            .join(format!("{}_{}", report.instrument, prefix));
        std::fs::create_dir_all(&run_dir).context("Failed to create run artifact directory")?;

        let report_json = run_dir.join("report.json");
        write_json(&report_json, report)?;

        let signals_csv = run_dir.join("signals.csv");
        write_signals_csv(&signals_csv, &output.close, &output.score, report.threshold)?;

        let summary_txt = run_dir.join("summary.txt");
        std::fs::write(&summary_txt, report.render_summary())
            .with_context(|| format!("Failed to write summary {}", summary_txt.display()))?;

        tracing::info!(dir = %run_dir.display(), "artifacts written");
        Ok(ArtifactPaths {
            run_dir,
            report_json,
            signals_csv,
            summary_txt,
        })
    }
}

/// Pretty-printed JSON file.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
