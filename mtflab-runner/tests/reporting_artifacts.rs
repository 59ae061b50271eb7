//! Artifact export: report JSON, per-bar signals CSV and text summary.

use mtflab_core::data::{SyntheticConfig, SyntheticStore};
use mtflab_runner::reporting::SCHEMA_VERSION;
use mtflab_runner::{run_mtf, ArtifactManager, MtfConfig, MtfReport, SignalPortfolio};
use tempfile::TempDir;

fn run() -> mtflab_runner::RunOutput {
    let store = SyntheticStore::new(SyntheticConfig {
        bars: 24 * 150,
        ..Default::default()
    });
    let config = MtfConfig::from_toml("[D]\nfast_ma = 5\nslow_ma = 20\n[W]\nfast_ma = 2\nslow_ma = 4\nrsi_period = 3\n")
        .unwrap();
    run_mtf(&config, &store, &SignalPortfolio).unwrap()
}

#[test]
fn save_run_writes_all_artifacts() {
    let dir = TempDir::new().unwrap();
    let manager = ArtifactManager::new(dir.path().join("runs")).unwrap();
    let output = run();
    let paths = manager.save_run(&output).unwrap();

    assert!(paths.run_dir.starts_with(manager.output_dir()));
    let dir_name = paths.run_dir.file_name().unwrap().to_string_lossy().to_string();
    assert_eq!(dir_name, format!("EUR_USD_{}", &output.report.run_id[..12]));
    assert!(paths.report_json.exists());
    assert!(paths.signals_csv.exists());
    assert!(paths.summary_txt.exists());
}

#[test]
fn report_json_reloads() {
    let dir = TempDir::new().unwrap();
    let manager = ArtifactManager::new(dir.path()).unwrap();
    let output = run();
    let paths = manager.save_run(&output).unwrap();

    let json = std::fs::read_to_string(&paths.report_json).unwrap();
    let reloaded: MtfReport = serde_json::from_str(&json).unwrap();
    assert_eq!(reloaded.schema_version, SCHEMA_VERSION);
    assert_eq!(reloaded.run_id, output.report.run_id);
    assert_eq!(reloaded.validation.split_index, output.report.validation.split_index);
    assert_eq!(reloaded.distribution, output.report.distribution);
}

#[test]
fn signals_csv_has_one_row_per_primary_bar() {
    let dir = TempDir::new().unwrap();
    let manager = ArtifactManager::new(dir.path()).unwrap();
    let output = run();
    let paths = manager.save_run(&output).unwrap();

    let mut reader = csv::Reader::from_path(&paths.signals_csv).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "timestamp");
    assert_eq!(&headers[2], "score");
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), output.report.bars);

    // Warm-up bars carry no score
    assert!(rows[0][2].is_empty());
    let scored = rows.iter().filter(|r| !r[2].is_empty()).count();
    let distribution = &output.report.distribution;
    assert_eq!(scored, distribution.total() - distribution.undefined);
}

#[test]
fn summary_lists_verdicts_for_both_directions() {
    let dir = TempDir::new().unwrap();
    let manager = ArtifactManager::new(dir.path()).unwrap();
    let output = run();
    let paths = manager.save_run(&output).unwrap();

    let summary = std::fs::read_to_string(&paths.summary_txt).unwrap();
    let verdict_lines = summary
        .lines()
        .filter(|l| l.contains("PASS") || l.contains("WEAK") || l.contains("OVERFIT"))
        .count();
    assert_eq!(verdict_lines, 2);
    assert!(summary.contains("Signal distribution"));
}
