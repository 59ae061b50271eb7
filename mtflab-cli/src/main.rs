//! MTFLab CLI: confluence runs, sweeps, data generation and reconciliation.
//!
//! Commands:
//! - `run`: load timeframes, blend signals and print the IS/OOS report
//! - `sweep`: grid over thresholds and primary MA windows
//! - `check-config`: validate a TOML config and print its run id
//! - `generate`: write synthetic candles in the store layout
//! - `reconcile`: net a broker positions document per instrument

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use mtflab_core::data::{
    resample, CsvStore, DataSource, ParquetStore, SyntheticConfig, SyntheticStore,
    TimeSeriesStore,
};
use mtflab_core::domain::Granularity;
use mtflab_runner::reporting::write_json;
use mtflab_runner::{
    load_timeframes, open_store, reconcile_json, run_mtf, ArtifactManager, DataFormat,
    FlatPositionPolicy, MtfConfig, ParamGrid, ParamSweep, SignalPortfolio,
};

#[derive(Parser)]
#[command(
    name = "mtflab",
    about = "MTFLab CLI: multi-timeframe confluence signals with IS/OOS validation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the confluence strategy once and report IS/OOS parity.
    Run {
        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Use seeded synthetic data instead of the configured store.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the report as JSON instead of the text summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Sweep thresholds and primary MA windows.
    Sweep {
        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Use seeded synthetic data instead of the configured store.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Confirmation thresholds to try.
        #[arg(long, value_delimiter = ',', default_values_t = [0.2, 0.3, 0.4, 0.5])]
        thresholds: Vec<f64>,

        /// Primary fast MA windows to try.
        #[arg(long, value_delimiter = ',', default_values_t = [10, 20, 30])]
        fast: Vec<usize>,

        /// Primary slow MA windows to try.
        #[arg(long, value_delimiter = ',', default_values_t = [50, 100])]
        slow: Vec<usize>,

        /// Number of top points to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Run points one at a time.
        #[arg(long, default_value_t = false)]
        serial: bool,

        /// Output directory for sweep results and the best config.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Validate a config file and print the resolved timeframes.
    CheckConfig {
        /// Path to a TOML config file.
        config: PathBuf,
    },
    /// Write synthetic candles for every timeframe in the store layout.
    Generate {
        /// Instruments to generate.
        #[arg(long, value_delimiter = ',', default_value = "EUR_USD")]
        instruments: Vec<String>,

        /// Granularities to write (codes such as H1, H4, D, W).
        #[arg(long, value_delimiter = ',', default_values_t = [Granularity::H1, Granularity::H4, Granularity::D, Granularity::W])]
        granularities: Vec<Granularity>,

        /// Number of base (H1) bars.
        #[arg(long, default_value_t = 2 * 365 * 24)]
        bars: usize,

        /// Random walk seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
        format: FormatArg,

        /// Target data directory.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Net broker positions (long + short legs) per instrument.
    Reconcile {
        /// Positions JSON document.
        file: PathBuf,

        /// Also list instruments whose legs cancel out.
        #[arg(long, default_value_t = false)]
        report_flat: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Parquet,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = dispatch(Cli::parse()) {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            config,
            synthetic,
            output_dir,
            json,
        } => run_cmd(config.as_deref(), synthetic, &output_dir, json),
        Commands::Sweep {
            config,
            synthetic,
            thresholds,
            fast,
            slow,
            top,
            serial,
            output_dir,
        } => {
            let grid = ParamGrid {
                thresholds,
                fast_windows: fast,
                slow_windows: slow,
            };
            sweep_cmd(config.as_deref(), synthetic, &grid, top, serial, &output_dir)
        }
        Commands::CheckConfig { config } => check_config_cmd(&config),
        Commands::Generate {
            instruments,
            granularities,
            bars,
            seed,
            format,
            data_dir,
        } => generate_cmd(&instruments, &granularities, bars, seed, format, &data_dir),
        Commands::Reconcile { file, report_flat } => reconcile_cmd(&file, report_flat),
    }
}

// ─── Shared helpers ──────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> Result<MtfConfig> {
    let config = match path {
        Some(path) => MtfConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            tracing::info!("no config given, using defaults");
            MtfConfig::default()
        }
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn select_store(config: &MtfConfig, synthetic: bool) -> Box<dyn TimeSeriesStore> {
    if synthetic {
        Box::new(SyntheticStore::default())
    } else {
        open_store(&config.backtest)
    }
}

// ─── Commands ────────────────────────────────────────────────────────

fn run_cmd(config: Option<&Path>, synthetic: bool, output_dir: &Path, json: bool) -> Result<()> {
    let config = load_config(config)?;
    let store = select_store(&config, synthetic);

    let output = run_mtf(&config, store.as_ref(), &SignalPortfolio).context("Run failed")?;

    let manager = ArtifactManager::new(output_dir)?;
    let paths = manager.save_run(&output)?;

    if json {
        let report =
            serde_json::to_string_pretty(&output.report).context("Failed to serialize report")?;
        println!("{report}");
    } else {
        print!("{}", output.report.render_summary());
        println!();
        println!("Artifacts saved to: {}", paths.run_dir.display());
    }
    Ok(())
}

fn sweep_cmd(
    config: Option<&Path>,
    synthetic: bool,
    grid: &ParamGrid,
    top: usize,
    serial: bool,
    output_dir: &Path,
) -> Result<()> {
    let config = load_config(config)?;
    if grid.size() == 0 {
        bail!("sweep grid is empty");
    }
    let store = select_store(&config, synthetic);
    let data = load_timeframes(store.as_ref(), &config).context("Failed to load timeframes")?;
    if data.source == DataSource::Synthetic {
        println!("WARNING: sweeping over SYNTHETIC data");
    }

    let results = ParamSweep::new(SignalPortfolio)
        .with_parallelism(!serial)
        .sweep(grid, &config, &data)
        .context("Sweep failed")?;

    println!();
    println!(
        "{:<4} {:>6} {:>5} {:>5} {:>9} {:>9} {:>8} {:>9} {:>9} {:>8}",
        "#", "thr", "fast", "slow", "L IS", "L OOS", "L", "S IS", "S OOS", "S"
    );
    println!("{}", "-".repeat(80));
    for (rank, p) in results.top_n(top).iter().enumerate() {
        println!(
            "{:<4} {:>6.2} {:>5} {:>5} {:>9.3} {:>9.3} {:>8} {:>9.3} {:>9.3} {:>8}",
            rank + 1,
            p.threshold,
            p.fast_window,
            p.slow_window,
            p.long.is_sharpe,
            p.long.oos_sharpe,
            p.long.verdict.to_string(),
            p.short.is_sharpe,
            p.short.oos_sharpe,
            p.short.verdict.to_string(),
        );
    }

    let (long, short) = results.verdict_counts();
    println!();
    println!(
        "Verdicts over {} points: long {} pass / {} weak / {} overfit, short {} pass / {} weak / {} overfit",
        results.len(),
        long.pass,
        long.weak,
        long.overfit,
        short.pass,
        short.weak,
        short.overfit
    );

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let results_path = output_dir.join("sweep_results.json");
    write_json(&results_path, &results)?;
    println!("Sweep results: {}", results_path.display());

    if let Some(best) = results.best_config_toml(&config)? {
        let best_path = output_dir.join("best_config.toml");
        std::fs::write(&best_path, best)
            .with_context(|| format!("Failed to write {}", best_path.display()))?;
        println!("Best config:   {}", best_path.display());
    }
    Ok(())
}

fn check_config_cmd(path: &Path) -> Result<()> {
    let config = load_config(Some(path))?;
    println!("Config OK: {}", path.display());
    println!("Run id:    {}", config.run_id());
    println!(
        "Primary:   {} | threshold ±{:.2} | split {:.0}% IS",
        config.primary,
        config.confirmation_threshold,
        config.backtest.split_fraction * 100.0
    );
    println!();
    println!("{:<4} {:>7} {:>6} {:>6} {:>5}", "TF", "weight", "fast", "slow", "rsi");
    for spec in &config.timeframes {
        println!(
            "{:<4} {:>7.2} {:>6} {:>6} {:>5}",
            spec.granularity.code(),
            spec.weight,
            spec.fast_window,
            spec.slow_window,
            spec.rsi_period
        );
    }
    println!("Total weight: {:.2}", config.total_weight());
    Ok(())
}

fn generate_cmd(
    instruments: &[String],
    granularities: &[Granularity],
    bars: usize,
    seed: u64,
    format: FormatArg,
    data_dir: &Path,
) -> Result<()> {
    let source = SyntheticStore::new(SyntheticConfig {
        bars,
        seed,
        ..Default::default()
    });
    let base = source.config().base;
    let format = match format {
        FormatArg::Csv => DataFormat::Csv,
        FormatArg::Parquet => DataFormat::Parquet,
    };

    for instrument in instruments {
        let base_bars = source.base_bars(instrument);
        for &granularity in granularities {
            if granularity < base {
                tracing::warn!(%granularity, "finer than the {base} base series, skipped");
                continue;
            }
            let series = resample(&base_bars, granularity);
            let path = match format {
                DataFormat::Csv => CsvStore::new(data_dir).write(instrument, granularity, &series),
                DataFormat::Parquet => {
                    ParquetStore::new(data_dir).write(instrument, granularity, &series)
                }
            }
            .with_context(|| format!("Failed to write {instrument} {granularity}"))?;
            println!("{instrument} {granularity}: {} bars → {}", series.len(), path.display());
        }
    }
    println!("WARNING: generated data is SYNTHETIC");
    Ok(())
}

fn reconcile_cmd(file: &Path, report_flat: bool) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let policy = if report_flat {
        FlatPositionPolicy::ReportFlat
    } else {
        FlatPositionPolicy::Skip
    };
    let positions = reconcile_json(&json, policy).context("Failed to reconcile positions")?;

    if positions.is_empty() {
        println!("No open positions.");
        return Ok(());
    }
    println!("{:<10} {:<6} {:>14}", "Symbol", "Side", "Quantity");
    println!("{}", "-".repeat(32));
    for p in &positions {
        println!("{:<10} {:<6} {:>14}", p.symbol, p.side.to_string(), p.quantity);
    }
    Ok(())
}
