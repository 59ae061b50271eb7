//! Run configuration loaded from TOML.
//!
//! ```toml
//! confirmation_threshold = 0.30
//! primary = "H4"
//!
//! [backtest]
//! instrument = "EUR_USD"
//! split_fraction = 0.70
//!
//! [weights]
//! H1 = 0.10
//! H4 = 0.40
//! D  = 0.30
//! W  = 0.20
//!
//! [D]
//! fast_ma = 10
//! slow_ma = 30
//! rsi_period = 14
//! ```
//!
//! The set of timeframes is the set of keys in `[weights]`; a per-timeframe
//! section only overrides indicator windows. Everything is validated once
//! here and then handed to the pipeline as an immutable [`MtfConfig`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use mtflab_core::confluence::WEIGHT_EPSILON;
use mtflab_core::domain::Granularity;
use mtflab_core::timeframe::{TimeframeError, TimeframeSpec};
use mtflab_core::validation::ValidationConfig;

use crate::cost::CostModel;

/// Content hash of a configuration.
pub type RunId = String;

pub const DEFAULT_THRESHOLD: f64 = 0.30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown timeframe code '{0}' in [weights]")]
    UnknownTimeframe(String),

    #[error("unknown section [{0}] (expected a timeframe code)")]
    UnknownSection(String),

    #[error("confirmation_threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("split_fraction must be in (0, 1), got {0}")]
    InvalidSplit(f64),

    #[error("initial_capital must be positive, got {0}")]
    InvalidCapital(f64),

    #[error("fees must be a non-negative fraction, got {0}")]
    InvalidFees(f64),

    #[error("instrument must not be empty")]
    EmptyInstrument,

    #[error("timeframe weights sum to {0:.4}, above 1")]
    WeightSumExceedsOne(f64),

    #[error("primary timeframe {0} has no entry in [weights]")]
    PrimaryNotWeighted(Granularity),

    #[error(transparent)]
    Timeframe(#[from] TimeframeError),

    #[error("failed to serialize config: {0}")]
    Serialize(String),
}

// ─── Sections ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    #[default]
    Csv,
    Parquet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BacktestSection {
    pub instrument: String,
    pub split_fraction: f64,
    pub initial_capital: f64,
    /// Fixed cost per fill, also the fallback for the spread model.
    pub fees: f64,
    pub cost_model: CostModel,
    pub data_dir: PathBuf,
    pub format: DataFormat,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            instrument: "EUR_USD".to_string(),
            split_fraction: 0.70,
            initial_capital: 10_000.0,
            fees: 0.0002,
            cost_model: CostModel::MeanSpread,
            data_dir: PathBuf::from("data"),
            format: DataFormat::Csv,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct WindowOverrides {
    fast_ma: Option<usize>,
    slow_ma: Option<usize>,
    rsi_period: Option<usize>,
}

/// The document as written, before codes are resolved.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default = "default_threshold")]
    confirmation_threshold: f64,
    #[serde(default = "default_primary")]
    primary: Granularity,
    #[serde(default)]
    backtest: BacktestSection,
    #[serde(default)]
    weights: BTreeMap<String, f64>,
    #[serde(flatten)]
    sections: BTreeMap<String, WindowOverrides>,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_primary() -> Granularity {
    Granularity::H4
}

impl RawConfig {
    fn resolve(self) -> Result<MtfConfig, ConfigError> {
        let mut overrides = BTreeMap::new();
        for (key, section) in self.sections {
            let granularity =
                Granularity::from_str(&key).map_err(|_| ConfigError::UnknownSection(key))?;
            overrides.insert(granularity, section);
        }

        let mut timeframes = Vec::with_capacity(self.weights.len());
        for (key, weight) in self.weights {
            let granularity =
                Granularity::from_str(&key).map_err(|_| ConfigError::UnknownTimeframe(key))?;
            let mut spec = TimeframeSpec::new(granularity, weight);
            if let Some(o) = overrides.remove(&granularity) {
                spec.fast_window = o.fast_ma.unwrap_or(spec.fast_window);
                spec.slow_window = o.slow_ma.unwrap_or(spec.slow_window);
                spec.rsi_period = o.rsi_period.unwrap_or(spec.rsi_period);
            }
            timeframes.push(spec);
        }
        timeframes.sort_by_key(|s| s.granularity);

        for unused in overrides.keys() {
            tracing::debug!(timeframe = %unused, "section has no weight, ignored");
        }

        Ok(MtfConfig {
            confirmation_threshold: self.confirmation_threshold,
            primary: self.primary,
            backtest: self.backtest,
            timeframes,
        })
    }
}

// ─── Validated configuration ─────────────────────────────────────────

/// Validated run configuration. Timeframes are ordered fine to coarse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MtfConfig {
    pub confirmation_threshold: f64,
    pub primary: Granularity,
    pub backtest: BacktestSection,
    pub timeframes: Vec<TimeframeSpec>,
}

impl Default for MtfConfig {
    fn default() -> Self {
        Self {
            confirmation_threshold: DEFAULT_THRESHOLD,
            primary: Granularity::H4,
            backtest: BacktestSection::default(),
            timeframes: vec![
                TimeframeSpec::new(Granularity::H1, 0.10),
                TimeframeSpec::new(Granularity::H4, 0.40),
                TimeframeSpec::new(Granularity::D, 0.30),
                TimeframeSpec::new(Granularity::W, 0.20),
            ],
        }
    }
}

impl MtfConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;
        let config = raw.resolve()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.confirmation_threshold;
        if !(t.is_finite() && t > 0.0 && t <= 1.0) {
            return Err(ConfigError::InvalidThreshold(t));
        }
        let bt = &self.backtest;
        if !(bt.split_fraction > 0.0 && bt.split_fraction < 1.0) {
            return Err(ConfigError::InvalidSplit(bt.split_fraction));
        }
        if !(bt.initial_capital.is_finite() && bt.initial_capital > 0.0) {
            return Err(ConfigError::InvalidCapital(bt.initial_capital));
        }
        if !(bt.fees.is_finite() && bt.fees >= 0.0) {
            return Err(ConfigError::InvalidFees(bt.fees));
        }
        if bt.instrument.trim().is_empty() {
            return Err(ConfigError::EmptyInstrument);
        }

        for spec in &self.timeframes {
            spec.validate()?;
        }
        let total = self.total_weight();
        if total > 1.0 + WEIGHT_EPSILON {
            return Err(ConfigError::WeightSumExceedsOne(total));
        }
        if self.spec(self.primary).is_none() {
            return Err(ConfigError::PrimaryNotWeighted(self.primary));
        }
        Ok(())
    }

    pub fn total_weight(&self) -> f64 {
        self.timeframes.iter().map(|s| s.weight).sum()
    }

    pub fn spec(&self, granularity: Granularity) -> Option<&TimeframeSpec> {
        self.timeframes.iter().find(|s| s.granularity == granularity)
    }

    /// Harness settings for a run charging `fee` per fill.
    pub fn validation_config(&self, fee: f64) -> ValidationConfig {
        ValidationConfig {
            split_fraction: self.backtest.split_fraction,
            threshold: self.confirmation_threshold,
            initial_capital: self.backtest.initial_capital,
            fee,
            periods_per_year: self.primary.periods_per_year(),
        }
    }

    pub fn with_threshold(&self, threshold: f64) -> Self {
        let mut config = self.clone();
        config.confirmation_threshold = threshold;
        config
    }

    /// Copy with the primary timeframe's MA windows replaced.
    pub fn with_primary_windows(&self, fast: usize, slow: usize) -> Self {
        let mut config = self.clone();
        let primary = config.primary;
        for spec in config.timeframes.iter_mut().filter(|s| s.granularity == primary) {
            spec.fast_window = fast;
            spec.slow_window = slow;
        }
        config
    }

    /// Deterministic hash of the configuration (BLAKE3 over its JSON form).
    pub fn run_id(&self) -> RunId {
        // Plain data with string keys always serializes.
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }

    /// Render back to the TOML layout accepted by [`MtfConfig::from_toml`].
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        use toml::{Table, Value};

        let mut root = Table::new();
        root.insert(
            "confirmation_threshold".to_string(),
            Value::Float(self.confirmation_threshold),
        );
        root.insert(
            "primary".to_string(),
            Value::String(self.primary.code().to_string()),
        );
        let backtest =
            Value::try_from(&self.backtest).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        root.insert("backtest".to_string(), backtest);

        let mut weights = Table::new();
        for spec in &self.timeframes {
            let code = spec.granularity.code().to_string();
            weights.insert(code.clone(), Value::Float(spec.weight));

            let mut windows = Table::new();
            windows.insert("fast_ma".to_string(), Value::Integer(spec.fast_window as i64));
            windows.insert("slow_ma".to_string(), Value::Integer(spec.slow_window as i64));
            windows.insert(
                "rsi_period".to_string(),
                Value::Integer(spec.rsi_period as i64),
            );
            root.insert(code, Value::Table(windows));
        }
        root.insert("weights".to_string(), Value::Table(weights));

        toml::to_string_pretty(&root).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}
