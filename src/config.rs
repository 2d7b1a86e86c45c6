//! Configuration for a crack-spread run.
//!
//! Every field has a default, so an empty TOML file (or no file at all) gives
//! the standard CL/RB/HO + CRAK setup.

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::toy_rule::Side;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// First date requested from the provider
    #[serde(default = "default_start")]
    pub start: NaiveDate,

    /// Directory for the processed panel (and the cached price table)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory for plots and text reports
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    #[serde(default)]
    pub instruments: InstrumentConfig,

    #[serde(default)]
    pub signal: SignalConfig,

    /// Historical events drawn on the time-series plots
    #[serde(default = "default_events")]
    pub events: Vec<EventMarker>,

    #[serde(default)]
    pub toy_rule: ToyRuleConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Ticker symbols of the three legs and the equity proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    #[serde(default = "default_crude")]
    pub crude: String,
    #[serde(default = "default_gasoline")]
    pub gasoline: String,
    #[serde(default = "default_heating_oil")]
    pub heating_oil: String,
    #[serde(default = "default_proxy")]
    pub proxy: String,
}

/// Rolling-window and regime parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Rolling window in sessions
    #[serde(default = "default_window")]
    pub window: usize,

    /// Valid observations required before rolling stats are defined
    #[serde(default = "default_min_periods")]
    pub min_periods: usize,

    /// |z| above which the spread is rich/cheap
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Sessions summed into the forward return
    #[serde(default = "default_forward_horizon")]
    pub forward_horizon: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMarker {
    pub date: NaiveDate,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToyRuleConfig {
    #[serde(default = "default_legs")]
    pub legs: Vec<LegConfig>,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Render PNG charts (text reports are always written)
    #[serde(default = "default_plots")]
    pub plots: bool,
}

/// One tradeable instrument of the toy rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegConfig {
    pub symbol: String,
    pub side: Side,
    /// File name of the equity plot, written under `reports_dir`
    pub equity_plot: String,
}

fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or_default()
}
fn default_data_dir() -> PathBuf { PathBuf::from("data/processed") }
fn default_reports_dir() -> PathBuf { PathBuf::from("reports") }
fn default_crude() -> String { "CL=F".to_string() }
fn default_gasoline() -> String { "RB=F".to_string() }
fn default_heating_oil() -> String { "HO=F".to_string() }
fn default_proxy() -> String { "CRAK".to_string() }
fn default_window() -> usize { 252 }
fn default_min_periods() -> usize { 100 }
fn default_threshold() -> f64 { 1.0 }
fn default_forward_horizon() -> usize { 21 }
fn default_plots() -> bool { true }

fn default_events() -> Vec<EventMarker> {
    [(2020, 3, 9, "COVID"), (2022, 2, 24, "Russia invades Ukraine")]
        .into_iter()
        .filter_map(|(y, m, d, label)| {
            NaiveDate::from_ymd_opt(y, m, d).map(|date| EventMarker {
                date,
                label: label.to_string(),
            })
        })
        .collect()
}

fn default_legs() -> Vec<LegConfig> {
    vec![
        LegConfig {
            symbol: default_proxy(),
            side: Side::Long,
            equity_plot: "crack_toy_rule_equity.png".to_string(),
        },
        LegConfig {
            symbol: default_crude(),
            side: Side::Short,
            equity_plot: "crack_toy_rule_equity_CL.png".to_string(),
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start: default_start(),
            data_dir: default_data_dir(),
            reports_dir: default_reports_dir(),
            instruments: InstrumentConfig::default(),
            signal: SignalConfig::default(),
            events: default_events(),
            toy_rule: ToyRuleConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            crude: default_crude(),
            gasoline: default_gasoline(),
            heating_oil: default_heating_oil(),
            proxy: default_proxy(),
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            min_periods: default_min_periods(),
            threshold: default_threshold(),
            forward_horizon: default_forward_horizon(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { plots: default_plots() }
    }
}

impl Default for ToyRuleConfig {
    fn default() -> Self {
        Self { legs: default_legs() }
    }
}

impl InstrumentConfig {
    /// Symbols requested from the provider, legs first.
    pub fn tickers(&self) -> Vec<String> {
        vec![
            self.crude.clone(),
            self.gasoline.clone(),
            self.heating_oil.clone(),
            self.proxy.clone(),
        ]
    }

    /// Instruments whose forward returns are conditioned on the regime.
    pub fn tracked(&self) -> Vec<String> {
        vec![self.crude.clone(), self.proxy.clone()]
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.signal;
        if s.min_periods < 2 {
            anyhow::bail!("min_periods must be at least 2, got {}", s.min_periods);
        }
        if s.min_periods > s.window {
            anyhow::bail!(
                "min_periods ({}) cannot exceed window ({})",
                s.min_periods,
                s.window
            );
        }
        if !(s.threshold > 0.0) {
            anyhow::bail!("threshold must be positive, got {}", s.threshold);
        }
        if s.forward_horizon == 0 {
            anyhow::bail!("forward_horizon must be greater than 0");
        }
        if self.toy_rule.legs.len() > 2 {
            anyhow::bail!(
                "toy rule trades at most two instruments, got {}",
                self.toy_rule.legs.len()
            );
        }
        if self.instruments.tickers().iter().any(|t| t.trim().is_empty()) {
            anyhow::bail!("instrument symbols must not be empty");
        }
        Ok(())
    }

    pub fn panel_csv(&self) -> PathBuf {
        self.data_dir.join("crack_321_panel.csv")
    }

    pub fn prices_csv(&self) -> PathBuf {
        self.data_dir.join("prices.csv")
    }

    pub fn report_path(&self, file_name: &str) -> PathBuf {
        self.reports_dir.join(file_name)
    }
}
