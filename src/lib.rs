//! 3-2-1 crack spread analysis.
//!
//! Downloads daily CL/RB/HO futures (plus an equity proxy), builds the crack
//! spread with a rolling z-score and regime, conditions forward returns on the
//! regime, and backtests a cost-free toy rule.
//!
//! # Modules
//!
//! - `config` - TOML configuration with defaults
//! - `yahoo`, `loader` - price download and the flat-file cache
//! - `prices` - date-indexed price table
//! - `panel` - crack spread, z-score and regime
//! - `conditional` - forward returns grouped by regime
//! - `toy_rule` - threshold rule, equity curves and risk summary
//! - `report`, `plots` - text/CSV reports and PNG charts
//! - `pipeline` - one full analysis run

pub mod conditional;
pub mod config;
pub mod error;
pub mod loader;
pub mod panel;
pub mod pipeline;
pub mod plots;
pub mod prices;
pub mod report;
pub mod stats;
pub mod toy_rule;
pub mod yahoo;

pub use conditional::{compute_conditional_forward_returns, ConditionalReturn};
pub use config::Config;
pub use error::CrackError;
pub use loader::{download_prices, read_prices_csv, write_prices_csv};
pub use panel::{build_crack_panel, CrackPanel, PanelRow, Regime};
pub use pipeline::{run_analysis, RunSummary};
pub use prices::PriceTable;
pub use toy_rule::{max_drawdown, summarize, toy_rule, LegSummary, Side, ToyRuleTrace};
pub use yahoo::YahooClient;
