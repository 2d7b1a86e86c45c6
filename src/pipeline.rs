//! One analysis run over an already-loaded price table.

use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::conditional::{compute_conditional_forward_returns, ConditionalReturn};
use crate::config::Config;
use crate::panel::{build_crack_panel, CrackPanel};
use crate::plots;
use crate::prices::PriceTable;
use crate::report;
use crate::toy_rule::{summarize, toy_rule, LegSummary};

pub const LEVEL_PNG: &str = "crack_321.png";
pub const ZSCORE_PNG: &str = "crack_321_zscore.png";
pub const SEASONAL_PNG: &str = "crack_seasonality.png";
pub const COND_TXT: &str = "crack_conditional_returns.txt";
pub const DASH_TXT: &str = "crack_dashboard.txt";
pub const TOY_SUMMARY_TXT: &str = "crack_toy_rule_summary.txt";

/// What a run produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub panel: CrackPanel,
    pub conditional: Vec<ConditionalReturn>,
    pub toy_rule: Vec<LegSummary>,
    pub written: Vec<PathBuf>,
    pub skipped: Vec<String>,
}

impl RunSummary {
    fn record(&mut self, name: &str, outcome: Option<PathBuf>) {
        match outcome {
            Some(path) => {
                info!("Wrote {}", path.display());
                self.written.push(path);
            }
            None => {
                warn!("Skipped {}: nothing to report", name);
                self.skipped.push(name.to_string());
            }
        }
    }
}

fn lift(e: Box<dyn std::error::Error>) -> anyhow::Error {
    anyhow!("{}", e)
}

/// Builder -> {analyzer, reports and plots, toy rule}.
///
/// A missing leg is fatal; everything after the panel degrades to skipped
/// artifacts.
pub fn run_analysis(px: &PriceTable, config: &Config) -> Result<RunSummary> {
    let panel = build_crack_panel(px, &config.instruments, &config.signal)?;
    let mut summary = RunSummary::default();

    let csv = report::write_panel_csv(&panel, config.panel_csv())?;
    summary.record("crack_321_panel.csv", csv);

    let conditional = compute_conditional_forward_returns(
        &panel,
        px,
        &config.instruments.tracked(),
        config.signal.forward_horizon,
    );
    let cond = report::write_conditional_table(&conditional, config.report_path(COND_TXT))?;
    summary.record(COND_TXT, cond);

    if config.output.plots {
        let level = plots::plot_crack_level(&panel, &config.events, config.report_path(LEVEL_PNG))
            .map_err(lift)?;
        summary.record(LEVEL_PNG, level);

        let zscore = plots::plot_zscore(
            &panel,
            &config.events,
            config.signal.threshold,
            config.report_path(ZSCORE_PNG),
        )
        .map_err(lift)?;
        summary.record(ZSCORE_PNG, zscore);
    }

    let dash = report::write_dashboard(&panel, config.report_path(DASH_TXT))?;
    summary.record(DASH_TXT, dash);

    let trace = toy_rule(&panel, px, &config.toy_rule.legs, config.signal.threshold);

    if config.output.plots {
        let seasonal =
            plots::plot_seasonality(&panel, config.report_path(SEASONAL_PNG)).map_err(lift)?;
        summary.record(SEASONAL_PNG, seasonal);

        for leg in &trace.legs {
            let out = plots::plot_equity(&trace.dates, leg, config.report_path(&leg.equity_plot))
                .map_err(lift)?;
            summary.record(&leg.equity_plot, out);
        }
    } else {
        info!("Plots disabled, charts not rendered");
    }

    let toy = summarize(&trace);
    for leg in &toy {
        info!("{} toy rule: {} days with a strategy return", leg.symbol, leg.days);
    }
    let toy_txt = report::write_toy_summary(&toy, config.report_path(TOY_SUMMARY_TXT))?;
    summary.record(TOY_SUMMARY_TXT, toy_txt);

    summary.panel = panel;
    summary.conditional = conditional;
    summary.toy_rule = toy;
    Ok(summary)
}
