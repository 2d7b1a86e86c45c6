//! Regime-triggered toy rule: long the proxy when the spread is rich, short
//! crude when it is cheap, flat otherwise.
//!
//! Educational only: no costs, no slippage, no execution lag.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::conditional::TRADING_DAYS;
use crate::config::LegConfig;
use crate::panel::CrackPanel;
use crate::prices::PriceTable;
use crate::stats::{cumsum_fill_zero, log_returns, mean, sample_std};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// +1 when z > threshold
    Long,
    /// -1 when z < -threshold
    Short,
}

impl Side {
    /// Position flag for one row's z-score; undefined z is flat.
    pub fn position(&self, z: Option<f64>, threshold: f64) -> f64 {
        match (self, z) {
            (Side::Long, Some(z)) if z > threshold => 1.0,
            (Side::Short, Some(z)) if z < -threshold => -1.0,
            _ => 0.0,
        }
    }

    pub fn describe(&self, threshold: f64) -> String {
        match self {
            Side::Long => format!("long when crack_z>+{}, else 0", threshold),
            Side::Short => format!("short when crack_z<-{}, else 0", threshold),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("long"),
            Side::Short => f.write_str("short"),
        }
    }
}

/// Daily trace of one traded instrument.
#[derive(Debug, Clone)]
pub struct LegTrace {
    pub symbol: String,
    pub side: Side,
    pub equity_plot: String,
    pub position: Vec<f64>,
    /// Buy-and-hold daily log return
    pub ret: Vec<Option<f64>>,
    /// Position x daily log return
    pub strat: Vec<Option<f64>>,
    pub cum_ret: Vec<f64>,
    pub cum_strat: Vec<f64>,
}

impl LegTrace {
    pub fn equity_buy_hold(&self) -> Vec<f64> {
        equity_curve(&self.cum_ret)
    }

    pub fn equity_strategy(&self) -> Vec<f64> {
        equity_curve(&self.cum_strat)
    }
}

#[derive(Debug, Clone)]
pub struct ToyRuleTrace {
    pub dates: Vec<NaiveDate>,
    pub threshold: f64,
    pub legs: Vec<LegTrace>,
}

/// Risk summary of one leg, over days with a defined strategy return.
#[derive(Debug, Clone, PartialEq)]
pub struct LegSummary {
    pub symbol: String,
    pub description: String,
    pub days: usize,
    pub ann_return: Option<f64>,
    pub ann_vol: Option<f64>,
    pub sharpe: Option<f64>,
    pub max_drawdown: f64,
}

/// Apply the toy rule row by row.
///
/// Legs whose symbol is not in `px` are skipped; an empty panel trades no legs.
pub fn toy_rule(
    panel: &CrackPanel,
    px: &PriceTable,
    legs: &[LegConfig],
    threshold: f64,
) -> ToyRuleTrace {
    let dates = panel.dates();
    if dates.is_empty() {
        return ToyRuleTrace {
            dates,
            threshold,
            legs: Vec::new(),
        };
    }
    let z = panel.z_scores();

    let traces = legs
        .iter()
        .filter_map(|leg| {
            let prices = px.aligned(&leg.symbol, &dates)?;
            let ret = log_returns(&prices);
            let position: Vec<f64> = z.iter().map(|z| leg.side.position(*z, threshold)).collect();
            let strat: Vec<Option<f64>> = position
                .iter()
                .zip(&ret)
                .map(|(p, r)| r.map(|r| p * r))
                .collect();
            let active = position.iter().filter(|p| **p != 0.0).count();
            info!(
                "Toy rule {} {}: in market {} of {} days",
                leg.side,
                leg.symbol,
                active,
                position.len()
            );
            Some(LegTrace {
                symbol: leg.symbol.clone(),
                side: leg.side,
                equity_plot: leg.equity_plot.clone(),
                cum_ret: cumsum_fill_zero(&ret),
                cum_strat: cumsum_fill_zero(&strat),
                position,
                ret,
                strat,
            })
        })
        .collect();

    ToyRuleTrace {
        dates,
        threshold,
        legs: traces,
    }
}

/// Equity from cumulative log return, starting at 1.0.
pub fn equity_curve(cum: &[f64]) -> Vec<f64> {
    cum.iter().map(|c| c.exp()).collect()
}

/// Worst peak-to-trough fall of `exp(cum)` as a fraction (always <= 0).
pub fn max_drawdown(cum: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for eq in equity_curve(cum) {
        if eq > peak {
            peak = eq;
        }
        let dd = (eq - peak) / peak;
        if dd < worst {
            worst = dd;
        }
    }
    worst
}

pub fn summarize_leg(leg: &LegTrace, threshold: f64) -> LegSummary {
    let daily: Vec<f64> = leg.strat.iter().flatten().copied().collect();
    let ann_return = mean(&daily).map(|m| m * TRADING_DAYS);
    let ann_vol = sample_std(&daily).map(|s| s * TRADING_DAYS.sqrt());
    let sharpe = match (ann_return, ann_vol) {
        (Some(r), Some(v)) if v > 0.0 => Some(r / v),
        _ => None,
    };

    LegSummary {
        symbol: leg.symbol.clone(),
        description: leg.side.describe(threshold),
        days: daily.len(),
        ann_return,
        ann_vol,
        sharpe,
        max_drawdown: max_drawdown(&leg.cum_strat),
    }
}

pub fn summarize(trace: &ToyRuleTrace) -> Vec<LegSummary> {
    trace
        .legs
        .iter()
        .map(|leg| summarize_leg(leg, trace.threshold))
        .collect()
}
