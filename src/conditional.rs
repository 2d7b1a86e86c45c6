//! Forward-return statistics conditioned on the crack regime.
//!
//! The forward return looks ahead by construction. It is only used for ex-post
//! analysis, never as a signal input.

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::panel::{CrackPanel, Regime};
use crate::prices::PriceTable;
use crate::stats::{forward_sum, log_returns, mean, sample_std};

/// Sessions per year used for annualisation.
pub const TRADING_DAYS: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalReturn {
    pub asset: String,
    pub regime: Regime,
    pub count: usize,
    pub mean: f64,
    pub ann_mean: f64,
    pub std: Option<f64>,
    pub ann_sharpe: Option<f64>,
}

/// Per (asset, regime) statistics of the forward `horizon`-session log return.
///
/// Rows without a regime are dropped before returns are computed. Sorted by
/// asset then regime; empty when no tracked asset is in `px`.
pub fn compute_conditional_forward_returns(
    panel: &CrackPanel,
    px: &PriceTable,
    tracked: &[String],
    horizon: usize,
) -> Vec<ConditionalReturn> {
    let rows: Vec<_> = panel.rows.iter().filter(|r| r.regime.is_some()).collect();
    let dates: Vec<_> = rows.iter().map(|r| r.date).collect();
    let periods_per_year = TRADING_DAYS / horizon as f64;

    let mut out = Vec::new();
    for asset in tracked {
        let Some(prices) = px.aligned(asset, &dates) else {
            debug!("{} not in price table, skipping conditional returns", asset);
            continue;
        };
        let fwd = forward_sum(&log_returns(&prices), horizon);

        let mut groups: BTreeMap<Regime, Vec<f64>> = BTreeMap::new();
        for (row, f) in rows.iter().zip(&fwd) {
            if let (Some(regime), Some(value)) = (row.regime, f) {
                groups.entry(regime).or_default().push(*value);
            }
        }

        for (regime, values) in groups {
            let Some(m) = mean(&values) else { continue };
            let sd = sample_std(&values);
            out.push(ConditionalReturn {
                asset: asset.clone(),
                regime,
                count: values.len(),
                mean: m,
                ann_mean: m * periods_per_year,
                std: sd,
                ann_sharpe: sd
                    .filter(|s| *s > 0.0)
                    .map(|s| (m / s) * periods_per_year.sqrt()),
            });
        }
    }

    out.sort_by(|a, b| a.asset.cmp(&b.asset).then(a.regime.cmp(&b.regime)));
    info!("Conditional return table: {} rows", out.len());
    out
}
