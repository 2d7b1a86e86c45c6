//! Flat-file reports: panel CSV, conditional-return table, dashboard snapshot
//! and toy-rule summary.
//!
//! Every writer returns `Ok(None)` without touching its target when there is
//! nothing to report.

use anyhow::Result;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::conditional::ConditionalReturn;
use crate::panel::CrackPanel;
use crate::toy_rule::LegSummary;

/// Sessions back for the dashboard change.
const DASHBOARD_CHANGE_LAG: usize = 21;

/// Create the parent directory of `path` if needed.
pub fn ensure_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.*}", decimals, v),
        _ => "NA".to_string(),
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Full crack panel as CSV.
pub fn write_panel_csv<P: AsRef<Path>>(panel: &CrackPanel, path: P) -> Result<Option<PathBuf>> {
    if panel.is_empty() {
        return Ok(None);
    }
    let path = path.as_ref();
    ensure_parent(path)?;
    let mut file = File::create(path)?;

    writeln!(file, "Date,CL_$/bbl,RBOB_$/bbl,HO_$/bbl,crack_321,crack_z_252,regime")?;
    for row in &panel.rows {
        writeln!(
            file,
            "{},{},{},{},{},{},{}",
            row.date.format("%Y-%m-%d"),
            cell(row.cl_bbl),
            cell(row.rbob_bbl),
            cell(row.ho_bbl),
            cell(row.crack),
            cell(row.z),
            row.regime.map(|r| r.label()).unwrap_or("")
        )?;
    }
    Ok(Some(path.to_path_buf()))
}

/// Render the conditional-return table as aligned text.
pub fn format_conditional_table(table: &[ConditionalReturn]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<8} {:<20} {:>6} {:>10} {:>10} {:>10} {:>10}\n",
        "asset", "regime", "count", "mean", "ann_mean", "std", "ann_sharpe"
    ));
    for row in table {
        out.push_str(&format!(
            "{:<8} {:<20} {:>6} {:>10.4} {:>10.4} {:>10} {:>10}\n",
            row.asset,
            row.regime.label(),
            row.count,
            row.mean,
            row.ann_mean,
            fmt_opt(row.std, 4),
            fmt_opt(row.ann_sharpe, 4),
        ));
    }
    out
}

pub fn write_conditional_table<P: AsRef<Path>>(
    table: &[ConditionalReturn],
    path: P,
) -> Result<Option<PathBuf>> {
    if table.is_empty() {
        return Ok(None);
    }
    let path = path.as_ref();
    ensure_parent(path)?;
    fs::write(path, format_conditional_table(table))?;
    Ok(Some(path.to_path_buf()))
}

/// Point-in-time snapshot of the latest row with a spread level.
pub fn dashboard_text(panel: &CrackPanel) -> Option<String> {
    let rows: Vec<_> = panel.with_crack().collect();
    let (last, level) = *rows.last()?;

    let change = if rows.len() > DASHBOARD_CHANGE_LAG {
        Some(level - rows[rows.len() - 1 - DASHBOARD_CHANGE_LAG].1)
    } else {
        None
    };

    Some(format!(
        "Date: {}\nCrack ($/bbl): {:.2}\nZ-score (252d): {}\nRegime: {}\n21d change ($/bbl): {}\n",
        last.date.format("%Y-%m-%d"),
        level,
        fmt_opt(last.z, 2),
        last.regime.map(|r| r.label()).unwrap_or("NA"),
        fmt_opt(change, 2),
    ))
}

pub fn write_dashboard<P: AsRef<Path>>(panel: &CrackPanel, path: P) -> Result<Option<PathBuf>> {
    let Some(text) = dashboard_text(panel) else {
        return Ok(None);
    };
    let path = path.as_ref();
    ensure_parent(path)?;
    fs::write(path, text)?;
    Ok(Some(path.to_path_buf()))
}

pub fn format_toy_summary(summaries: &[LegSummary]) -> String {
    let mut lines = vec![
        "Toy rule (educational, no costs/slippage)".to_string(),
        String::new(),
    ];
    for s in summaries {
        lines.push(format!("{} toy rule ({}):", s.symbol, s.description));
        lines.push(format!("  Ann. return:  {:>7}", fmt_opt(s.ann_return, 3)));
        lines.push(format!("  Ann. vol:     {:>7}", fmt_opt(s.ann_vol, 3)));
        lines.push(format!("  Sharpe:       {:>7}", fmt_opt(s.sharpe, 3)));
        lines.push(format!("  Max drawdown: {:>7}", fmt_opt(Some(s.max_drawdown), 3)));
        lines.push(String::new());
    }
    lines.join("\n")
}

pub fn write_toy_summary<P: AsRef<Path>>(
    summaries: &[LegSummary],
    path: P,
) -> Result<Option<PathBuf>> {
    if summaries.is_empty() {
        return Ok(None);
    }
    let path = path.as_ref();
    ensure_parent(path)?;
    fs::write(path, format_toy_summary(summaries))?;
    Ok(Some(path.to_path_buf()))
}
