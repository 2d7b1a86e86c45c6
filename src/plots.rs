//! PNG charts for the crack panel and the toy rule.
//!
//! Each function returns `Ok(None)` without creating its file when the input
//! has nothing to draw.

use chrono::{Datelike, Duration, NaiveDate};
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};

use crate::config::EventMarker;
use crate::panel::CrackPanel;
use crate::report::ensure_parent;
use crate::toy_rule::LegTrace;

type PlotResult = Result<Option<PathBuf>, Box<dyn Error>>;

const SIZE: (u32, u32) = (1280, 720);

/// Shaded driving-season months, inclusive.
const SEASON_MONTHS: (u32, u32) = (5, 9);

/// Split a nullable series into contiguous drawable runs.
fn segments(points: impl IntoIterator<Item = (NaiveDate, Option<f64>)>) -> Vec<Vec<(NaiveDate, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (d, v) in points {
        match v {
            Some(y) if y.is_finite() => current.push((d, y)),
            _ => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn date_range(segs: &[Vec<(NaiveDate, f64)>]) -> Option<(NaiveDate, NaiveDate)> {
    let first = segs.iter().flatten().map(|(d, _)| *d).min()?;
    let last = segs.iter().flatten().map(|(d, _)| *d).max()?;
    if first == last {
        Some((first - Duration::days(1), last + Duration::days(1)))
    } else {
        Some((first, last))
    }
}

/// Value range with a little headroom, never degenerate.
fn value_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    let span = if hi > lo { hi - lo } else { lo.abs().max(1.0) };
    Some((lo - 0.05 * span, hi + 0.05 * span))
}

/// Average spread level per calendar month, over rows with a level.
pub fn monthly_average(panel: &CrackPanel) -> Vec<(u32, f64)> {
    let mut sums: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for (row, level) in panel.with_crack() {
        let e = sums.entry(row.date.month()).or_insert((0.0, 0));
        e.0 += level;
        e.1 += 1;
    }
    sums.into_iter()
        .map(|(m, (sum, n))| (m, sum / n as f64))
        .collect()
}

/// Time series with event markers; labels alternate height so neighbours don't collide.
fn draw_time_series(
    path: &Path,
    title: &str,
    segs: &[Vec<(NaiveDate, f64)>],
    events: &[EventMarker],
    h_lines: &[f64],
) -> Result<(), Box<dyn Error>> {
    let Some((x0, x1)) = date_range(segs) else {
        return Ok(());
    };
    let values = segs.iter().flatten().map(|(_, v)| *v).chain(h_lines.iter().copied());
    let Some((y0, y1)) = value_range(values) else {
        return Ok(());
    };
    // Headroom above the data for event labels
    let span = y1 - y0;
    let y_top = y1 + 0.15 * span;

    ensure_parent(path)?;
    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y_top)?;

    chart
        .configure_mesh()
        .light_line_style(WHITE)
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m").to_string())
        .draw()?;

    for seg in segs {
        chart.draw_series(LineSeries::new(seg.iter().copied(), &BLUE))?;
    }

    for level in h_lines {
        chart.draw_series(DashedLineSeries::new(
            vec![(x0, *level), (x1, *level)],
            6,
            4,
            RED.stroke_width(1),
        ))?;
    }

    for (i, event) in events.iter().enumerate() {
        if event.date < x0 || event.date > x1 {
            continue;
        }
        chart.draw_series(DashedLineSeries::new(
            vec![(event.date, y0), (event.date, y1)],
            6,
            4,
            BLACK.mix(0.6).stroke_width(1),
        ))?;
        let label_y = y1 + span * (0.03 + 0.06 * (i % 2) as f64);
        chart.draw_series(std::iter::once(Text::new(
            event.label.clone(),
            (event.date, label_y),
            ("sans-serif", 16).into_font(),
        )))?;
    }

    root.present()?;
    Ok(())
}

/// Spread level with event markers.
pub fn plot_crack_level<P: AsRef<Path>>(
    panel: &CrackPanel,
    events: &[EventMarker],
    path: P,
) -> PlotResult {
    let segs = segments(panel.rows.iter().map(|r| (r.date, r.crack)));
    if segs.is_empty() {
        return Ok(None);
    }
    let path = path.as_ref();
    draw_time_series(path, "3-2-1 Crack Spread ($/bbl)", &segs, events, &[])?;
    Ok(Some(path.to_path_buf()))
}

/// Z-score with +/- threshold reference lines and event markers.
pub fn plot_zscore<P: AsRef<Path>>(
    panel: &CrackPanel,
    events: &[EventMarker],
    threshold: f64,
    path: P,
) -> PlotResult {
    let segs = segments(panel.rows.iter().map(|r| (r.date, r.z)));
    if segs.is_empty() {
        return Ok(None);
    }
    let path = path.as_ref();
    draw_time_series(
        path,
        "3-2-1 Crack Spread Z-score (252d)",
        &segs,
        events,
        &[threshold, -threshold],
    )?;
    Ok(Some(path.to_path_buf()))
}

/// Monthly-average spread with the May-September band shaded.
pub fn plot_seasonality<P: AsRef<Path>>(panel: &CrackPanel, path: P) -> PlotResult {
    let monthly = monthly_average(panel);
    let Some((y0, y1)) = value_range(monthly.iter().map(|(_, v)| *v)) else {
        return Ok(None);
    };
    let path = path.as_ref();
    ensure_parent(path)?;

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Crack Spread Seasonality (Monthly Average)", ("sans-serif", 28).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.5f64..12.5f64, y0..y1)?;

    chart
        .configure_mesh()
        .light_line_style(WHITE)
        .x_labels(12)
        .x_label_formatter(&|m: &f64| format!("{:.0}", m))
        .x_desc("Month")
        .y_desc("Avg crack ($/bbl)")
        .draw()?;

    let (from, to) = SEASON_MONTHS;
    chart.draw_series(std::iter::once(Rectangle::new(
        [(from as f64 - 0.5, y0), (to as f64 + 0.5, y1)],
        BLUE.mix(0.15).filled(),
    )))?;

    let points: Vec<(f64, f64)> = monthly.iter().map(|(m, v)| (*m as f64, *v)).collect();
    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;
    chart.draw_series(
        points
            .iter()
            .map(|p| Circle::new(*p, 4, BLUE.filled())),
    )?;

    root.present()?;
    Ok(Some(path.to_path_buf()))
}

/// Buy-and-hold vs toy-rule equity for one leg, $1 start.
pub fn plot_equity<P: AsRef<Path>>(dates: &[NaiveDate], leg: &LegTrace, path: P) -> PlotResult {
    if dates.is_empty() || leg.cum_ret.is_empty() {
        return Ok(None);
    }
    let buy_hold: Vec<(NaiveDate, f64)> =
        dates.iter().copied().zip(leg.equity_buy_hold()).collect();
    let rule: Vec<(NaiveDate, f64)> = dates.iter().copied().zip(leg.equity_strategy()).collect();

    let Some((x0, x1)) = date_range(&[buy_hold.clone()]) else {
        return Ok(None);
    };
    let Some((y0, y1)) = value_range(buy_hold.iter().chain(&rule).map(|(_, v)| *v)) else {
        return Ok(None);
    };

    let path = path.as_ref();
    ensure_parent(path)?;
    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let title = format!("{}: Toy rule vs Buy&Hold (equity, $1 start)", leg.symbol);
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .light_line_style(WHITE)
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m").to_string())
        .draw()?;

    chart
        .draw_series(LineSeries::new(buy_hold, &BLUE))?
        .label(format!("{} buy&hold", leg.symbol))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .draw_series(LineSeries::new(rule, &MAGENTA))?
        .label(format!("{} toy rule", leg.symbol))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], MAGENTA));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(Some(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::PanelRow;
    use tempfile::tempdir;

    fn row(date: NaiveDate, crack: Option<f64>) -> PanelRow {
        PanelRow {
            date,
            cl_bbl: None,
            rbob_bbl: None,
            ho_bbl: None,
            crack,
            z: None,
            regime: None,
        }
    }

    #[test]
    fn test_monthly_average() {
        let d = |m, day| NaiveDate::from_ymd_opt(2023, m, day).unwrap();
        let panel = CrackPanel {
            rows: vec![
                row(d(1, 3), Some(20.0)),
                row(d(1, 4), Some(30.0)),
                row(d(6, 1), Some(40.0)),
                row(d(6, 2), None),
            ],
        };
        assert_eq!(monthly_average(&panel), vec![(1, 25.0), (6, 40.0)]);
    }

    #[test]
    fn test_segments_split_on_gaps() {
        let d = |day| NaiveDate::from_ymd_opt(2023, 1, day).unwrap();
        let segs = segments(vec![
            (d(1), None),
            (d(2), Some(1.0)),
            (d(3), Some(2.0)),
            (d(4), None),
            (d(5), Some(3.0)),
        ]);
        assert_eq!(segs, vec![vec![(d(2), 1.0), (d(3), 2.0)], vec![(d(5), 3.0)]]);
    }

    #[test]
    fn test_value_range_pads_flat_series() {
        let (lo, hi) = value_range([5.0, 5.0].into_iter()).unwrap();
        assert!(lo < 5.0 && hi > 5.0);
        assert!(value_range(std::iter::empty()).is_none());
    }

    #[test]
    fn test_empty_panel_creates_no_plot() {
        let dir = tempdir().unwrap();
        let panel = CrackPanel::default();
        let events = crate::config::Config::default().events;

        assert!(plot_crack_level(&panel, &events, dir.path().join("a.png")).unwrap().is_none());
        assert!(plot_zscore(&panel, &events, 1.0, dir.path().join("b.png")).unwrap().is_none());
        assert!(plot_seasonality(&panel, dir.path().join("c.png")).unwrap().is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_leg_creates_no_equity_plot() {
        let dir = tempdir().unwrap();
        let leg = LegTrace {
            symbol: "CRAK".to_string(),
            side: crate::toy_rule::Side::Long,
            equity_plot: "equity.png".to_string(),
            position: Vec::new(),
            ret: Vec::new(),
            strat: Vec::new(),
            cum_ret: Vec::new(),
            cum_strat: Vec::new(),
        };
        let path = dir.path().join(&leg.equity_plot);

        assert!(plot_equity(&[], &leg, &path).unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_undefined_zscore_creates_no_plot() {
        let dir = tempdir().unwrap();
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let panel = CrackPanel {
            rows: (0..10).map(|i| row(start + Duration::days(i), Some(20.0))).collect(),
        };
        let path = dir.path().join("z.png");
        assert!(plot_zscore(&panel, &[], 1.0, &path).unwrap().is_none());
        assert!(!path.exists());
    }
}
