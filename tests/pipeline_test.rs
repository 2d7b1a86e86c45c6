//! End-to-end runs over synthetic prices.

use chrono::{Duration, NaiveDate};
use crack_spread::{
    read_prices_csv, run_analysis, write_prices_csv, Config, CrackError, PriceTable, Regime,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn synthetic_prices(n: usize, with_heating_oil: bool) -> PriceTable {
    let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
    let dates: Vec<NaiveDate> = (0..n).map(|i| start + Duration::days(i as i64)).collect();
    let series = |f: &dyn Fn(f64) -> f64| -> Vec<(NaiveDate, Option<f64>)> {
        dates
            .iter()
            .enumerate()
            .map(|(i, d)| (*d, Some(f(i as f64))))
            .collect()
    };

    let mut columns = vec![
        ("CL=F".to_string(), series(&|i: f64| 70.0 + 5.0 * (i * 0.05).sin())),
        ("RB=F".to_string(), series(&|i: f64| 2.4 + 0.1 * (i * 0.07).sin())),
        ("CRAK".to_string(), series(&|i: f64| 30.0 * (0.0005 * i + 0.01 * (i * 0.2).sin()).exp())),
    ];
    if with_heating_oil {
        columns.push(("HO=F".to_string(), series(&|i: f64| 2.6 + 0.1 * (i * 0.03).cos())));
    }
    PriceTable::from_observations(columns)
}

fn text_only_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.data_dir = root.join("data/processed");
    config.reports_dir = root.join("reports");
    config.output.plots = false;
    config
}

#[test]
fn test_full_run_writes_text_artifacts() {
    let dir = tempdir().unwrap();
    let config = text_only_config(dir.path());
    let px = synthetic_prices(400, true);

    let summary = run_analysis(&px, &config).unwrap();

    assert_eq!(summary.panel.len(), 400);
    assert!(summary.panel.rows[98].z.is_none());
    assert!(summary.panel.rows[99].z.is_some());
    assert!(summary.panel.rows[..99].iter().all(|r| r.regime.is_none()));

    assert!(config.panel_csv().exists());
    for name in [
        "crack_conditional_returns.txt",
        "crack_dashboard.txt",
        "crack_toy_rule_summary.txt",
    ] {
        assert!(config.report_path(name).exists(), "{} missing", name);
    }
    assert!(summary.skipped.is_empty());
    assert_eq!(summary.written.len(), 4);

    let csv = fs::read_to_string(config.panel_csv()).unwrap();
    assert_eq!(csv.lines().count(), 401);

    // Both tracked assets show up, sorted by asset then regime
    let assets: Vec<&str> = summary.conditional.iter().map(|r| r.asset.as_str()).collect();
    assert!(assets.contains(&"CL=F") && assets.contains(&"CRAK"));
    let mut sorted = summary.conditional.clone();
    sorted.sort_by(|a, b| a.asset.cmp(&b.asset).then(a.regime.cmp(&b.regime)));
    assert_eq!(sorted, summary.conditional);

    assert_eq!(summary.toy_rule.len(), 2);
    for leg in &summary.toy_rule {
        assert!(leg.max_drawdown <= 0.0);
    }

    let toy = fs::read_to_string(config.report_path("crack_toy_rule_summary.txt")).unwrap();
    assert!(toy.starts_with("Toy rule (educational, no costs/slippage)\n\n"));
    assert!(toy.contains("CRAK toy rule (long when crack_z>+1, else 0):"));
    assert!(toy.contains("CL=F toy rule (short when crack_z<-1, else 0):"));
}

#[test]
fn test_missing_leg_is_fatal_and_writes_nothing() {
    let dir = tempdir().unwrap();
    let config = text_only_config(dir.path());
    let px = synthetic_prices(200, false);

    let err = run_analysis(&px, &config).unwrap_err();
    let crack_err = err.downcast_ref::<CrackError>().expect("typed error");
    assert!(matches!(crack_err, CrackError::MissingLegs(_)));
    assert!(err.to_string().contains("HO=F"));

    assert!(!config.data_dir.exists());
    assert!(!config.reports_dir.exists());
}

#[test]
fn test_short_history_degrades_gracefully() {
    let dir = tempdir().unwrap();
    let config = text_only_config(dir.path());
    let px = synthetic_prices(60, true);

    let summary = run_analysis(&px, &config).unwrap();

    assert!(summary.panel.rows.iter().all(|r| r.z.is_none() && r.regime.is_none()));
    assert!(summary.conditional.is_empty());
    assert_eq!(summary.skipped, vec!["crack_conditional_returns.txt".to_string()]);

    let dash = fs::read_to_string(config.report_path("crack_dashboard.txt")).unwrap();
    assert!(dash.contains("Z-score (252d): NA"));
    assert!(dash.contains("Regime: NA"));
    assert!(!dash.contains("21d change ($/bbl): NA"));

    // Never in the market without a defined z-score
    let toy = fs::read_to_string(config.report_path("crack_toy_rule_summary.txt")).unwrap();
    assert!(toy.contains("Max drawdown:   0.000"));
}

#[test]
fn test_reruns_are_identical() {
    let dir = tempdir().unwrap();
    let config = text_only_config(dir.path());
    let px = synthetic_prices(300, true);

    let first = run_analysis(&px, &config).unwrap();
    let csv_first = fs::read_to_string(config.panel_csv()).unwrap();
    let second = run_analysis(&px, &config).unwrap();
    let csv_second = fs::read_to_string(config.panel_csv()).unwrap();

    assert_eq!(first.panel, second.panel);
    assert_eq!(csv_first, csv_second);
}

#[test]
fn test_cached_prices_replay_the_same_panel() {
    let dir = tempdir().unwrap();
    let config = text_only_config(dir.path());
    let px = synthetic_prices(250, true);

    write_prices_csv(&px, config.prices_csv()).unwrap();
    let replayed = read_prices_csv(config.prices_csv()).unwrap();
    assert_eq!(replayed, px);

    let a = run_analysis(&px, &config).unwrap();
    let b = run_analysis(&replayed, &config).unwrap();
    assert_eq!(a.panel, b.panel);
}

#[test]
fn test_regimes_partition_defined_zscores() {
    let dir = tempdir().unwrap();
    let config = text_only_config(dir.path());
    let px = synthetic_prices(500, true);

    let summary = run_analysis(&px, &config).unwrap();
    for row in &summary.panel.rows {
        match (row.z, row.regime) {
            (None, None) => {}
            (Some(z), Some(Regime::Rich)) => assert!(z > 1.0),
            (Some(z), Some(Regime::Cheap)) => assert!(z < -1.0),
            (Some(z), Some(Regime::Neutral)) => assert!((-1.0..=1.0).contains(&z)),
            other => panic!("z and regime disagree: {:?}", other),
        }
    }
}

#[test]
fn test_header_only_prices_write_nothing() {
    let dir = tempdir().unwrap();
    let mut config = text_only_config(dir.path());
    config.output.plots = true;

    let csv = dir.path().join("prices.csv");
    fs::write(&csv, "Date,CL=F,RB=F,HO=F,CRAK\n").unwrap();
    let px = read_prices_csv(&csv).unwrap();
    assert!(px.is_empty());

    let summary = run_analysis(&px, &config).unwrap();

    assert!(summary.panel.is_empty());
    assert!(summary.toy_rule.is_empty());
    assert!(summary.written.is_empty(), "wrote {:?}", summary.written);
    assert!(!config.data_dir.exists());
    assert!(!config.reports_dir.exists());
}
