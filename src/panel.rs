//! 3-2-1 crack spread panel: leg prices in $/bbl, spread level, rolling z-score
//! and regime.

use chrono::NaiveDate;
use std::fmt;
use tracing::info;

use crate::config::{InstrumentConfig, SignalConfig};
use crate::error::{CrackError, Result};
use crate::prices::PriceTable;
use crate::stats::rolling_mean_std;

/// Gallons per barrel; RBOB and heating oil quote in $/gal.
pub const GALLONS_PER_BARREL: f64 = 42.0;

/// Relative tolerance under which a rolling std counts as zero.
const ZERO_STD_TOL: f64 = 1e-12;

/// Spread richness relative to its trailing history.
///
/// Variant order follows the display labels alphabetically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Regime {
    Cheap,
    Neutral,
    Rich,
}

impl Regime {
    /// Strict partition of a defined z-score; `z == ±threshold` is neutral.
    pub fn classify(z: f64, threshold: f64) -> Self {
        if z > threshold {
            Regime::Rich
        } else if z < -threshold {
            Regime::Cheap
        } else {
            Regime::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Regime::Rich => "rich (high margin)",
            Regime::Cheap => "cheap (low margin)",
            Regime::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelRow {
    pub date: NaiveDate,
    pub cl_bbl: Option<f64>,
    pub rbob_bbl: Option<f64>,
    pub ho_bbl: Option<f64>,
    pub crack: Option<f64>,
    pub z: Option<f64>,
    pub regime: Option<Regime>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrackPanel {
    pub rows: Vec<PanelRow>,
}

impl CrackPanel {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    pub fn z_scores(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.z).collect()
    }

    /// Rows with a defined spread level.
    pub fn with_crack(&self) -> impl Iterator<Item = (&PanelRow, f64)> {
        self.rows.iter().filter_map(|r| r.crack.map(|c| (r, c)))
    }
}

/// 2 x gasoline + 1 x heating oil - 3 x crude, all in $/bbl.
pub fn crack_321(cl_bbl: f64, rbob_bbl: f64, ho_bbl: f64) -> f64 {
    (2.0 * rbob_bbl + 1.0 * ho_bbl) - 3.0 * cl_bbl
}

/// Build the crack panel from a price table holding the three legs.
pub fn build_crack_panel(
    px: &PriceTable,
    instruments: &InstrumentConfig,
    signal: &SignalConfig,
) -> Result<CrackPanel> {
    let legs = [&instruments.crude, &instruments.gasoline, &instruments.heating_oil];
    let mut missing: Vec<String> = legs
        .iter()
        .filter(|s| !px.has(s))
        .map(|s| s.to_string())
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(CrackError::MissingLegs(missing));
    }

    let (Some(cl), Some(rb), Some(ho)) = (
        px.column(&instruments.crude),
        px.column(&instruments.gasoline),
        px.column(&instruments.heating_oil),
    ) else {
        return Err(CrackError::MissingLegs(Vec::new()));
    };

    let mut rows: Vec<PanelRow> = Vec::with_capacity(px.len());
    for (i, date) in px.dates.iter().enumerate() {
        let cl_bbl = cl[i];
        let rbob_bbl = rb[i].map(|p| p * GALLONS_PER_BARREL);
        let ho_bbl = ho[i].map(|p| p * GALLONS_PER_BARREL);
        let crack = match (cl_bbl, rbob_bbl, ho_bbl) {
            (Some(c), Some(r), Some(h)) => Some(crack_321(c, r, h)),
            _ => None,
        };
        rows.push(PanelRow {
            date: *date,
            cl_bbl,
            rbob_bbl,
            ho_bbl,
            crack,
            z: None,
            regime: None,
        });
    }

    let levels: Vec<Option<f64>> = rows.iter().map(|r| r.crack).collect();
    let rolling = rolling_mean_std(&levels, signal.window, signal.min_periods);

    for (row, (mu, sd)) in rows.iter_mut().zip(rolling) {
        row.z = match (row.crack, mu, sd) {
            (Some(x), Some(m), Some(s)) if s > ZERO_STD_TOL * m.abs().max(1.0) => {
                Some((x - m) / s)
            }
            _ => None,
        };
        row.regime = row.z.map(|z| Regime::classify(z, signal.threshold));
    }

    let defined = rows.iter().filter(|r| r.z.is_some()).count();
    info!("Crack panel: {} rows, {} with a defined z-score", rows.len(), defined);

    Ok(CrackPanel { rows })
}
