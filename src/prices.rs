//! Date-indexed daily price table.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::error::{CrackError, Result};
use crate::stats::forward_fill;

/// One instrument's close series, aligned to the table's dates.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceColumn {
    pub symbol: String,
    pub values: Vec<Option<f64>>,
}

/// Daily prices for a set of instruments.
///
/// Dates are strictly increasing. A missing observation is `None`, never zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<PriceColumn>,
}

/// Raw history for one symbol as returned by the provider.
#[derive(Debug, Clone, Default)]
pub struct SymbolHistory {
    pub symbol: String,
    pub dates: Vec<NaiveDate>,
    /// Dividend/split adjusted close, when supplied
    pub adj_close: Option<Vec<Option<f64>>>,
    pub close: Option<Vec<Option<f64>>>,
}

impl PriceTable {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.symbol.as_str()).collect()
    }

    pub fn has(&self, symbol: &str) -> bool {
        self.columns.iter().any(|c| c.symbol == symbol)
    }

    pub fn column(&self, symbol: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.symbol == symbol)
            .map(|c| c.values.as_slice())
    }

    /// Build a table from per-symbol `(date, value)` observations.
    ///
    /// Dates are the union over all symbols; a later duplicate date overwrites an earlier one.
    pub fn from_observations(series: Vec<(String, Vec<(NaiveDate, Option<f64>)>)>) -> Self {
        let all_dates: BTreeSet<NaiveDate> = series
            .iter()
            .flat_map(|(_, obs)| obs.iter().map(|(d, _)| *d))
            .collect();
        let dates: Vec<NaiveDate> = all_dates.into_iter().collect();
        let index: HashMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let columns = series
            .into_iter()
            .map(|(symbol, obs)| {
                let mut values = vec![None; dates.len()];
                for (d, v) in obs {
                    values[index[&d]] = v.filter(|x| x.is_finite());
                }
                PriceColumn { symbol, values }
            })
            .collect();

        Self { dates, columns }
    }

    /// Fill interior gaps from the most recent known value.
    pub fn forward_fill(&mut self) {
        for col in &mut self.columns {
            forward_fill(&mut col.values);
        }
    }

    /// Drop rows where every instrument is missing.
    pub fn drop_empty_rows(&mut self) {
        let keep: Vec<bool> = (0..self.dates.len())
            .map(|i| self.columns.iter().any(|c| c.values[i].is_some()))
            .collect();

        let dropped = keep.iter().filter(|k| !**k).count();
        if dropped > 0 {
            debug!("Dropping {} all-empty rows", dropped);
        }

        let mut flags = keep.iter();
        self.dates.retain(|_| *flags.next().unwrap_or(&false));
        for col in &mut self.columns {
            let mut flags = keep.iter();
            col.values.retain(|_| *flags.next().unwrap_or(&false));
        }
    }

    /// Values of `symbol` re-indexed onto `dates`, forward-filled.
    pub fn aligned(&self, symbol: &str, dates: &[NaiveDate]) -> Option<Vec<Option<f64>>> {
        let values = self.column(symbol)?;
        let index: HashMap<NaiveDate, usize> =
            self.dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();
        let mut out: Vec<Option<f64>> = dates
            .iter()
            .map(|d| index.get(d).and_then(|&i| values[i]))
            .collect();
        forward_fill(&mut out);
        Some(out)
    }
}

/// Pick the best price field for each requested symbol and assemble the table.
///
/// Adjusted close wins over raw close. Symbols the provider did not return are
/// left out; forward-fill runs before empty rows are dropped.
pub fn extract_close_frame(histories: Vec<SymbolHistory>, tickers: &[String]) -> Result<PriceTable> {
    let mut by_symbol: BTreeMap<String, Vec<(NaiveDate, Option<f64>)>> = BTreeMap::new();

    for h in histories {
        if !tickers.contains(&h.symbol) {
            debug!("Ignoring unrequested symbol {}", h.symbol);
            continue;
        }
        let field = match (h.adj_close, h.close) {
            (Some(adj), _) => adj,
            (None, Some(close)) => close,
            (None, None) => return Err(CrackError::MissingPriceField { symbol: h.symbol }),
        };
        if field.len() != h.dates.len() {
            return Err(CrackError::Provider {
                message: format!("{} prices for {} dates", field.len(), h.dates.len()),
                symbol: h.symbol,
            });
        }
        let obs = h.dates.into_iter().zip(field).collect();
        by_symbol.insert(h.symbol, obs);
    }

    let series: Vec<(String, Vec<(NaiveDate, Option<f64>)>)> = tickers
        .iter()
        .filter_map(|t| by_symbol.remove(t).map(|obs| (t.clone(), obs)))
        .collect();

    if series.is_empty() {
        return Err(CrackError::NoTickersReturned);
    }

    let missing: Vec<&String> = tickers
        .iter()
        .filter(|t| !series.iter().any(|(s, _)| s == *t))
        .collect();
    if !missing.is_empty() {
        warn!("Provider returned no data for {:?}", missing);
    }

    let mut table = PriceTable::from_observations(series);
    table.forward_fill();
    table.drop_empty_rows();
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn tickers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_prefers_adjusted_close() {
        let h = SymbolHistory {
            symbol: "CRAK".to_string(),
            dates: vec![d(2), d(3)],
            adj_close: Some(vec![Some(30.0), Some(31.0)]),
            close: Some(vec![Some(32.0), Some(33.0)]),
        };
        let table = extract_close_frame(vec![h], &tickers(&["CRAK"])).unwrap();
        assert_eq!(table.column("CRAK").unwrap(), &[Some(30.0), Some(31.0)]);
    }

    #[test]
    fn test_falls_back_to_close() {
        let h = SymbolHistory {
            symbol: "CL=F".to_string(),
            dates: vec![d(2)],
            adj_close: None,
            close: Some(vec![Some(80.0)]),
        };
        let table = extract_close_frame(vec![h], &tickers(&["CL=F"])).unwrap();
        assert_eq!(table.column("CL=F").unwrap(), &[Some(80.0)]);
    }

    #[test]
    fn test_missing_both_fields_is_fatal() {
        let h = SymbolHistory {
            symbol: "CL=F".to_string(),
            dates: vec![d(2)],
            adj_close: None,
            close: None,
        };
        let err = extract_close_frame(vec![h], &tickers(&["CL=F"])).unwrap_err();
        assert!(matches!(err, CrackError::MissingPriceField { .. }));
    }

    #[test]
    fn test_misaligned_history_is_fatal() {
        let h = SymbolHistory {
            symbol: "HO=F".to_string(),
            dates: vec![d(2), d(3)],
            adj_close: None,
            close: Some(vec![Some(2.6)]),
        };
        let err = extract_close_frame(vec![h], &tickers(&["HO=F"])).unwrap_err();
        assert!(matches!(err, CrackError::Provider { .. }));
    }

    #[test]
    fn test_no_requested_symbol_is_fatal() {
        let h = SymbolHistory {
            symbol: "SPY".to_string(),
            dates: vec![d(2)],
            adj_close: None,
            close: Some(vec![Some(1.0)]),
        };
        let err = extract_close_frame(vec![h], &tickers(&["CL=F"])).unwrap_err();
        assert!(matches!(err, CrackError::NoTickersReturned));

        let err = extract_close_frame(Vec::new(), &tickers(&["CL=F"])).unwrap_err();
        assert!(matches!(err, CrackError::NoTickersReturned));
    }

    #[test]
    fn test_aligns_fills_and_drops() {
        let cl = SymbolHistory {
            symbol: "CL=F".to_string(),
            dates: vec![d(2), d(3), d(5)],
            adj_close: None,
            close: Some(vec![Some(80.0), None, Some(82.0)]),
        };
        let rb = SymbolHistory {
            symbol: "RB=F".to_string(),
            dates: vec![d(1), d(2), d(4)],
            adj_close: None,
            close: Some(vec![None, Some(2.4), Some(2.5)]),
        };
        let table = extract_close_frame(vec![rb, cl], &tickers(&["CL=F", "RB=F", "HO=F"])).unwrap();

        // Jan 1 is empty for every symbol and goes away
        assert_eq!(table.dates, vec![d(2), d(3), d(4), d(5)]);
        assert_eq!(table.symbols(), vec!["CL=F", "RB=F"]);
        assert_eq!(
            table.column("CL=F").unwrap(),
            &[Some(80.0), Some(80.0), Some(80.0), Some(82.0)]
        );
        assert_eq!(
            table.column("RB=F").unwrap(),
            &[Some(2.4), Some(2.4), Some(2.5), Some(2.5)]
        );
        assert!(!table.has("HO=F"));
    }

    #[test]
    fn test_aligned_reindexes() {
        let table = PriceTable::from_observations(vec![(
            "CRAK".to_string(),
            vec![(d(2), Some(10.0)), (d(4), Some(12.0))],
        )]);
        let out = table.aligned("CRAK", &[d(1), d(2), d(3), d(4)]).unwrap();
        assert_eq!(out, vec![None, Some(10.0), Some(10.0), Some(12.0)]);
        assert!(table.aligned("CL=F", &[d(1)]).is_none());
    }
}
