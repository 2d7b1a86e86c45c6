//! Price loading: provider download and the flat-file cache.

use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::info;

use crate::error::{CrackError, Result};
use crate::prices::{extract_close_frame, PriceTable};
use crate::report::ensure_parent;
use crate::yahoo::YahooClient;

/// Fetch daily closes for `tickers` since `start` as one batch.
pub async fn download_prices(
    client: &YahooClient,
    tickers: &[String],
    start: NaiveDate,
) -> Result<PriceTable> {
    let mut histories = Vec::with_capacity(tickers.len());
    for (idx, symbol) in tickers.iter().enumerate() {
        info!("[{}/{}] Downloading {} since {}", idx + 1, tickers.len(), symbol, start);
        if let Some(h) = client.get_daily_history(symbol, start).await? {
            info!("  {} bars for {}", h.dates.len(), symbol);
            histories.push(h);
        }
    }

    let table = extract_close_frame(histories, tickers)?;
    info!(
        "Price table: {} rows x {} symbols {:?}",
        table.len(),
        table.columns.len(),
        table.symbols()
    );
    Ok(table)
}

/// Write the price table as `Date,<sym>,...`; missing values are empty cells.
pub fn write_prices_csv<P: AsRef<Path>>(table: &PriceTable, path: P) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let mut file = File::create(path)?;

    write!(file, "Date")?;
    for col in &table.columns {
        write!(file, ",{}", col.symbol)?;
    }
    writeln!(file)?;

    for (i, date) in table.dates.iter().enumerate() {
        write!(file, "{}", date.format("%Y-%m-%d"))?;
        for col in &table.columns {
            match col.values[i] {
                Some(v) => write!(file, ",{}", v)?,
                None => write!(file, ",")?,
            }
        }
        writeln!(file)?;
    }
    Ok(())
}

/// Read a price table written by [`write_prices_csv`].
///
/// Forward-fill and empty-row dropping are applied again, like a fresh download.
pub fn read_prices_csv<P: AsRef<Path>>(path: P) -> Result<PriceTable> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines().enumerate();

    let header = match lines.next() {
        Some((_, line)) => line?,
        None => return Err(CrackError::NoTickersReturned),
    };
    let symbols: Vec<String> = header
        .trim()
        .split(',')
        .skip(1)
        .map(|s| s.trim().to_string())
        .collect();
    if symbols.is_empty() {
        return Err(CrackError::NoTickersReturned);
    }

    let mut series: Vec<(String, Vec<(NaiveDate, Option<f64>)>)> =
        symbols.iter().map(|s| (s.clone(), Vec::new())).collect();

    for (line_num, line) in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.trim().split(',').collect();
        let date = NaiveDate::parse_from_str(parts[0], "%Y-%m-%d").map_err(|e| {
            CrackError::Parse {
                line: line_num + 1,
                message: format!("invalid date '{}': {}", parts[0], e),
            }
        })?;

        for (k, (_, obs)) in series.iter_mut().enumerate() {
            let cell = parts.get(k + 1).map(|s| s.trim()).unwrap_or("");
            let value = if cell.is_empty() {
                None
            } else {
                Some(cell.parse::<f64>().map_err(|_| CrackError::Parse {
                    line: line_num + 1,
                    message: format!("invalid price '{}'", cell),
                })?)
            };
            obs.push((date, value));
        }
    }

    let mut table = PriceTable::from_observations(series);
    table.forward_fill();
    table.drop_empty_rows();
    Ok(table)
}
