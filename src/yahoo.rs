//! Yahoo Finance chart API client.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{CrackError, Result};
use crate::prices::SymbolHistory;

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    pub result: Option<Vec<ChartData>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartData {
    #[serde(default)]
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChartMeta {
    pub symbol: Option<String>,
    /// Exchange offset from UTC in seconds
    #[serde(default)]
    pub gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteData>,
    pub adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteData {
    pub close: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
pub struct AdjClose {
    pub adjclose: Option<Vec<Option<f64>>>,
}

impl ChartData {
    /// Convert one chart result into provider-neutral history.
    ///
    /// Every timestamp must map to a date and every price array must have one
    /// value per timestamp, so dates and prices stay paired.
    pub fn into_history(self, symbol: &str) -> Result<SymbolHistory> {
        let offset = self.meta.gmtoffset;
        let dates = self
            .timestamp
            .iter()
            .map(|ts| {
                exchange_date(*ts, offset).ok_or_else(|| CrackError::Provider {
                    symbol: symbol.to_string(),
                    message: format!("invalid bar timestamp {}", ts),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let close = self.indicators.quote.into_iter().next().and_then(|q| q.close);
        let adj_close = self
            .indicators
            .adjclose
            .and_then(|a| a.into_iter().next())
            .and_then(|a| a.adjclose);

        for (field, values) in [("close", &close), ("adjclose", &adj_close)] {
            if let Some(values) = values {
                if values.len() != dates.len() {
                    return Err(CrackError::Provider {
                        symbol: symbol.to_string(),
                        message: format!(
                            "{} has {} values for {} timestamps",
                            field,
                            values.len(),
                            dates.len()
                        ),
                    });
                }
            }
        }

        Ok(SymbolHistory {
            symbol: symbol.to_string(),
            dates,
            adj_close,
            close,
        })
    }
}

/// Calendar date of a bar in the exchange's local time.
fn exchange_date(ts: i64, gmtoffset: i64) -> Option<NaiveDate> {
    let local = ts.checked_add(gmtoffset)?;
    DateTime::<Utc>::from_timestamp(local, 0).map(|dt| dt.date_naive())
}

pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url("https://query1.finance.yahoo.com/v8/finance/chart")
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) crack_spread/0.1")
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Daily history for one symbol from `start` to now.
    ///
    /// `Ok(None)` when the provider has no data for the symbol; transport
    /// failures are fatal.
    pub async fn get_daily_history(
        &self,
        symbol: &str,
        start: NaiveDate,
    ) -> Result<Option<SymbolHistory>> {
        let url = format!("{}/{}", self.base_url, symbol);
        let period1 = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);
        let period2 = Utc::now().timestamp();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "div,splits".to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            warn!("Yahoo has no chart for {}", symbol);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CrackError::Provider {
                symbol: symbol.to_string(),
                message: format!("HTTP status {}", status),
            });
        }

        let body: ChartResponse = response.json().await?;
        parse_chart(body, symbol)
    }
}

/// Interpret a decoded chart response.
pub fn parse_chart(body: ChartResponse, symbol: &str) -> Result<Option<SymbolHistory>> {
    if let Some(err) = body.chart.error {
        if err.code.eq_ignore_ascii_case("Not Found") {
            warn!("Yahoo has no chart for {}: {}", symbol, err.description);
            return Ok(None);
        }
        return Err(CrackError::Provider {
            symbol: symbol.to_string(),
            message: format!("[{}] {}", err.code, err.description),
        });
    }

    let Some(data) = body.chart.result.and_then(|r| r.into_iter().next()) else {
        warn!("Yahoo returned an empty chart for {}", symbol);
        return Ok(None);
    };
    if data.timestamp.is_empty() {
        warn!("Yahoo returned no bars for {}", symbol);
        return Ok(None);
    }

    if let Some(reported) = data.meta.symbol.as_deref() {
        if reported != symbol {
            debug!("Yahoo reports {} as {}", symbol, reported);
        }
    }
    data.into_history(symbol).map(Some)
}
