//! Fatal data-availability errors.
//!
//! Anything that can be degraded (short history, an empty panel at a reporting
//! step) is modelled with `Option` or a skipped artifact instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrackError {
    #[error("Yahoo response for {symbol} missing Adj Close/Close")]
    MissingPriceField { symbol: String },

    #[error("No tickers returned from Yahoo")]
    NoTickersReturned,

    #[error("Missing {0:?}")]
    MissingLegs(Vec<String>),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider error for {symbol}: {message}")]
    Provider { symbol: String, message: String },

    #[error("Error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CrackError>;
