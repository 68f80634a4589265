//! The price update event.

use serde::{Deserialize, Serialize};

/// A single price tick for one ticker.
///
/// Carries no identity beyond its fields: two updates for the same ticker are
/// independent events. Serializes to `{"symbol": "AAPL", "price": 187.3}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    #[serde(rename = "symbol")]
    pub ticker: String,
    pub price: f64,
}

impl PriceUpdate {
    pub fn new(ticker: impl Into<String>, price: f64) -> Self {
        Self {
            ticker: ticker.into(),
            price,
        }
    }
}
