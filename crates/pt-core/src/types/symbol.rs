//! Catalog entries.

use serde::Deserialize;

/// Immutable catalog entry: ticker identifier plus human-readable description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Symbol {
    pub ticker: String,
    pub description: String,
}

impl Symbol {
    pub fn new(ticker: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            description: description.into(),
        }
    }
}
