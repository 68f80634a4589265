//! Per-consumer symbol state and its derived trend.

use std::fmt;

/// Direction of the last price change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    /// Classify `current` against `previous`.
    ///
    /// `Flat` when there is no previous price or the two are numerically equal.
    pub fn between(current: f64, previous: Option<f64>) -> Self {
        match previous {
            None => Trend::Flat,
            Some(prev) if current == prev => Trend::Flat,
            Some(prev) if current > prev => Trend::Up,
            Some(_) => Trend::Down,
        }
    }

    /// Single-character arrow used in log output.
    pub fn arrow(self) -> &'static str {
        match self {
            Trend::Up => "↑",
            Trend::Down => "↓",
            Trend::Flat => "·",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Flat => "flat",
        };
        f.write_str(s)
    }
}

/// View entity for one ticker.
///
/// Never mutated in place: [`SymbolState::advance`] builds the successor so
/// that `previous_price` always equals the prior `current_price`.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolState {
    pub ticker: String,
    pub description: String,
    pub current_price: f64,
    pub previous_price: Option<f64>,
}

impl SymbolState {
    pub fn new(
        ticker: impl Into<String>,
        description: impl Into<String>,
        current_price: f64,
        previous_price: Option<f64>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            description: description.into(),
            current_price,
            previous_price,
        }
    }

    /// Derived, never stored.
    #[inline]
    pub fn trend(&self) -> Trend {
        Trend::between(self.current_price, self.previous_price)
    }

    /// The state after a new price arrives: old current becomes previous,
    /// description is carried over.
    pub fn advance(&self, price: f64) -> Self {
        Self {
            ticker: self.ticker.clone(),
            description: self.description.clone(),
            current_price: price,
            previous_price: Some(self.current_price),
        }
    }
}

/// Order states by current price, highest first.
///
/// Uses IEEE total ordering so a stray NaN cannot break the sort; ties keep no
/// particular order.
pub fn sort_by_price_desc(states: &mut [SymbolState]) {
    states.sort_unstable_by(|a, b| b.current_price.total_cmp(&a.current_price));
}

/// True if `states` is ordered by current price, highest first.
pub fn is_sorted_by_price_desc(states: &[SymbolState]) -> bool {
    states
        .windows(2)
        .all(|w| w[0].current_price.total_cmp(&w[1].current_price).is_ge())
}
