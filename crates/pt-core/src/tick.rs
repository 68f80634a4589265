//! Synthetic price generation.
//!
//! Prices are drawn uniformly from a closed `[min, max]` range. The same source
//! seeds both the outbound emission loop and the initial snapshot.

use rand::Rng;

use crate::error::PtError;
use crate::types::PriceUpdate;

/// Lower bound of the default price range.
pub const DEFAULT_MIN_PRICE: f64 = 10.0;
/// Upper bound of the default price range.
pub const DEFAULT_MAX_PRICE: f64 = 500.0;

/// Bounded uniform price generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickSource {
    min: f64,
    max: f64,
}

impl TickSource {
    /// Create a source for `[min, max]`.
    ///
    /// Both bounds must be finite, positive, and `min < max`.
    pub fn new(min: f64, max: f64) -> Result<Self, PtError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(PtError::Config(format!("price bounds must be finite ({min}, {max})")));
        }
        if min <= 0.0 || min >= max {
            return Err(PtError::Config(format!("invalid price range [{min}, {max}]")));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// A fresh price in `[min, max]`.
    pub fn next_price(&self) -> f64 {
        rand::rng().random_range(self.min..=self.max)
    }

    /// A fresh update for `ticker`.
    pub fn next_update(&self, ticker: &str) -> PriceUpdate {
        PriceUpdate::new(ticker, self.next_price())
    }
}

impl Default for TickSource {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_PRICE,
            max: DEFAULT_MAX_PRICE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_stay_in_range() {
        let src = TickSource::default();
        for _ in 0..10_000 {
            let p = src.next_price();
            assert!((DEFAULT_MIN_PRICE..=DEFAULT_MAX_PRICE).contains(&p), "out of range: {p}");
        }
    }

    #[test]
    fn update_carries_ticker() {
        let u = TickSource::default().next_update("NVDA");
        assert_eq!(u.ticker, "NVDA");
    }

    #[test]
    fn rejects_bad_bounds() {
        assert!(TickSource::new(500.0, 10.0).is_err());
        assert!(TickSource::new(10.0, 10.0).is_err());
        assert!(TickSource::new(0.0, 10.0).is_err());
        assert!(TickSource::new(f64::NAN, 10.0).is_err());
        assert!(TickSource::new(1.0, f64::INFINITY).is_err());
        assert!(TickSource::new(1.0, 2.0).is_ok());
    }
}
