//! Folding price updates into per-consumer views.
//!
//! Each consumer owns its reconciler; nothing here is shared. Updates are
//! last-write-wins by arrival order.

use pt_core::catalog::UNKNOWN_DESCRIPTION;
use pt_core::config::UnknownTickerPolicy;
use pt_core::types::{PriceUpdate, SymbolState, sort_by_price_desc};

/// What [`Reconcile::apply`] did with an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// An existing entry was replaced.
    Updated,
    /// A new entry was added.
    Inserted,
    /// The view is unchanged.
    Ignored,
}

impl Applied {
    pub fn changed(self) -> bool {
        !matches!(self, Applied::Ignored)
    }
}

/// A view that can absorb price updates.
pub trait Reconcile: Send + 'static {
    /// Immutable copy handed to readers.
    type View: Clone + Send + Sync + 'static;

    fn apply(&mut self, update: &PriceUpdate) -> Applied;

    fn view(&self) -> Self::View;
}

/// Ordered list of every tracked symbol, highest price first.
#[derive(Debug, Clone)]
pub struct SymbolBoard {
    entries: Vec<SymbolState>,
    policy: UnknownTickerPolicy,
}

impl SymbolBoard {
    /// Start from a snapshot; sorts it in case the caller did not.
    pub fn from_snapshot(mut entries: Vec<SymbolState>, policy: UnknownTickerPolicy) -> Self {
        sort_by_price_desc(&mut entries);
        Self { entries, policy }
    }

    pub fn entries(&self) -> &[SymbolState] {
        &self.entries
    }

    pub fn get(&self, ticker: &str) -> Option<&SymbolState> {
        self.entries.iter().find(|s| s.ticker == ticker)
    }

    pub fn position(&self, ticker: &str) -> Option<usize> {
        self.entries.iter().position(|s| s.ticker == ticker)
    }

    pub fn policy(&self) -> UnknownTickerPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Reconcile for SymbolBoard {
    type View = Vec<SymbolState>;

    fn apply(&mut self, update: &PriceUpdate) -> Applied {
        let applied = match self.position(&update.ticker) {
            Some(idx) => {
                self.entries[idx] = self.entries[idx].advance(update.price);
                Applied::Updated
            }
            None => match self.policy {
                UnknownTickerPolicy::Insert => {
                    self.entries.push(SymbolState::new(
                        update.ticker.clone(),
                        UNKNOWN_DESCRIPTION,
                        update.price,
                        None,
                    ));
                    Applied::Inserted
                }
                UnknownTickerPolicy::Ignore => Applied::Ignored,
            },
        };
        if applied.changed() {
            sort_by_price_desc(&mut self.entries);
        }
        applied
    }

    fn view(&self) -> Self::View {
        self.entries.clone()
    }
}

/// A single symbol, fed only by updates for its own ticker.
#[derive(Debug, Clone)]
pub struct SymbolDetail {
    state: SymbolState,
}

impl SymbolDetail {
    pub fn new(state: SymbolState) -> Self {
        Self { state }
    }

    pub fn ticker(&self) -> &str {
        &self.state.ticker
    }

    pub fn state(&self) -> &SymbolState {
        &self.state
    }
}

impl Reconcile for SymbolDetail {
    type View = SymbolState;

    fn apply(&mut self, update: &PriceUpdate) -> Applied {
        if update.ticker != self.state.ticker {
            return Applied::Ignored;
        }
        self.state = self.state.advance(update.price);
        Applied::Updated
    }

    fn view(&self) -> Self::View {
        self.state.clone()
    }
}

#[cfg(test)]
mod tests {
    use pt_core::types::{Trend, is_sorted_by_price_desc};
    use rand::Rng;

    use super::*;

    fn scenario_a() -> SymbolBoard {
        SymbolBoard::from_snapshot(
            vec![
                SymbolState::new("AAPL", "Apple", 100.0, None),
                SymbolState::new("GOOG", "Alphabet", 300.0, None),
                SymbolState::new("TSLA", "Tesla", 200.0, None),
            ],
            UnknownTickerPolicy::Insert,
        )
    }

    fn order(board: &SymbolBoard) -> Vec<&str> {
        board.entries().iter().map(|s| s.ticker.as_str()).collect()
    }

    #[test]
    fn snapshot_is_ordered_by_price() {
        assert_eq!(order(&scenario_a()), ["GOOG", "TSLA", "AAPL"]);
    }

    #[test]
    fn update_shifts_previous_and_sets_trend() {
        let mut board = SymbolBoard::from_snapshot(
            vec![SymbolState::new("AAPL", "Apple", 150.0, None)],
            UnknownTickerPolicy::Insert,
        );
        assert_eq!(board.get("AAPL").unwrap().trend(), Trend::Flat);

        assert_eq!(board.apply(&PriceUpdate::new("AAPL", 200.0)), Applied::Updated);
        let aapl = board.get("AAPL").unwrap();
        assert_eq!(aapl.current_price, 200.0);
        assert_eq!(aapl.previous_price, Some(150.0));
        assert_eq!(aapl.description, "Apple");
        assert_eq!(aapl.trend(), Trend::Up);
    }

    #[test]
    fn rising_price_moves_to_top() {
        let mut board = scenario_a();
        board.apply(&PriceUpdate::new("TSLA", 500.0));
        assert_eq!(board.position("TSLA"), Some(0));
        assert_eq!(order(&board), ["TSLA", "GOOG", "AAPL"]);
    }

    #[test]
    fn unknown_ticker_inserted_by_default() {
        let mut board = scenario_a();
        assert_eq!(board.policy(), UnknownTickerPolicy::Insert);
        assert_eq!(board.apply(&PriceUpdate::new("NEW", 250.0)), Applied::Inserted);
        assert_eq!(board.len(), 4);
        assert_eq!(board.position("NEW"), Some(1));
        let entry = board.get("NEW").unwrap();
        assert_eq!(entry.previous_price, None);
        assert_eq!(entry.description, UNKNOWN_DESCRIPTION);
    }

    #[test]
    fn unknown_ticker_ignored_under_ignore_policy() {
        let mut board = SymbolBoard::from_snapshot(
            scenario_a().entries().to_vec(),
            UnknownTickerPolicy::Ignore,
        );
        assert_eq!(board.policy(), UnknownTickerPolicy::Ignore);
        assert_eq!(board.apply(&PriceUpdate::new("NEW", 250.0)), Applied::Ignored);
        assert_eq!(order(&board), ["GOOG", "TSLA", "AAPL"]);
    }

    #[test]
    fn stays_sorted_and_unique_under_random_updates() {
        let tickers = ["AAPL", "GOOG", "TSLA", "MSFT", "NVDA"];
        let mut board = scenario_a();
        let mut rng = rand::rng();
        for _ in 0..500 {
            let ticker = tickers[rng.random_range(0..tickers.len())];
            let price = rng.random_range(10.0..=500.0);
            board.apply(&PriceUpdate::new(ticker, price));
            assert!(is_sorted_by_price_desc(board.entries()));

            let mut seen: Vec<&str> = order(&board);
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), board.len());
        }
        assert_eq!(board.len(), tickers.len());
    }

    #[test]
    fn detail_tracks_only_its_ticker() {
        let mut detail = SymbolDetail::new(SymbolState::new("AAPL", "Apple", 150.0, None));
        assert_eq!(detail.apply(&PriceUpdate::new("GOOG", 999.0)), Applied::Ignored);
        assert_eq!(detail.state().current_price, 150.0);

        assert_eq!(detail.apply(&PriceUpdate::new("AAPL", 120.0)), Applied::Updated);
        assert_eq!(detail.state().previous_price, Some(150.0));
        assert_eq!(detail.view().trend(), Trend::Down);
    }
}
