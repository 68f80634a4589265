//! Core data types flowing through the feed.
//!
//! [`Symbol`] is the immutable catalog entry, [`PriceUpdate`] the transient
//! wire event and [`SymbolState`] the per-consumer view entity that is replaced
//! wholesale on every matching update.

pub mod price;
pub mod state;
pub mod symbol;

pub use price::*;
pub use state::*;
pub use symbol::*;
