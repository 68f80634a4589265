//! # pt-feed
//!
//! The feed distribution core.
//!
//! ## Architecture
//!
//! ```text
//! TickSource ──► FeedRepository ──encode──► Transport.send
//!                      ▲                         │ (round trip)
//!                      └────────decode──── Transport.messages
//!                      │
//!          price_updates / connection_status / errors   (broadcast, watch)
//!                      │
//!               PriceFeedUseCase  (one per process, shared by reference)
//!                      │
//!          ┌───────────┴───────────┐
//!     SymbolBoard view        SymbolDetail view     (one task each)
//! ```
//!
//! - [`repository`]: [`PriceRepository`] trait and the [`FeedRepository`]
//!   implementation: session lifecycle, emission loop, inbound decoding,
//!   failure classification
//! - [`use_case`]: [`PriceFeedUseCase`] lifecycle façade and [`SnapshotUseCase`]
//! - [`reconciler`]: ordered list ([`SymbolBoard`]) and single-ticker
//!   ([`SymbolDetail`]) views over the update stream
//! - [`view`]: runs a reconciler on its own task and publishes whole views

pub mod reconciler;
pub mod repository;
pub mod use_case;
pub mod view;

#[cfg(test)]
mod test_support;

pub use pt_core::config::UnknownTickerPolicy;
pub use reconciler::{Applied, Reconcile, SymbolBoard, SymbolDetail};
pub use repository::{FeedRepository, PriceRepository};
pub use use_case::{PriceFeedUseCase, SnapshotUseCase};
pub use view::{ViewHandle, spawn_board, spawn_detail, spawn_view};
