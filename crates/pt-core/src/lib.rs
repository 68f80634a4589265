//! # pt-core
//!
//! Core crate for the price tracker feed, providing:
//!
//! - **Types** (`types`): symbols, price updates, symbol states and trends
//! - **Catalog** (`catalog`): the fixed ticker → description table
//! - **Tick source** (`tick`): bounded synthetic price generation
//! - **Codec** (`codec`): JSON wire encoding of price updates
//! - **Transport** (`transport`): duplex channel contract, loopback simulator and WS client
//! - **Configuration** (`config`): JSON config deserialization
//! - **Error types** (`error`): `FeedError`, `CodecError` and `PtError` via thiserror
//! - **Logging** (`logging`): tracing-based structured logging

pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod tick;
pub mod transport;
pub mod types;

// Re-export types at crate root for convenience.
pub use types::*;
