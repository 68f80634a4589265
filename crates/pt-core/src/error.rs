//! Typed error definitions for the price tracker feed.
//!
//! Three layers:
//!
//! - [`FeedError`]: the event taxonomy published on the repository's `errors`
//!   stream. Ephemeral values, never fatal.
//! - [`CodecError`]: why a single encode or decode failed. Logged, then mapped
//!   onto the matching [`FeedError`].
//! - [`PtError`]: setup failures (config, catalog, transport) that surface
//!   through `anyhow::Result` at the application seams.

use thiserror::Error;

/// Failure events delivered on the feed's `errors` stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum FeedError {
    /// An outbound price update could not be serialized; it was dropped.
    #[error("failed to encode price update")]
    EncodingFailed,

    /// An inbound message could not be parsed; it was dropped.
    #[error("failed to decode received message")]
    DecodingFailed,

    /// The transport failed to open, or closed while the session was live.
    #[error("connection lost")]
    ConnectionLost,
}

/// Encode/decode failure for a single wire message.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON has no representation for NaN or infinities.
    #[error("price for {ticker} is not finite: {price}")]
    NonFinitePrice { ticker: String, price: f64 },

    /// A price update must name a ticker.
    #[error("empty ticker")]
    EmptyTicker,

    /// Malformed JSON, missing fields, wrong types or invalid UTF-8.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Domain-specific setup errors.
#[derive(Debug, Error)]
pub enum PtError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// Catalog construction error (empty table, duplicate tickers).
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Transport connection, handshake, or communication error.
    #[error("transport error: {0}")]
    Transport(String),
}
