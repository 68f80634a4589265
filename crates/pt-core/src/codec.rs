//! JSON wire codec for [`PriceUpdate`].
//!
//! Wire format is a two-field object:
//!
//! ```json
//! {"symbol":"AAPL","price":187.25}
//! ```
//!
//! Decoding works on raw bytes so that non-UTF-8 binary frames fail cleanly
//! instead of panicking. Unknown extra fields are ignored.

use crate::error::CodecError;
use crate::types::PriceUpdate;

/// Serialize an update to its text payload.
///
/// Rejects non-finite prices (serde_json would otherwise silently write `null`,
/// which no decoder would accept back).
pub fn encode(update: &PriceUpdate) -> Result<String, CodecError> {
    if update.ticker.is_empty() {
        return Err(CodecError::EmptyTicker);
    }
    if !update.price.is_finite() {
        return Err(CodecError::NonFinitePrice {
            ticker: update.ticker.clone(),
            price: update.price,
        });
    }
    Ok(serde_json::to_string(update)?)
}

/// Parse a raw payload into an update.
pub fn decode(payload: &[u8]) -> Result<PriceUpdate, CodecError> {
    let update: PriceUpdate = serde_json::from_slice(payload)?;
    if update.ticker.is_empty() {
        return Err(CodecError::EmptyTicker);
    }
    Ok(update)
}
