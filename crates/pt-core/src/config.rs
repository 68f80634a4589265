//! Configuration parsing for the price tracker feed.
//!
//! Everything is read from a single JSON file. Every field is optional; the
//! accessors on [`AppConfig`] supply the defaults, so `{}` is a valid config.
//!
//! # Example config
//!
//! ```json
//! {
//!   "app": { "module_name": "pt-runner", "log_path": "/tmp/log" },
//!   "transport": { "kind": "loopback", "connect_delay_ms": 50, "round_trip_ms": 20 },
//!   "feed": { "period_ms": 2000, "stagger_ms": 100 },
//!   "prices": { "min": 10.0, "max": 500.0 },
//!   "catalog": [{ "ticker": "AAPL", "description": "Apple Inc." }],
//!   "reconciler": { "unknown_ticker": "insert" }
//! }
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::catalog::Catalog;
use crate::error::PtError;
use crate::tick::{DEFAULT_MAX_PRICE, DEFAULT_MIN_PRICE, TickSource};
use crate::transport::ws::DEFAULT_ECHO_URL;
use crate::transport::{DEFAULT_INBOUND_CAPACITY, LoopbackConfig, WsConfig};
use crate::types::Symbol;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    pub app: Option<ModuleMeta>,
    pub transport: Option<TransportSection>,
    pub feed: Option<FeedSection>,
    pub prices: Option<PriceSection>,
    /// Replaces the built-in catalog when present.
    pub catalog: Option<Vec<Symbol>>,
    pub reconciler: Option<ReconcilerSection>,
}

/// Module metadata block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
}

/// Which [`Transport`](crate::transport::Transport) implementation to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Loopback,
    Websocket,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransportSection {
    pub kind: Option<TransportKind>,
    /// WebSocket URL (websocket kind only).
    pub url: Option<String>,
    /// Loopback handshake delay in milliseconds.
    pub connect_delay_ms: Option<u64>,
    /// Loopback echo latency in milliseconds.
    pub round_trip_ms: Option<u64>,
    pub inbound_capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedSection {
    /// Interval between full emission bursts (default: 2000).
    pub period_ms: Option<u64>,
    /// Spacing between symbols in the first burst after connect (default: 100).
    pub stagger_ms: Option<u64>,
    /// Buffer of the price-update and error broadcasts (default: 1024).
    pub channel_capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceSection {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// What a list reconciler does with an update for a ticker it does not hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownTickerPolicy {
    /// Add a new entry with no previous price.
    #[default]
    Insert,
    /// Drop the update.
    Ignore,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReconcilerSection {
    pub unknown_ticker: Option<UnknownTickerPolicy>,
}

/// Emission loop timing and channel sizing, resolved from [`FeedSection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSettings {
    pub period: Duration,
    pub stagger: Duration,
    pub channel_capacity: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(2000),
            stagger: Duration::from_millis(100),
            channel_capacity: DEFAULT_INBOUND_CAPACITY,
        }
    }
}

impl AppConfig {
    pub fn module_name(&self) -> String {
        self.app
            .as_ref()
            .and_then(|m| m.module_name.clone())
            .unwrap_or_else(|| "pt-runner".to_string())
    }

    pub fn log_path(&self) -> Option<String> {
        self.app.as_ref().and_then(|m| m.log_path.clone())
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.as_ref().and_then(|t| t.kind).unwrap_or_default()
    }

    fn inbound_capacity(&self) -> usize {
        self.transport
            .as_ref()
            .and_then(|t| t.inbound_capacity)
            .unwrap_or(DEFAULT_INBOUND_CAPACITY)
    }

    pub fn loopback_config(&self) -> LoopbackConfig {
        let defaults = LoopbackConfig::default();
        let section = self.transport.clone().unwrap_or_default();
        LoopbackConfig {
            connect_delay: section
                .connect_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.connect_delay),
            round_trip: section
                .round_trip_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.round_trip),
            inbound_capacity: self.inbound_capacity(),
            refuse_connections: false,
        }
    }

    pub fn ws_config(&self) -> WsConfig {
        WsConfig {
            url: self
                .transport
                .as_ref()
                .and_then(|t| t.url.clone())
                .unwrap_or_else(|| DEFAULT_ECHO_URL.to_string()),
            inbound_capacity: self.inbound_capacity(),
            ..WsConfig::default()
        }
    }

    pub fn feed_settings(&self) -> FeedSettings {
        let defaults = FeedSettings::default();
        let Some(feed) = &self.feed else {
            return defaults;
        };
        FeedSettings {
            period: feed.period_ms.map(Duration::from_millis).unwrap_or(defaults.period),
            stagger: feed.stagger_ms.map(Duration::from_millis).unwrap_or(defaults.stagger),
            channel_capacity: feed.channel_capacity.unwrap_or(defaults.channel_capacity),
        }
    }

    /// Validated price generator for the configured bounds.
    pub fn tick_source(&self) -> Result<TickSource, PtError> {
        let min = self.prices.as_ref().and_then(|p| p.min).unwrap_or(DEFAULT_MIN_PRICE);
        let max = self.prices.as_ref().and_then(|p| p.max).unwrap_or(DEFAULT_MAX_PRICE);
        TickSource::new(min, max)
    }

    /// The configured catalog, or the built-in one.
    pub fn catalog(&self) -> Result<Catalog, PtError> {
        match &self.catalog {
            Some(symbols) => Catalog::new(symbols.clone()),
            None => Ok(Catalog::builtin()),
        }
    }

    pub fn unknown_ticker_policy(&self) -> UnknownTickerPolicy {
        self.reconciler
            .as_ref()
            .and_then(|r| r.unknown_ticker)
            .unwrap_or_default()
    }

    /// Check every derived value once, so misconfiguration fails at startup.
    pub fn validate(&self) -> Result<(), PtError> {
        self.tick_source()?;
        self.catalog()?;
        let feed = self.feed_settings();
        if feed.period.is_zero() {
            return Err(PtError::Config("feed.period_ms must be > 0".into()));
        }
        if feed.channel_capacity == 0 {
            return Err(PtError::Config("feed.channel_capacity must be > 0".into()));
        }
        Ok(())
    }
}

/// Load, parse, and validate a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok(config)
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> anyhow::Result<AppConfig> {
    let config: AppConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let cfg = parse_config("{}").unwrap();
        assert_eq!(cfg.transport_kind(), TransportKind::Loopback);
        assert_eq!(cfg.feed_settings(), FeedSettings::default());
        assert_eq!(cfg.feed_settings().period, Duration::from_secs(2));
        assert_eq!(cfg.unknown_ticker_policy(), UnknownTickerPolicy::Insert);
        assert_eq!(cfg.catalog().unwrap().len(), 25);
        assert_eq!(cfg.ws_config().url, DEFAULT_ECHO_URL);
        assert_eq!(cfg.module_name(), "pt-runner");
        assert!(cfg.log_path().is_none());
    }

    #[test]
    fn parses_full_config() {
        let cfg = parse_config(
            r#"{
                "app": { "module_name": "tracker", "log_path": "/tmp/pt" },
                "transport": { "kind": "websocket", "url": "ws://localhost:9000/echo" },
                "feed": { "period_ms": 500, "stagger_ms": 5, "channel_capacity": 64 },
                "prices": { "min": 1.0, "max": 2.0 },
                "catalog": [
                    { "ticker": "AAA", "description": "first" },
                    { "ticker": "BBB", "description": "second" }
                ],
                "reconciler": { "unknown_ticker": "ignore" }
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.module_name(), "tracker");
        assert_eq!(cfg.transport_kind(), TransportKind::Websocket);
        assert_eq!(cfg.ws_config().url, "ws://localhost:9000/echo");
        let feed = cfg.feed_settings();
        assert_eq!(feed.period, Duration::from_millis(500));
        assert_eq!(feed.stagger, Duration::from_millis(5));
        assert_eq!(feed.channel_capacity, 64);
        let ticks = cfg.tick_source().unwrap();
        assert_eq!((ticks.min(), ticks.max()), (1.0, 2.0));
        assert_eq!(cfg.catalog().unwrap().description("BBB"), "second");
        assert_eq!(cfg.unknown_ticker_policy(), UnknownTickerPolicy::Ignore);
    }

    #[test]
    fn loopback_timing_overrides() {
        let cfg = parse_config(r#"{ "transport": { "connect_delay_ms": 1, "round_trip_ms": 2 } }"#)
            .unwrap();
        let lb = cfg.loopback_config();
        assert_eq!(lb.connect_delay, Duration::from_millis(1));
        assert_eq!(lb.round_trip, Duration::from_millis(2));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(parse_config(r#"{ "prices": { "min": 50.0, "max": 5.0 } }"#).is_err());
        assert!(parse_config(r#"{ "feed": { "period_ms": 0 } }"#).is_err());
        assert!(parse_config(r#"{ "catalog": [] }"#).is_err());
        assert!(parse_config(r#"{ "transport": { "kind": "carrier-pigeon" } }"#).is_err());
    }
}
