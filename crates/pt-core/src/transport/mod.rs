//! Duplex transport contract and its implementations.
//!
//! The feed repository depends only on [`Transport`]: connect/disconnect/send,
//! a `watch` of the boolean connection status and a `broadcast` of inbound
//! frames. Two production implementations ship here:
//!
//! - [`LoopbackTransport`]: in-process round-trip simulator (echoes every sent
//!   frame back after a configurable latency).
//! - [`WsTransport`]: WebSocket client against an echo endpoint.

pub mod loopback;
pub mod ws;

use tokio::sync::{broadcast, watch};
use tracing::debug;

pub use loopback::{LoopbackConfig, LoopbackTransport};
pub use ws::{WsConfig, WsTransport};

/// Default capacity of the inbound frame broadcast.
pub const DEFAULT_INBOUND_CAPACITY: usize = 1024;

/// A raw inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl WireMessage {
    /// Payload bytes, regardless of frame kind.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            WireMessage::Text(t) => t.as_bytes(),
            WireMessage::Binary(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// Abstract duplex channel.
///
/// All methods are non-blocking. `connect` tears down any live connection
/// first and reports readiness asynchronously through
/// [`connection_status`](Transport::connection_status). `disconnect` closes
/// immediately and must not change the status when already closed.
pub trait Transport: Send + Sync {
    /// Short label for log lines.
    fn name(&self) -> &str;

    fn connect(&self);

    fn disconnect(&self);

    /// Queue a text frame. Dropped (with a debug log) when not connected.
    fn send(&self, message: String);

    /// Latest-value stream of the connection state; starts `false`.
    fn connection_status(&self) -> watch::Receiver<bool>;

    /// Inbound frames from the point of subscription onward.
    fn messages(&self) -> broadcast::Receiver<WireMessage>;

    /// Connection attempts that failed before the link ever opened.
    fn failures(&self) -> broadcast::Receiver<TransportFailure>;
}

/// A connection attempt that never reached the open state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub reason: String,
}

/// Status and inbound channels shared by every transport implementation.
#[derive(Debug, Clone)]
pub struct TransportChannels {
    status_tx: watch::Sender<bool>,
    inbound_tx: broadcast::Sender<WireMessage>,
    failure_tx: broadcast::Sender<TransportFailure>,
}

impl TransportChannels {
    pub fn new(inbound_capacity: usize) -> Self {
        let (status_tx, _) = watch::channel(false);
        let (inbound_tx, _) = broadcast::channel(inbound_capacity.max(1));
        let (failure_tx, _) = broadcast::channel(16);
        Self {
            status_tx,
            inbound_tx,
            failure_tx,
        }
    }

    /// Update the status, notifying subscribers only on an actual change.
    ///
    /// Returns `true` if the value changed.
    pub fn set_open(&self, open: bool) -> bool {
        self.status_tx.send_if_modified(|current| {
            if *current == open {
                false
            } else {
                *current = open;
                true
            }
        })
    }

    pub fn is_open(&self) -> bool {
        *self.status_tx.borrow()
    }

    /// Hand an inbound frame to every subscriber.
    pub fn publish(&self, message: WireMessage) {
        if self.inbound_tx.send(message).is_err() {
            debug!("inbound frame dropped: no subscribers");
        }
    }

    /// Announce a failed connection attempt.
    pub fn report_failure(&self, reason: impl Into<String>) {
        let failure = TransportFailure {
            reason: reason.into(),
        };
        if self.failure_tx.send(failure).is_err() {
            debug!("connect failure not observed: no subscribers");
        }
    }

    pub fn status(&self) -> watch::Receiver<bool> {
        self.status_tx.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WireMessage> {
        self.inbound_tx.subscribe()
    }

    pub fn subscribe_failures(&self) -> broadcast::Receiver<TransportFailure> {
        self.failure_tx.subscribe()
    }
}

impl Default for TransportChannels {
    fn default() -> Self {
        Self::new(DEFAULT_INBOUND_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_open_reports_changes_only() {
        let ch = TransportChannels::default();
        let rx = ch.status();
        assert!(!ch.set_open(false));
        assert!(!rx.has_changed().unwrap());
        assert!(ch.set_open(true));
        assert!(rx.has_changed().unwrap());
        assert!(ch.is_open());
    }

    #[test]
    fn failures_reach_subscribers() {
        let ch = TransportChannels::default();
        let mut rx = ch.subscribe_failures();
        ch.report_failure("refused");
        assert_eq!(rx.try_recv().unwrap().reason, "refused");
    }

    #[test]
    fn wire_message_bytes() {
        assert_eq!(WireMessage::Text("ab".into()).as_bytes(), b"ab");
        assert_eq!(WireMessage::Binary(vec![1, 2, 3]).len(), 3);
        assert!(WireMessage::Text(String::new()).is_empty());
    }
}
