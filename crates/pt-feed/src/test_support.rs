//! Test doubles for the transport and repository seams.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use pt_core::error::FeedError;
use pt_core::transport::{Transport, TransportChannels, TransportFailure, WireMessage};
use pt_core::types::{PriceUpdate, SymbolState};
use tokio::sync::{broadcast, watch};

use crate::repository::PriceRepository;

/// Transport whose link state is driven by the test.
///
/// `connect` never opens on its own; call [`MockTransport::open`].
pub struct MockTransport {
    channels: TransportChannels,
    sent: Mutex<Vec<String>>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            channels: TransportChannels::new(64),
            sent: Mutex::new(Vec::new()),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn open(&self) {
        self.channels.set_open(true);
    }

    /// Close the link without a consumer-initiated disconnect.
    pub fn drop_link(&self) {
        self.channels.set_open(false);
    }

    pub fn deliver(&self, message: WireMessage) {
        self.channels.publish(message);
    }

    pub fn fail(&self, reason: &str) {
        self.channels.report_failure(reason);
    }

    /// Frames accepted while open, in send order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    fn connect(&self) {
        self.connects.fetch_add(1, Ordering::SeqCst);
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.channels.set_open(false);
    }

    fn send(&self, message: String) {
        if self.channels.is_open() {
            self.sent.lock().push(message);
        }
    }

    fn connection_status(&self) -> watch::Receiver<bool> {
        self.channels.status()
    }

    fn messages(&self) -> broadcast::Receiver<WireMessage> {
        self.channels.subscribe()
    }

    fn failures(&self) -> broadcast::Receiver<TransportFailure> {
        self.channels.subscribe_failures()
    }
}

/// Repository with a fixed snapshot and test-driven streams.
pub struct MockRepository {
    snapshot: Vec<SymbolState>,
    updates_tx: broadcast::Sender<PriceUpdate>,
    status_tx: watch::Sender<bool>,
    errors_tx: broadcast::Sender<FeedError>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

impl MockRepository {
    pub fn new(snapshot: Vec<SymbolState>) -> Self {
        let (updates_tx, _) = broadcast::channel(64);
        let (status_tx, _) = watch::channel(false);
        let (errors_tx, _) = broadcast::channel(16);
        Self {
            snapshot,
            updates_tx,
            status_tx,
            errors_tx,
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn push_update(&self, ticker: &str, price: f64) {
        let _ = self.updates_tx.send(PriceUpdate::new(ticker, price));
    }

    pub fn push_error(&self, error: FeedError) {
        let _ = self.errors_tx.send(error);
    }

    pub fn set_connected(&self, open: bool) {
        self.status_tx.send_replace(open);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl PriceRepository for MockRepository {
    fn price_updates(&self) -> broadcast::Receiver<PriceUpdate> {
        self.updates_tx.subscribe()
    }

    fn connection_status(&self) -> watch::Receiver<bool> {
        self.status_tx.subscribe()
    }

    fn errors(&self) -> broadcast::Receiver<FeedError> {
        self.errors_tx.subscribe()
    }

    fn fetch_snapshot(&self) -> Vec<SymbolState> {
        self.snapshot.clone()
    }

    fn connect(&self) {
        self.connects.fetch_add(1, Ordering::SeqCst);
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}
