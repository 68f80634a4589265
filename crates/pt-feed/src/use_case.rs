//! Process-level handles over the repository.
//!
//! Build exactly one [`PriceFeedUseCase`] per process and share it (`Arc`)
//! with every consumer, so all views observe the same connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pt_core::error::FeedError;
use pt_core::types::{PriceUpdate, SymbolState, sort_by_price_desc};
use tokio::sync::{broadcast, watch};
use tracing::info;

use crate::repository::PriceRepository;

/// Shared lifecycle handle for the feed.
pub struct PriceFeedUseCase {
    repository: Arc<dyn PriceRepository>,
    running: AtomicBool,
}

impl PriceFeedUseCase {
    pub fn new(repository: Arc<dyn PriceRepository>) -> Self {
        Self {
            repository,
            running: AtomicBool::new(false),
        }
    }

    /// Connect the repository. Calling it again restarts the session.
    pub fn start(&self) {
        info!("[feed] start");
        self.running.store(true, Ordering::SeqCst);
        self.repository.connect();
    }

    pub fn stop(&self) {
        info!("[feed] stop");
        self.running.store(false, Ordering::SeqCst);
        self.repository.disconnect();
    }

    /// True between `start()` and the next `stop()`.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn price_updates(&self) -> broadcast::Receiver<PriceUpdate> {
        self.repository.price_updates()
    }

    pub fn connection_status(&self) -> watch::Receiver<bool> {
        self.repository.connection_status()
    }

    pub fn errors(&self) -> broadcast::Receiver<FeedError> {
        self.repository.errors()
    }
}

/// One-shot initial collection for a list view.
pub struct SnapshotUseCase {
    repository: Arc<dyn PriceRepository>,
}

impl SnapshotUseCase {
    pub fn new(repository: Arc<dyn PriceRepository>) -> Self {
        Self { repository }
    }

    /// Current snapshot, sorted by price descending.
    pub fn execute(&self) -> Vec<SymbolState> {
        let mut states = self.repository.fetch_snapshot();
        sort_by_price_desc(&mut states);
        states
    }
}
