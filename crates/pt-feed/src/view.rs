//! Reconciler tasks.
//!
//! A view task owns one reconciler and is the only writer to it. After every
//! change it publishes a fresh copy through a `watch`, so readers only ever
//! observe whole, already-sorted views.

use pt_core::config::UnknownTickerPolicy;
use pt_core::types::{PriceUpdate, SymbolState};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::reconciler::{Reconcile, SymbolBoard, SymbolDetail};
use crate::use_case::PriceFeedUseCase;

/// Reader side of a running view task. Dropping it stops the task.
pub struct ViewHandle<T> {
    name: &'static str,
    view: watch::Receiver<T>,
    task: Option<JoinHandle<()>>,
}

impl<T: Clone> ViewHandle<T> {
    /// Latest published view.
    pub fn current(&self) -> T {
        self.view.borrow().clone()
    }

    /// Wait for the next published view. `None` once the task has ended.
    pub async fn changed(&mut self) -> Option<T> {
        self.view.changed().await.ok()?;
        Some(self.view.borrow_and_update().clone())
    }

    /// Extra reader for the same view.
    pub fn receiver(&self) -> watch::Receiver<T> {
        self.view.clone()
    }

    /// Stop consuming updates.
    pub fn detach(self) {
        debug!("[view:{}] detached", self.name);
    }
}

impl<T> Drop for ViewHandle<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Run `reconciler` against `updates` on its own task.
pub fn spawn_view<R: Reconcile>(
    name: &'static str,
    mut reconciler: R,
    mut updates: broadcast::Receiver<PriceUpdate>,
) -> ViewHandle<R::View> {
    let (view_tx, view_rx) = watch::channel(reconciler.view());
    let task = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => {
                    if reconciler.apply(&update).changed() {
                        view_tx.send_replace(reconciler.view());
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    // later updates overwrite the skipped ones
                    warn!("[view:{name}] lagged, {n} updates skipped");
                }
                Err(RecvError::Closed) => {
                    debug!("[view:{name}] update stream closed");
                    return;
                }
            }
        }
    });
    ViewHandle {
        name,
        view: view_rx,
        task: Some(task),
    }
}

/// List view seeded from `snapshot`.
pub fn spawn_board(
    feed: &PriceFeedUseCase,
    snapshot: Vec<SymbolState>,
    policy: UnknownTickerPolicy,
) -> ViewHandle<Vec<SymbolState>> {
    spawn_view(
        "board",
        SymbolBoard::from_snapshot(snapshot, policy),
        feed.price_updates(),
    )
}

/// Detail view for the symbol in `initial`.
pub fn spawn_detail(feed: &PriceFeedUseCase, initial: SymbolState) -> ViewHandle<SymbolState> {
    spawn_view("detail", SymbolDetail::new(initial), feed.price_updates())
}
