//! Feed repository: the single authoritative source of price updates,
//! connection status and feed errors for the whole process.
//!
//! # Sessions
//!
//! Every `connect()` starts a fresh *session*: a liveness flag plus two tasks.
//!
//! ```text
//! session task   wait for open ──┬─► staggered first burst
//!                      │          └─► burst every period from open
//!                      │
//!                      └── failure / open→closed ──► ConnectionLost, session dead
//!
//! inbound task   transport frame ──► decode ──► price_updates | DecodingFailed
//! ```
//!
//! `disconnect()` (and the teardown at the start of `connect()`) clears the
//! liveness flag *before* closing the transport and aborts both tasks. Both
//! tasks check the flag before publishing anything, so a frame or status
//! change that races the teardown is dropped instead of resurrecting the
//! cancelled session, and a consumer-initiated close is never reported as
//! `ConnectionLost`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use pt_core::catalog::Catalog;
use pt_core::codec;
use pt_core::config::FeedSettings;
use pt_core::error::FeedError;
use pt_core::tick::TickSource;
use pt_core::transport::{Transport, TransportFailure, WireMessage};
use pt_core::types::{PriceUpdate, SymbolState, sort_by_price_desc};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Shortest accepted emission period.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Source of price-update, connection-status and error events.
///
/// Implemented by [`FeedRepository`]; the trait exists so use cases and views
/// can run against a test double.
pub trait PriceRepository: Send + Sync {
    /// Decoded updates from the point of subscription onward.
    fn price_updates(&self) -> broadcast::Receiver<PriceUpdate>;

    /// Connection state; yields the latest value immediately on subscription.
    fn connection_status(&self) -> watch::Receiver<bool>;

    /// Failure events from the point of subscription onward.
    fn errors(&self) -> broadcast::Receiver<FeedError>;

    /// One state per catalog entry with fresh prices, sorted by price
    /// descending. Needs no connection.
    fn fetch_snapshot(&self) -> Vec<SymbolState>;

    /// Tear down any live session and start a new one.
    fn connect(&self);

    /// Stop emission and close the transport. Idempotent.
    fn disconnect(&self);
}

struct Session {
    id: u64,
    live: Arc<AtomicBool>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl Session {
    fn cancel(self) {
        self.live.store(false, Ordering::SeqCst);
        for task in self.tasks {
            task.abort();
        }
    }
}

/// Encode-then-transmit path shared by the session task and
/// [`FeedRepository::send_update`].
#[derive(Clone)]
struct Outbound {
    transport: Arc<dyn Transport>,
    errors_tx: broadcast::Sender<FeedError>,
}

impl Outbound {
    fn send(&self, update: &PriceUpdate) {
        match codec::encode(update) {
            Ok(frame) => self.transport.send(frame),
            Err(e) => {
                warn!("[feed] dropping outbound update: {e}");
                report(&self.errors_tx, FeedError::EncodingFailed);
            }
        }
    }
}

fn report(errors_tx: &broadcast::Sender<FeedError>, error: FeedError) {
    if errors_tx.send(error).is_err() {
        debug!("[feed] {error} not observed: no error subscribers");
    }
}

/// Production [`PriceRepository`] over any [`Transport`].
///
/// At most one session (one transport connection, one emission loop) exists
/// at a time. Must be driven from inside a tokio runtime.
pub struct FeedRepository {
    transport: Arc<dyn Transport>,
    catalog: Arc<Catalog>,
    ticks: TickSource,
    settings: FeedSettings,
    updates_tx: broadcast::Sender<PriceUpdate>,
    errors_tx: broadcast::Sender<FeedError>,
    session: Mutex<Option<Session>>,
    next_session_id: AtomicU64,
}

impl FeedRepository {
    pub fn new(
        transport: Arc<dyn Transport>,
        catalog: Arc<Catalog>,
        ticks: TickSource,
        settings: FeedSettings,
    ) -> Self {
        let mut settings = settings;
        if settings.period < MIN_PERIOD {
            warn!(
                "[feed] period {:?} below minimum, using {:?}",
                settings.period, MIN_PERIOD
            );
            settings.period = MIN_PERIOD;
        }
        let capacity = settings.channel_capacity.max(1);
        let (updates_tx, _) = broadcast::channel(capacity);
        let (errors_tx, _) = broadcast::channel(capacity);
        Self {
            transport,
            catalog,
            ticks,
            settings,
            updates_tx,
            errors_tx,
            session: Mutex::new(None),
            next_session_id: AtomicU64::new(1),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &FeedSettings {
        &self.settings
    }

    /// True while a session exists and has not been lost or cancelled.
    pub fn is_streaming(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(|s| s.live.load(Ordering::SeqCst))
    }

    /// Push one update through the outbound path (encode, then transmit).
    ///
    /// An update that cannot be encoded is dropped and reported as
    /// [`FeedError::EncodingFailed`].
    pub fn send_update(&self, update: &PriceUpdate) {
        self.outbound().send(update);
    }

    fn outbound(&self) -> Outbound {
        Outbound {
            transport: self.transport.clone(),
            errors_tx: self.errors_tx.clone(),
        }
    }
}

impl PriceRepository for FeedRepository {
    fn price_updates(&self) -> broadcast::Receiver<PriceUpdate> {
        self.updates_tx.subscribe()
    }

    fn connection_status(&self) -> watch::Receiver<bool> {
        self.transport.connection_status()
    }

    fn errors(&self) -> broadcast::Receiver<FeedError> {
        self.errors_tx.subscribe()
    }

    fn fetch_snapshot(&self) -> Vec<SymbolState> {
        let mut states: Vec<SymbolState> = self
            .catalog
            .symbols()
            .iter()
            .map(|sym| {
                // random previous price so the trend is visible immediately
                SymbolState::new(
                    sym.ticker.clone(),
                    sym.description.clone(),
                    self.ticks.next_price(),
                    Some(self.ticks.next_price()),
                )
            })
            .collect();
        sort_by_price_desc(&mut states);
        states
    }

    fn connect(&self) {
        let mut guard = self.session.lock();
        if let Some(old) = guard.take() {
            info!("[feed] replacing session {}", old.id);
            old.cancel();
            self.transport.disconnect();
        }

        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let live = Arc::new(AtomicBool::new(true));

        // subscribe before connecting so an immediate failure is not missed
        let status_rx = self.transport.connection_status();
        let failures_rx = self.transport.failures();
        let inbound_rx = self.transport.messages();

        info!(
            "[feed] session {id}: connecting via {} ({} symbols)",
            self.transport.name(),
            self.catalog.len()
        );
        self.transport.connect();

        let session_task = tokio::spawn(run_session(
            SessionCtx {
                id,
                live: live.clone(),
                outbound: self.outbound(),
                catalog: self.catalog.clone(),
                ticks: self.ticks,
                settings: self.settings.clone(),
            },
            status_rx,
            failures_rx,
        ));

        let inbound_task = tokio::spawn(run_inbound(
            id,
            live.clone(),
            inbound_rx,
            self.updates_tx.clone(),
            self.errors_tx.clone(),
        ));

        *guard = Some(Session {
            id,
            live,
            tasks: vec![session_task, inbound_task],
        });
    }

    fn disconnect(&self) {
        let Some(session) = self.session.lock().take() else {
            debug!("[feed] disconnect: no session");
            return;
        };
        let id = session.id;
        session.cancel();
        self.transport.disconnect();
        info!("[feed] session {id}: disconnected");
    }
}

impl Drop for FeedRepository {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.cancel();
            self.transport.disconnect();
        }
    }
}

// ---------------------------------------------------------------------------
// Session tasks
// ---------------------------------------------------------------------------

struct SessionCtx {
    id: u64,
    live: Arc<AtomicBool>,
    outbound: Outbound,
    catalog: Arc<Catalog>,
    ticks: TickSource,
    settings: FeedSettings,
}

impl SessionCtx {
    /// Generate and send one update per catalog symbol.
    fn burst(&self) {
        for sym in self.catalog.symbols() {
            self.emit(&sym.ticker);
        }
    }

    fn emit(&self, ticker: &str) {
        if !self.live.load(Ordering::SeqCst) {
            return;
        }
        self.outbound.send(&self.ticks.next_update(ticker));
    }

    /// Mark the session dead; report `ConnectionLost` only if it was still
    /// live, i.e. nobody cancelled it on purpose.
    fn lose(&self, why: &str) {
        if self.live.swap(false, Ordering::SeqCst) {
            warn!("[feed] session {}: connection lost ({why})", self.id);
            report(&self.outbound.errors_tx, FeedError::ConnectionLost);
        }
    }
}

async fn wait_open(status_rx: &mut watch::Receiver<bool>) -> bool {
    status_rx.wait_for(|open| *open).await.is_ok()
}

/// Resolves once the status reads closed (or the transport is gone).
async fn wait_closed(status_rx: &mut watch::Receiver<bool>) {
    let _ = status_rx.wait_for(|open| !*open).await;
}

async fn wait_failure(failures_rx: &mut broadcast::Receiver<TransportFailure>) -> Option<String> {
    loop {
        match failures_rx.recv().await {
            Ok(failure) => return Some(failure.reason),
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return None,
        }
    }
}

/// Wait for open, then run the emission loop until the link closes.
async fn run_session(
    ctx: SessionCtx,
    mut status_rx: watch::Receiver<bool>,
    mut failures_rx: broadcast::Receiver<TransportFailure>,
) {
    tokio::select! {
        opened = wait_open(&mut status_rx) => {
            if !opened {
                ctx.lose("transport dropped");
                return;
            }
        }
        Some(reason) = wait_failure(&mut failures_rx) => {
            ctx.lose(&reason);
            return;
        }
    }

    let opened_at = Instant::now();
    info!("[feed] session {}: open, starting emission", ctx.id);

    // the period is anchored at open; the staggered first burst runs alongside it
    let period = ctx.settings.period;
    let mut ticker = tokio::time::interval_at(opened_at + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let symbols = ctx.catalog.symbols();
    let mut staggered = 0usize;
    let mut stagger_due = Some(opened_at);

    loop {
        let due = stagger_due.unwrap_or(opened_at);
        tokio::select! {
            _ = tokio::time::sleep_until(due), if stagger_due.is_some() => {
                if let Some(sym) = symbols.get(staggered) {
                    ctx.emit(&sym.ticker);
                }
                staggered += 1;
                stagger_due = (staggered < symbols.len()).then_some(due + ctx.settings.stagger);
            }
            _ = ticker.tick() => {
                debug!("[feed] session {}: periodic burst", ctx.id);
                ctx.burst();
            }
            _ = wait_closed(&mut status_rx) => {
                ctx.lose("transport closed");
                return;
            }
        }
    }
}

/// Decode every inbound frame and fan it out.
async fn run_inbound(
    id: u64,
    live: Arc<AtomicBool>,
    mut inbound_rx: broadcast::Receiver<WireMessage>,
    updates_tx: broadcast::Sender<PriceUpdate>,
    errors_tx: broadcast::Sender<FeedError>,
) {
    loop {
        let frame = match inbound_rx.recv().await {
            Ok(frame) => frame,
            Err(RecvError::Lagged(n)) => {
                warn!("[feed] session {id}: inbound lagged, {n} frames skipped");
                continue;
            }
            Err(RecvError::Closed) => return,
        };

        if !live.load(Ordering::SeqCst) {
            debug!("[feed] session {id}: dropping frame for ended session");
            return;
        }

        match codec::decode(frame.as_bytes()) {
            Ok(update) => {
                if updates_tx.send(update).is_err() {
                    debug!("[feed] update not observed: no subscribers");
                }
            }
            Err(e) => {
                warn!("[feed] dropping undecodable frame ({} bytes): {e}", frame.len());
                report(&errors_tx, FeedError::DecodingFailed);
            }
        }
    }
}
