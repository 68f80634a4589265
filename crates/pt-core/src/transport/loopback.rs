//! In-process round-trip transport.
//!
//! Simulates an echo socket: after `connect_delay` the link reports open, and
//! every frame passed to `send` comes back on the inbound stream after
//! `round_trip`. Frames are echoed in FIFO order by a single task per session.
//!
//! [`LoopbackTransport::sever`] drops the link without a consumer-initiated
//! disconnect, and [`LoopbackTransport::inject`] pushes an arbitrary inbound
//! frame; together they let callers exercise connection-loss and
//! malformed-payload handling end to end.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{Transport, TransportChannels, TransportFailure, WireMessage};

/// Timing knobs for [`LoopbackTransport`].
#[derive(Debug, Clone)]
pub struct LoopbackConfig {
    /// Delay between `connect()` and the status flipping to open.
    pub connect_delay: Duration,
    /// Delay between `send()` and the echo arriving inbound.
    pub round_trip: Duration,
    /// Capacity of the inbound broadcast.
    pub inbound_capacity: usize,
    /// Simulate an unreachable endpoint: every connect attempt fails.
    pub refuse_connections: bool,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            connect_delay: Duration::from_millis(50),
            round_trip: Duration::from_millis(20),
            inbound_capacity: super::DEFAULT_INBOUND_CAPACITY,
            refuse_connections: false,
        }
    }
}

struct Session {
    alive: Arc<AtomicBool>,
    echo_tx: mpsc::UnboundedSender<(Instant, String)>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl Session {
    fn close(self) {
        self.alive.store(false, Ordering::SeqCst);
        for task in self.tasks {
            task.abort();
        }
    }
}

/// Simulated echo socket.
pub struct LoopbackTransport {
    config: LoopbackConfig,
    channels: TransportChannels,
    session: Mutex<Option<Session>>,
}

impl LoopbackTransport {
    pub fn new(config: LoopbackConfig) -> Self {
        let channels = TransportChannels::new(config.inbound_capacity);
        Self {
            config,
            channels,
            session: Mutex::new(None),
        }
    }

    /// Simulate an unexpected loss of the link.
    pub fn sever(&self) {
        if let Some(session) = self.session.lock().take() {
            warn!("[loopback] link severed");
            session.close();
        }
        self.channels.set_open(false);
    }

    /// Push a raw frame onto the inbound stream as if it came off the wire.
    pub fn inject(&self, message: WireMessage) {
        self.channels.publish(message);
    }

    pub fn is_open(&self) -> bool {
        self.channels.is_open()
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new(LoopbackConfig::default())
    }
}

impl Transport for LoopbackTransport {
    fn name(&self) -> &str {
        "loopback"
    }

    fn connect(&self) {
        let mut guard = self.session.lock();
        if let Some(old) = guard.take() {
            debug!("[loopback] tearing down previous session");
            old.close();
        }
        self.channels.set_open(false);

        let alive = Arc::new(AtomicBool::new(true));
        let (echo_tx, echo_rx) = mpsc::unbounded_channel();

        let handshake = {
            let alive = alive.clone();
            let channels = self.channels.clone();
            let delay = self.config.connect_delay;
            let refuse = self.config.refuse_connections;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if !alive.load(Ordering::SeqCst) {
                    return;
                }
                if refuse {
                    warn!("[loopback] connection refused");
                    channels.report_failure("connection refused");
                } else {
                    channels.set_open(true);
                    info!("[loopback] open");
                }
            })
        };

        let echo = {
            let alive = alive.clone();
            let channels = self.channels.clone();
            tokio::spawn(echo_loop(echo_rx, channels, alive))
        };

        *guard = Some(Session {
            alive,
            echo_tx,
            tasks: vec![handshake, echo],
        });
    }

    fn disconnect(&self) {
        if let Some(session) = self.session.lock().take() {
            info!("[loopback] closed");
            session.close();
        }
        self.channels.set_open(false);
    }

    fn send(&self, message: String) {
        if !self.channels.is_open() {
            debug!("[loopback] not open, dropping outbound frame");
            return;
        }
        let guard = self.session.lock();
        if let Some(session) = guard.as_ref() {
            let due = Instant::now() + self.config.round_trip;
            if session.echo_tx.send((due, message)).is_err() {
                debug!("[loopback] echo task gone, dropping outbound frame");
            }
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

async fn echo_loop(
    mut rx: mpsc::UnboundedReceiver<(Instant, String)>,
    channels: TransportChannels,
    alive: Arc<AtomicBool>,
) {
    while let Some((due, frame)) = rx.recv().await {
        tokio::time::sleep_until(due).await;
        if !alive.load(Ordering::SeqCst) {
            return;
        }
        channels.publish(WireMessage::Text(frame));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> LoopbackTransport {
        LoopbackTransport::new(LoopbackConfig {
            connect_delay: Duration::from_millis(10),
            round_trip: Duration::from_millis(5),
            inbound_capacity: 16,
            refuse_connections: false,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn opens_after_connect_delay() {
        let t = fast();
        let mut status = t.connection_status();
        assert!(!*status.borrow());

        t.connect();
        status.wait_for(|open| *open).await.unwrap();
        assert!(t.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn echoes_sent_frames_in_order() {
        let t = fast();
        let mut inbound = t.messages();
        t.connect();
        t.connection_status().wait_for(|open| *open).await.unwrap();

        t.send("one".into());
        t.send("two".into());

        assert_eq!(inbound.recv().await.unwrap(), WireMessage::Text("one".into()));
        assert_eq!(inbound.recv().await.unwrap(), WireMessage::Text("two".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn send_while_closed_is_dropped() {
        let t = fast();
        let mut inbound = t.messages();
        t.send("lost".into());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(matches!(inbound.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_drops_in_flight_echo() {
        let t = fast();
        let mut inbound = t.messages();
        t.connect();
        t.connection_status().wait_for(|open| *open).await.unwrap();

        t.send("late".into());
        t.disconnect();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(inbound.try_recv().is_err());
        assert!(!t.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_when_closed_does_not_notify() {
        let t = fast();
        let status = t.connection_status();
        t.disconnect();
        t.disconnect();
        assert!(!status.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn refused_connect_reports_failure() {
        let t = LoopbackTransport::new(LoopbackConfig {
            refuse_connections: true,
            ..LoopbackConfig::default()
        });
        let mut failures = t.failures();
        t.connect();
        let failure = failures.recv().await.unwrap();
        assert_eq!(failure.reason, "connection refused");
        assert!(!t.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn sever_flips_status() {
        let t = fast();
        let mut status = t.connection_status();
        t.connect();
        status.wait_for(|open| *open).await.unwrap();

        t.sever();
        status.changed().await.unwrap();
        assert!(!*status.borrow());
    }
}
