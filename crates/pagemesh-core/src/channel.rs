//! Peer channel abstraction.
//!
//! The protocol layers above assume a connected, ordered, reliable,
//! message-oriented duplex channel; establishing one is the session layer's
//! job. The [`MessageChannel`] trait is the seam real transports implement.
//!
//! The channel also exposes the transport's outbound buffering: a gauge of
//! bytes queued but not yet consumed by the peer, a configurable low
//! threshold, and a one-shot drained wait that resolves once the gauge has
//! fallen to the threshold. The push transfer engine builds its
//! backpressure on exactly these three pieces.
//!
//! [`duplex_pair`] provides the in-process implementation used by the
//! loopback transport, the CLI demo, and the test suites.

use crate::error::ChannelError;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, Notify, mpsc};

/// Ordered, reliable, message-oriented duplex channel to one peer.
///
/// Delivery order is guaranteed within the channel; the protocol relies on
/// it and carries no sequence numbers.
pub trait MessageChannel: Send + Sync + 'static {
    /// Queue one message for the peer. Fails only if the channel is closed.
    fn send(&self, data: Vec<u8>) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Receive the next inbound message. Fails once the channel is closed.
    fn recv(&self) -> impl Future<Output = Result<Vec<u8>, ChannelError>> + Send;

    /// Outstanding outbound bytes not yet consumed by the peer
    fn buffered_bytes(&self) -> usize;

    /// Configure the buffered-byte level at which [`Self::drained`] resolves
    fn set_low_threshold(&self, bytes: usize);

    /// One-shot wait: resolves when the outbound buffer has fallen to the
    /// low threshold or below, or when the channel closes. Each call arms
    /// exactly one listener, removed when it fires.
    fn drained(&self) -> impl Future<Output = ()> + Send;

    /// Close both directions of the channel
    fn close(&self);

    /// Whether either end has closed the channel
    fn is_closed(&self) -> bool;
}

/// Per-direction buffering gauge shared between the two endpoints
struct Gauge {
    buffered: AtomicUsize,
    low_threshold: AtomicUsize,
    drained: Notify,
}

impl Gauge {
    fn new() -> Self {
        Self {
            buffered: AtomicUsize::new(0),
            low_threshold: AtomicUsize::new(0),
            drained: Notify::new(),
        }
    }

    fn at_or_below_threshold(&self) -> bool {
        self.buffered.load(Ordering::Acquire) <= self.low_threshold.load(Ordering::Acquire)
    }
}

/// State shared by both endpoints of a duplex pair
struct Shared {
    closed: AtomicBool,
    closed_notify: Notify,
}

/// In-process endpoint of an ordered message channel.
///
/// Created in connected pairs by [`duplex_pair`]. Messages travel through
/// unbounded queues; the buffered gauge counts bytes handed to `send` and
/// not yet taken out by the peer's `recv`.
pub struct DuplexChannel {
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    send_gauge: Arc<Gauge>,
    recv_gauge: Arc<Gauge>,
    shared: Arc<Shared>,
}

/// Create a connected pair of in-process channel endpoints
#[must_use]
pub fn duplex_pair() -> (DuplexChannel, DuplexChannel) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    let a_gauge = Arc::new(Gauge::new());
    let b_gauge = Arc::new(Gauge::new());
    let shared = Arc::new(Shared {
        closed: AtomicBool::new(false),
        closed_notify: Notify::new(),
    });

    let a = DuplexChannel {
        outbound: a_tx,
        inbound: Mutex::new(b_rx),
        send_gauge: Arc::clone(&a_gauge),
        recv_gauge: Arc::clone(&b_gauge),
        shared: Arc::clone(&shared),
    };
    let b = DuplexChannel {
        outbound: b_tx,
        inbound: Mutex::new(a_rx),
        send_gauge: b_gauge,
        recv_gauge: a_gauge,
        shared,
    };
    (a, b)
}

impl DuplexChannel {
    /// Bytes the peer has queued toward this endpoint and this endpoint
    /// has not yet received. The mirror of the peer's
    /// [`MessageChannel::buffered_bytes`]; mainly useful for tests and
    /// backlog monitoring.
    #[must_use]
    pub fn peer_buffered_bytes(&self) -> usize {
        self.recv_gauge.buffered.load(Ordering::Acquire)
    }
}

impl MessageChannel for DuplexChannel {
    async fn send(&self, data: Vec<u8>) -> Result<(), ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        self.send_gauge
            .buffered
            .fetch_add(data.len(), Ordering::AcqRel);
        let len = data.len();
        if self.outbound.send(data).is_err() {
            self.send_gauge.buffered.fetch_sub(len, Ordering::AcqRel);
            return Err(ChannelError::Closed);
        }
        Ok(())
    }

    async fn recv(&self) -> Result<Vec<u8>, ChannelError> {
        let mut inbound = self.inbound.lock().await;
        // Closing stops new sends but never strands data: anything already
        // queued is delivered before the closed error surfaces.
        let data = loop {
            match inbound.try_recv() {
                Ok(data) => break data,
                Err(mpsc::error::TryRecvError::Disconnected) => return Err(ChannelError::Closed),
                Err(mpsc::error::TryRecvError::Empty) => {
                    let closed = self.shared.closed_notify.notified();
                    tokio::pin!(closed);
                    // Register before re-checking so a close cannot slip
                    // between the check and the await.
                    closed.as_mut().enable();
                    if self.is_closed() {
                        return Err(ChannelError::Closed);
                    }
                    tokio::select! {
                        msg = inbound.recv() => match msg {
                            Some(data) => break data,
                            None => return Err(ChannelError::Closed),
                        },
                        () = closed => {}
                    }
                }
            }
        };
        self.recv_gauge
            .buffered
            .fetch_sub(data.len(), Ordering::AcqRel);
        if self.recv_gauge.at_or_below_threshold() {
            self.recv_gauge.drained.notify_waiters();
        }
        Ok(data)
    }

    fn buffered_bytes(&self) -> usize {
        self.send_gauge.buffered.load(Ordering::Acquire)
    }

    fn set_low_threshold(&self, bytes: usize) {
        self.send_gauge.low_threshold.store(bytes, Ordering::Release);
    }

    async fn drained(&self) {
        loop {
            let armed = self.send_gauge.drained.notified();
            tokio::pin!(armed);
            // Register before re-checking the gauge so a concurrent recv
            // cannot slip its wakeup between the check and the await.
            armed.as_mut().enable();
            if self.is_closed() || self.send_gauge.at_or_below_threshold() {
                return;
            }
            armed.await;
        }
    }

    fn close(&self) {
        if !self.shared.closed.swap(true, Ordering::AcqRel) {
            self.shared.closed_notify.notify_waiters();
            // Release any sender parked on a drained wait.
            self.send_gauge.drained.notify_waiters();
            self.recv_gauge.drained.notify_waiters();
        }
    }

    fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl Drop for DuplexChannel {
    fn drop(&mut self) {
        self.close();
    }
}
