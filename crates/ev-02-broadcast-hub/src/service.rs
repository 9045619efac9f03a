//! # Broadcast Hub Service
//!
//! Connection set plus history ring behind a single mutex.
//!
//! ## Delivery model
//!
//! Each connection owns a bounded outbox drained by its own writer task
//! (`pump_outbox`). `broadcast` encodes the frame once and `try_send`s it to
//! every outbox, so it never waits on a peer:
//!
//! - outbox closed: the connection is removed
//! - outbox full: the frame is dropped for that connection; after
//!   `max_consecutive_drops` in a row the connection is evicted
//!
//! Registration replays history into the fresh outbox while holding the same
//! lock `broadcast` takes, so a new connection sees its replay strictly
//! before any live frame.

use parking_lot::Mutex;
use shared_types::{ClientMessage, HubStats, ProcessedEvent, StreamMessage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::domain::{ConnectionId, Frame, HistoryEntry, HistoryRing, HubConfig, HubError};
use crate::ports::ConnectionSink;

struct Connection {
    outbox: mpsc::Sender<Frame>,
    consecutive_drops: u32,
}

struct HubState {
    connections: HashMap<ConnectionId, Connection>,
    history: HistoryRing,
}

/// Monotonic hub counters.
#[derive(Debug, Default)]
struct HubCounters {
    broadcasts: AtomicU64,
    dropped: AtomicU64,
    evicted: AtomicU64,
}

/// Point-in-time view of the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubSnapshot {
    pub connections: usize,
    pub history_len: usize,
    pub broadcasts: u64,
    /// Frames not delivered because an outbox was full.
    pub dropped: u64,
    /// Connections removed for sustained backpressure.
    pub evicted: u64,
}

/// Handle returned by [`BroadcastHub::register`].
pub struct Registration {
    pub id: ConnectionId,
    /// Replayed history followed by live frames. Ends when the hub drops
    /// the connection.
    pub outbox: mpsc::Receiver<Frame>,
}

/// Why a writer task stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpExit {
    /// The hub dropped the connection.
    Unregistered,
    /// The transport failed or stalled.
    Failed(HubError),
}

/// Live fan-out hub.
pub struct BroadcastHub {
    config: HubConfig,
    state: Mutex<HubState>,
    next_id: AtomicU64,
    counters: HubCounters,
}

impl BroadcastHub {
    pub fn new(config: HubConfig) -> Self {
        let history = HistoryRing::new(config.history_capacity);
        Self {
            config,
            state: Mutex::new(HubState {
                connections: HashMap::new(),
                history,
            }),
            next_id: AtomicU64::new(1),
            counters: HubCounters::default(),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Add a connection and queue up to `replay_count` recent events for it.
    pub fn register(&self) -> Registration {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.config.effective_outbox_capacity());

        let mut state = self.state.lock();
        let mut replayed = 0usize;
        for entry in state.history.recent(self.config.effective_replay_count()) {
            // Capacity covers the replay, so this only fails if rx is gone.
            if tx.try_send(entry.frame.clone()).is_err() {
                break;
            }
            replayed += 1;
        }
        state.connections.insert(
            id,
            Connection {
                outbox: tx,
                consecutive_drops: 0,
            },
        );
        let clients = state.connections.len();
        drop(state);

        info!(connection_id = %id, replayed, clients, "Live connection registered");
        Registration { id, outbox: rx }
    }

    /// Remove a connection. Returns false if it was already gone.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.state.lock().connections.remove(&id).is_some();
        if removed {
            debug!(connection_id = %id, "Live connection unregistered");
        }
        removed
    }

    /// Record `event` in history and push it to every connection.
    ///
    /// Returns the number of connections the frame was queued for.
    pub fn broadcast(&self, event: Arc<ProcessedEvent>) -> usize {
        let frame: Frame = match StreamMessage::encode_event(&event) {
            Ok(json) => Arc::from(json),
            Err(e) => {
                warn!(event_id = %event.event_id, error = %e, "Failed to encode event frame");
                return 0;
            }
        };

        self.counters.broadcasts.fetch_add(1, Ordering::Relaxed);
        let max_drops = self.config.max_consecutive_drops;
        let mut delivered = 0usize;
        let mut dropped = 0u64;
        let mut evicted = Vec::new();
        let mut closed = Vec::new();

        let mut state = self.state.lock();
        state.history.push(HistoryEntry {
            event,
            frame: frame.clone(),
        });
        state
            .connections
            .retain(|id, conn| match conn.outbox.try_send(frame.clone()) {
                Ok(()) => {
                    conn.consecutive_drops = 0;
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    conn.consecutive_drops += 1;
                    dropped += 1;
                    if conn.consecutive_drops >= max_drops {
                        evicted.push(*id);
                        false
                    } else {
                        true
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    closed.push(*id);
                    false
                }
            });
        drop(state);

        if dropped > 0 {
            self.counters.dropped.fetch_add(dropped, Ordering::Relaxed);
        }
        for id in &evicted {
            self.counters.evicted.fetch_add(1, Ordering::Relaxed);
            warn!(connection_id = %id, max_drops, "Evicting slow live connection");
        }
        for id in &closed {
            debug!(connection_id = %id, "Removed closed live connection");
        }

        delivered
    }

    /// Broadcast each event in order.
    pub fn broadcast_all<I>(&self, events: I) -> usize
    where
        I: IntoIterator<Item = Arc<ProcessedEvent>>,
    {
        events.into_iter().map(|event| self.broadcast(event)).sum()
    }

    /// React to a text frame received from connection `id`.
    ///
    /// `subscribe` is acknowledged in the log only; `ping` is answered with a
    /// `stats` frame; anything else is ignored.
    pub fn handle_inbound(&self, id: ConnectionId, text: &str) {
        match ClientMessage::parse(text) {
            Some(ClientMessage::Subscribe) => {
                info!(connection_id = %id, "Client subscribed to events");
            }
            Some(ClientMessage::Ping) => self.reply_stats(id),
            None => debug!(connection_id = %id, "Ignoring unrecognised client message"),
        }
    }

    fn reply_stats(&self, id: ConnectionId) {
        let state = self.state.lock();
        let stats = StreamMessage::Stats(HubStats {
            clients: state.connections.len(),
        });
        let Some(conn) = state.connections.get(&id) else {
            return;
        };
        match stats.to_json() {
            Ok(json) => {
                if conn.outbox.try_send(Arc::from(json)).is_err() {
                    debug!(connection_id = %id, "Stats reply dropped");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode stats frame"),
        }
    }

    /// Drop every connection. Each writer flushes what is queued, closes
    /// its transport and exits. Returns the number of connections dropped.
    pub fn close_all(&self) -> usize {
        let closed = {
            let mut state = self.state.lock();
            let closed = state.connections.len();
            state.connections.clear();
            closed
        };
        info!(closed, "Closed all live connections");
        closed
    }

    pub fn connection_count(&self) -> usize {
        self.state.lock().connections.len()
    }

    /// The newest `n` broadcast events, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Arc<ProcessedEvent>> {
        self.state
            .lock()
            .history
            .recent(n)
            .map(|entry| entry.event.clone())
            .collect()
    }

    pub fn snapshot(&self) -> HubSnapshot {
        let state = self.state.lock();
        HubSnapshot {
            connections: state.connections.len(),
            history_len: state.history.len(),
            broadcasts: self.counters.broadcasts.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            evicted: self.counters.evicted.load(Ordering::Relaxed),
        }
    }
}

/// Drain `outbox` into `sink` until the hub drops the connection or a send
/// fails or exceeds `send_timeout`.
///
/// Returning drops `outbox`; the hub notices on its next broadcast and
/// removes the connection.
pub async fn pump_outbox<S: ConnectionSink>(
    id: ConnectionId,
    mut outbox: mpsc::Receiver<Frame>,
    mut sink: S,
    send_timeout: Duration,
) -> PumpExit {
    while let Some(frame) = outbox.recv().await {
        let result = match tokio::time::timeout(send_timeout, sink.send(&frame)).await {
            Ok(result) => result,
            Err(_) => Err(HubError::SendTimeout(send_timeout)),
        };
        if let Err(e) = result {
            warn!(connection_id = %id, error = %e, "Live connection writer stopped");
            sink.close().await;
            return PumpExit::Failed(e);
        }
    }

    sink.close().await;
    PumpExit::Unregistered
}
