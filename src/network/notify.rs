//! Outbound Notification
//!
//! The engine reaches clients only through [`Notifier`]. The gateway backs it
//! with per-connection channels; tests back it with a recorder.
//!
//! Delivery never awaits. Each connection's writer task drains its channel.

use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::core::ids::ConnectionId;
use crate::network::protocol::ServerMessage;

/// Who a message goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    /// A single connection.
    One(ConnectionId),
    /// Every connection in the set.
    Many(Vec<ConnectionId>),
}

impl Recipients {
    /// Iterate the targeted connections.
    pub fn iter(&self) -> impl Iterator<Item = &ConnectionId> {
        match self {
            Recipients::One(id) => std::slice::from_ref(id).iter(),
            Recipients::Many(ids) => ids.iter(),
        }
    }
}

/// "Send to participant(s)" capability supplied by the gateway.
pub trait Notifier: Send + Sync {
    /// Deliver a message. Unknown or closed connections are skipped.
    fn notify(&self, recipients: Recipients, message: ServerMessage);
}

// =============================================================================
// CHANNEL NOTIFIER
// =============================================================================

/// Routes messages into each connection's outbound channel.
#[derive(Default)]
pub struct ChannelNotifier {
    senders: RwLock<BTreeMap<ConnectionId, mpsc::Sender<ServerMessage>>>,
}

impl ChannelNotifier {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection's outbound channel.
    pub fn register(&self, connection: ConnectionId, sender: mpsc::Sender<ServerMessage>) {
        let mut senders = self.senders.write().unwrap_or_else(|e| e.into_inner());
        senders.insert(connection, sender);
    }

    /// Detach a connection. Idempotent.
    pub fn unregister(&self, connection: &ConnectionId) {
        let mut senders = self.senders.write().unwrap_or_else(|e| e.into_inner());
        senders.remove(connection);
    }

    /// Number of attached connections.
    pub fn connection_count(&self) -> usize {
        self.senders.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, recipients: Recipients, message: ServerMessage) {
        let senders = self.senders.read().unwrap_or_else(|e| e.into_inner());
        for id in recipients.iter() {
            let Some(sender) = senders.get(id) else {
                debug!("Dropping message for unknown connection {}", id.short());
                continue;
            };
            match sender.try_send(message.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("Outbound buffer full for {}, message dropped", id.short());
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Connection {} already closed", id.short());
                }
            }
        }
    }
}

// =============================================================================
// RECORDING NOTIFIER
// =============================================================================

/// Keeps every delivered message in memory, per connection.
#[derive(Default)]
pub struct RecordingNotifier {
    inbox: Mutex<BTreeMap<ConnectionId, Vec<ServerMessage>>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take and clear everything delivered to a connection.
    pub fn take(&self, connection: &ConnectionId) -> Vec<ServerMessage> {
        let mut inbox = self.inbox.lock().unwrap_or_else(|e| e.into_inner());
        inbox.remove(connection).unwrap_or_default()
    }

    /// Total messages currently held.
    pub fn len(&self) -> usize {
        let inbox = self.inbox.lock().unwrap_or_else(|e| e.into_inner());
        inbox.values().map(Vec::len).sum()
    }

    /// Whether nothing is held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, recipients: Recipients, message: ServerMessage) {
        let mut inbox = self.inbox.lock().unwrap_or_else(|e| e.into_inner());
        for id in recipients.iter() {
            inbox.entry(*id).or_default().push(message.clone());
        }
    }
}
