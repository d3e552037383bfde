//! Registry of open sessions and broadcast fan-out.
//!
//! [`Hub`] owns the `SessionId → Peer` map behind one exclusive lock and
//! is shared by reference (`Arc`) with every session task; there is no
//! process-wide singleton. The hub lock establishes a total order of
//! broadcasts: every recipient observes messages in the order the
//! corresponding `broadcast` calls acquired the lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::frame::{self, Opcode};
use crate::error::FrameError;

/// Unique identity of one open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a fresh random session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Write half of a session's stream behind its per-session write lock.
///
/// Only one frame write may be in flight per stream; racing broadcasts
/// serialize here so each recipient always sees whole frames.
pub type SharedWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// One registered session as the hub sees it: identity, display name,
/// and the locked write half of its stream.
#[derive(Clone)]
pub struct Peer {
    /// Session identity.
    pub id: SessionId,
    /// Sanitized display name announced in the identity frame.
    pub name: String,
    writer: SharedWriter,
}

impl Peer {
    /// Creates a peer around an already-sanitized display name and the
    /// session's shared write half.
    #[must_use]
    pub fn new(name: String, writer: SharedWriter) -> Self {
        Self {
            id: SessionId::new(),
            name,
            writer,
        }
    }

    /// Writes pre-encoded frame bytes under this peer's write lock.
    async fn send_encoded(&self, encoded: &[u8]) -> Result<(), FrameError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(encoded).await?;
        writer.flush().await?;
        Ok(())
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Registry of open sessions with broadcast fan-out.
///
/// A session appears here iff it is in the open state: registration
/// happens right after the identity frame, removal exactly once at
/// session teardown. Process-lifetime only; nothing is persisted.
pub struct Hub {
    peers: Mutex<HashMap<SessionId, Peer>>,
}

impl Hub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self {
            peers: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts a session under the hub lock.
    pub async fn register(&self, peer: Peer) {
        let mut peers = self.peers.lock().await;
        tracing::info!(user = %peer.name, connections = peers.len() + 1, "user connected");
        peers.insert(peer.id, peer);
    }

    /// Removes a session under the hub lock.
    ///
    /// Idempotent: unregistering an absent or never-registered session
    /// is a no-op.
    pub async fn unregister(&self, id: SessionId) {
        let mut peers = self.peers.lock().await;
        if let Some(peer) = peers.remove(&id) {
            tracing::info!(user = %peer.name, connections = peers.len(), "user disconnected");
        }
    }

    /// Broadcasts `"<displayName>: <text>"` as one Text frame to every
    /// registered session, the sender included.
    ///
    /// The line is encoded once and written to each peer under that
    /// peer's write lock. Fan-out is best-effort per recipient: a failed
    /// write never aborts delivery to the rest. Failed recipients are
    /// collected during iteration and removed after it, never while the
    /// membership set is being walked.
    pub async fn broadcast(&self, sender: SessionId, text: &str) {
        let mut peers = self.peers.lock().await;
        let Some(sender_peer) = peers.get(&sender) else {
            return;
        };
        let line = format!("{}: {}", sender_peer.name, text);
        tracing::info!(message = %line, "broadcast");

        let encoded = frame::encode_frame(Opcode::Text, line.as_bytes());
        let mut failed = Vec::new();
        for peer in peers.values() {
            if let Err(err) = peer.send_encoded(&encoded).await {
                tracing::warn!(user = %peer.name, %err, "dropping peer after failed write");
                failed.push(peer.id);
            }
        }
        for id in failed {
            peers.remove(&id);
        }
    }

    /// Returns the number of open sessions.
    pub async fn len(&self) -> usize {
        self.peers.lock().await.len()
    }

    /// Returns `true` when no sessions are registered.
    pub async fn is_empty(&self) -> bool {
        self.peers.lock().await.is_empty()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub").finish_non_exhaustive()
    }
}
