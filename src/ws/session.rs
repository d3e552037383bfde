//! Per-connection session: identity, read loop, close sequencing.
//!
//! A session moves through `Awaiting-Identity → Open → Closing → Closed`
//! after the handshake. The first frame names the peer; every following
//! Text frame is handed to the hub for broadcast; a Close frame gets a
//! Close acknowledgment before teardown; a decode error tears the
//! session down without a close handshake. Teardown always unregisters
//! from the hub and drops the stream, exactly once.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;

use super::frame::{self, Opcode};
use super::hub::{Hub, Peer, SharedWriter};

/// Display name used when the identity frame is empty after trimming.
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Drives one upgraded connection to completion.
///
/// Owns the stream exclusively; when this future returns, both halves
/// have been dropped and the connection is closed. Errors never escape:
/// they are logged and end this session only.
pub async fn run<S>(stream: S, hub: Arc<Hub>, max_frame_bytes: usize)
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (mut reader, write_half) = tokio::io::split(stream);

    // Awaiting-Identity: the first frame names the peer. A Close or any
    // decode failure here ends the session without registration.
    let identity = match frame::read_frame(&mut reader, max_frame_bytes).await {
        Ok(frame) => frame,
        Err(err) => {
            tracing::warn!(%err, "failed to read identity frame");
            return;
        }
    };
    if identity.opcode == Opcode::Close {
        tracing::debug!("peer closed before identifying");
        return;
    }
    let name = display_name(&identity.payload);

    // The write half is shared between this session (close acks, pongs)
    // and the hub (broadcast fan-out); the lock keeps frame writes whole.
    let writer: SharedWriter = Arc::new(Mutex::new(Box::new(write_half)));
    let peer = Peer::new(name, Arc::clone(&writer));
    let id = peer.id;
    hub.register(peer).await;

    // Open: decode loop. Text → broadcast, Close → Closing, Ping → Pong,
    // anything else is ignored. Decode errors skip the close handshake.
    let mut acknowledge_close = false;
    loop {
        match frame::read_frame(&mut reader, max_frame_bytes).await {
            Ok(frame) => match frame.opcode {
                Opcode::Text => {
                    let text = String::from_utf8_lossy(&frame.payload);
                    hub.broadcast(id, &text).await;
                }
                Opcode::Close => {
                    acknowledge_close = true;
                    break;
                }
                Opcode::Ping => {
                    let mut guard = writer.lock().await;
                    if let Err(err) =
                        frame::write_frame(&mut *guard, Opcode::Pong, &frame.payload).await
                    {
                        tracing::warn!(session = %id, %err, "failed to answer ping");
                        break;
                    }
                }
                Opcode::Binary | Opcode::Pong | Opcode::Continuation => {
                    tracing::trace!(session = %id, opcode = ?frame.opcode, "ignoring frame");
                }
            },
            Err(err) if err.is_protocol() => {
                tracing::warn!(session = %id, %err, "protocol violation, dropping session");
                break;
            }
            Err(err) => {
                tracing::debug!(session = %id, %err, "session stream ended");
                break;
            }
        }
    }

    // Closing: acknowledge an orderly close with an empty Close frame.
    if acknowledge_close {
        let mut guard = writer.lock().await;
        if let Err(err) = frame::write_frame(&mut *guard, Opcode::Close, &[]).await {
            tracing::debug!(session = %id, %err, "failed to write close acknowledgment");
        }
    }

    // Closed: de-register and let both stream halves drop.
    hub.unregister(id).await;
}

/// Derives the display name from the identity frame payload: trimmed,
/// defaulted when empty, and escaped against markup injection before it
/// is ever rendered into a broadcast line.
fn display_name(payload: &[u8]) -> String {
    let raw = String::from_utf8_lossy(payload);
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        ANONYMOUS_NAME.to_string()
    } else {
        escape_markup(trimmed)
    }
}

/// Replaces the five HTML-significant characters with entities.
fn escape_markup(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
