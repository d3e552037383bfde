//! # chatwire
//!
//! Chat relay with a hand-rolled RFC 6455 WebSocket transport. The
//! upgrade handshake, the binary frame codec (masking, extended length
//! encoding), per-connection sessions, and the broadcast hub are all
//! implemented here over raw byte streams; the HTTP layer only routes,
//! rejects malformed upgrades, and hands the stream over.
//!
//! ## Architecture
//!
//! ```text
//! HTTP clients ──► api/        (health)
//! WS clients   ──► ws/handler  (upgrade negotiation, 101, hijack)
//!                      │
//!                  ws/session  (identity → open → closing → closed)
//!                      │
//!                  ws/frame    (RFC 6455 codec)
//!                      │
//!                  ws/hub      (registry + broadcast fan-out)
//!
//! client/ ──► dial + handshake, mirrored codec, no hub (single peer)
//! ```

pub mod api;
pub mod app_state;
pub mod client;
pub mod config;
pub mod error;
pub mod ws;
