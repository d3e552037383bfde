//! Hand-rolled WebSocket transport: handshake, frame codec, sessions,
//! and the broadcast hub.
//!
//! The `/ws` endpoint upgrades conforming HTTP requests and hands the
//! raw byte stream to a per-connection session task. Sessions decode
//! frames with the codec in [`frame`], register with the shared [`hub`],
//! and fan text messages out to every connected peer.

pub mod frame;
pub mod handler;
pub mod handshake;
pub mod hub;
pub mod session;
