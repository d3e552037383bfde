//! Transport error types.
//!
//! [`HandshakeError`] covers the HTTP upgrade negotiation; each variant
//! maps to an HTTP status code and a structured JSON error response.
//! [`FrameError`] covers everything after the upgrade: protocol
//! violations in the frame codec and stream I/O failures. Both are fatal
//! to a single connection only and never propagate across sessions.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All HTTP error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 400,
///     "message": "missing or mismatched header: Upgrade"
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with the HTTP status code and a human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// HTTP status code, repeated in the body for log scrapers.
    pub code: u16,
    /// Human-readable error message.
    pub message: String,
}

/// Upgrade negotiation failure.
///
/// Fatal to the connection attempt only: surfaced as an HTTP error
/// response before any WebSocket frame is read. A connection that fails
/// the handshake is never registered with the hub.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// A required upgrade header is missing or carries the wrong value.
    #[error("missing or mismatched header: {0}")]
    BadHeader(&'static str),

    /// `Sec-WebSocket-Key` is absent or empty.
    #[error("missing Sec-WebSocket-Key")]
    MissingKey,

    /// `Sec-WebSocket-Version` does not include version 13.
    #[error("unsupported WebSocket version: {0}")]
    UnsupportedVersion(String),

    /// The underlying connection cannot hand over a raw byte stream.
    #[error("connection does not support upgrade")]
    NotUpgradable,

    /// Client side: the server answered with something other than
    /// `101 Switching Protocols`.
    #[error("expected 101 Switching Protocols, got: {0}")]
    NotSwitchingProtocols(String),

    /// Client side: no entropy available for the handshake nonce.
    #[error("failed to generate handshake key: {0}")]
    KeyEntropy(#[from] getrandom::Error),

    /// Stream failure during the handshake exchange.
    #[error("handshake I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HandshakeError {
    /// Returns the HTTP status code reported for this variant.
    ///
    /// Version mismatches get `426 Upgrade Required` per RFC 6455
    /// section 4.2.2; every other negotiation failure is a plain
    /// `400 Bad Request`. Client-side variants never render as HTTP
    /// responses but still map to a sane code.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedVersion(_) => StatusCode::UPGRADE_REQUIRED,
            Self::BadHeader(_) | Self::MissingKey | Self::NotUpgradable => {
                StatusCode::BAD_REQUEST
            }
            Self::NotSwitchingProtocols(_) | Self::KeyEntropy(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for HandshakeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: status.as_u16(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

/// Frame codec failure.
///
/// Protocol violations trigger an immediate close without a close
/// handshake; I/O failures mean the stream is already unusable. Either
/// way the session is torn down and de-registered from the hub.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// FIN bit unset: fragmented messages are rejected, not buffered.
    #[error("fragmented frames are not supported")]
    FragmentedFrame,

    /// Unknown or reserved opcode value.
    #[error("invalid opcode: 0x{0:x}")]
    InvalidOpcode(u8),

    /// Declared payload length exceeds the configured cap.
    #[error("frame payload of {len} bytes exceeds the {max}-byte limit")]
    PayloadTooLarge {
        /// Length declared in the frame header.
        len: u64,
        /// Configured maximum payload size in bytes.
        max: usize,
    },

    /// Stream read or write failure, including short reads.
    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Returns `true` for protocol violations, `false` for transport
    /// failures.
    #[must_use]
    pub const fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::FragmentedFrame | Self::InvalidOpcode(_) | Self::PayloadTooLarge { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn version_mismatch_maps_to_426() {
        let err = HandshakeError::UnsupportedVersion("8".to_string());
        assert_eq!(err.status_code(), StatusCode::UPGRADE_REQUIRED);
    }

    #[test]
    fn missing_headers_map_to_400() {
        assert_eq!(
            HandshakeError::BadHeader("Upgrade").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HandshakeError::MissingKey.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn protocol_and_io_variants_are_distinguished() {
        assert!(FrameError::FragmentedFrame.is_protocol());
        assert!(FrameError::InvalidOpcode(0x3).is_protocol());
        assert!(
            FrameError::PayloadTooLarge { len: 10, max: 5 }.is_protocol()
        );
        let io = FrameError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "short read",
        ));
        assert!(!io.is_protocol());
    }
}
