//! HTTP upgrade endpoint for the hand-rolled WebSocket transport.
//!
//! The handler validates the upgrade request itself, answers `101
//! Switching Protocols` itself, and claims the raw byte stream through
//! [`hyper::upgrade::OnUpgrade`], the same primitive higher-level
//! WebSocket extractors are built on. Once upgraded, no further HTTP
//! handling happens on the connection; the session owns it exclusively.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;

use super::{handshake, session};
use crate::app_state::AppState;
use crate::error::HandshakeError;

/// `GET /ws` — negotiate the upgrade and hand the stream to a session.
///
/// Non-conforming requests are rejected with a standard HTTP error
/// before any WebSocket logic runs.
pub async fn ws_handler(State(state): State<AppState>, mut request: Request) -> Response {
    let accept = match handshake::accept(request.headers()) {
        Ok(accept) => accept,
        Err(err) => {
            tracing::warn!(%err, "rejected websocket upgrade");
            return err.into_response();
        }
    };

    let Some(on_upgrade) = request.extensions_mut().remove::<OnUpgrade>() else {
        tracing::warn!("upgrade requested on a connection that cannot be hijacked");
        return HandshakeError::NotUpgradable.into_response();
    };

    let hub = Arc::clone(&state.hub);
    let max_frame_bytes = state.config.max_frame_bytes;
    tokio::spawn(async move {
        match on_upgrade.await {
            Ok(upgraded) => {
                session::run(TokioIo::new(upgraded), hub, max_frame_bytes).await;
            }
            Err(err) => tracing::warn!(%err, "websocket upgrade failed"),
        }
    });

    switching_protocols(&accept)
}

/// Builds the fixed `101 Switching Protocols` response carrying the
/// accept key.
fn switching_protocols(accept: &str) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    let headers = response.headers_mut();
    headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
    match HeaderValue::from_str(accept) {
        Ok(value) => {
            headers.insert(header::SEC_WEBSOCKET_ACCEPT, value);
        }
        Err(err) => {
            // Base64 output is always a valid header value; if it is not,
            // refuse the upgrade rather than send a broken handshake.
            tracing::error!(%err, "computed accept key is not a valid header value");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }
    response
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn switching_protocols_response_shape() {
        let response = switching_protocols("s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
        assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
        assert_eq!(
            response.headers().get(header::UPGRADE),
            Some(&HeaderValue::from_static("websocket"))
        );
        assert_eq!(
            response.headers().get(header::SEC_WEBSOCKET_ACCEPT),
            Some(&HeaderValue::from_static("s3pPLMBiTxaQ9kYGzzhZRbK+xOo="))
        );
    }
}
