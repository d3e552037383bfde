//! WebSocket opening handshake (RFC 6455 section 4).
//!
//! Server side validates the upgrade request headers and computes the
//! `Sec-WebSocket-Accept` value; the HTTP layer writes the actual `101
//! Switching Protocols` response. Client side writes the GET upgrade
//! request with a fresh random nonce and validates the response status
//! line before any frame traffic begins.

use axum::http::HeaderMap;
use base64::Engine;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::HandshakeError;

/// Fixed GUID appended to the client key before hashing (RFC 6455 §4.2.2).
const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Response header lines may not exceed this many bytes.
const MAX_HEADER_LINE: usize = 8 * 1024;

/// Computes the `Sec-WebSocket-Accept` value for a client key:
/// `base64(sha1(key + GUID))`.
#[must_use]
pub fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Validates an upgrade request and returns the accept key to echo back.
///
/// Requires `Connection` to carry the `upgrade` token, `Upgrade:
/// websocket`, a non-empty `Sec-WebSocket-Key`, and a
/// `Sec-WebSocket-Version` containing `13`, all matched
/// case-insensitively. The caller must answer any failure with an HTTP
/// error before touching the byte stream.
///
/// # Errors
///
/// Returns the [`HandshakeError`] variant naming the offending header.
pub fn accept(headers: &HeaderMap) -> Result<String, HandshakeError> {
    if !header_has_token(headers, "connection", "upgrade") {
        return Err(HandshakeError::BadHeader("Connection"));
    }
    let upgrade = header_str(headers, "upgrade");
    if !upgrade.trim().eq_ignore_ascii_case("websocket") {
        return Err(HandshakeError::BadHeader("Upgrade"));
    }
    let version = header_str(headers, "sec-websocket-version");
    if !version.contains("13") {
        return Err(HandshakeError::UnsupportedVersion(version.to_string()));
    }
    let key = header_str(headers, "sec-websocket-key");
    if key.trim().is_empty() {
        return Err(HandshakeError::MissingKey);
    }
    Ok(accept_key(key.trim()))
}

/// Returns the named header as a string, or `""` when absent or not
/// valid UTF-8.
fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> &'h str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

/// Returns `true` when the header's comma-separated token list contains
/// `token` case-insensitively. Browsers send values like
/// `keep-alive, Upgrade`, so a whole-value comparison is not enough.
fn header_has_token(headers: &HeaderMap, name: &str, token: &str) -> bool {
    header_str(headers, name)
        .split(',')
        .any(|part| part.trim().eq_ignore_ascii_case(token))
}

/// Generates a fresh random 16-byte nonce, base64-encoded, for the
/// client handshake. A new value per connection; the protocol's
/// anti-cache mechanism is worthless with a predictable key.
///
/// # Errors
///
/// Returns [`HandshakeError::KeyEntropy`] when the OS entropy source is
/// unavailable.
pub fn generate_key() -> Result<String, HandshakeError> {
    let mut nonce = [0u8; 16];
    getrandom::getrandom(&mut nonce)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(nonce))
}

/// Performs the client side of the opening handshake on a connected
/// stream: writes the GET upgrade request, checks that the status line
/// contains `101`, and consumes response headers through the terminating
/// blank line.
///
/// Header lines are read byte-at-a-time so nothing past the blank line
/// is consumed; the first frame the server sends stays on the stream.
///
/// # Errors
///
/// - [`HandshakeError::NotSwitchingProtocols`] when the server answers
///   with any other status.
/// - [`HandshakeError::Io`] on stream failure or an over-long header.
pub async fn client_handshake<S>(
    stream: &mut S,
    host: &str,
    path: &str,
) -> Result<(), HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let key = generate_key()?;
    let request = format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {key}\r\n\
         Sec-WebSocket-Version: 13\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await?;
    stream.flush().await?;

    let status_line = read_header_line(stream).await?;
    if !status_line.contains("101") {
        return Err(HandshakeError::NotSwitchingProtocols(
            status_line.trim().to_string(),
        ));
    }
    loop {
        let line = read_header_line(stream).await?;
        if line.trim().is_empty() {
            return Ok(());
        }
    }
}

/// Reads one CRLF-terminated header line without buffering past it.
async fn read_header_line<S>(stream: &mut S) -> Result<String, HandshakeError>
where
    S: AsyncRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        let byte = stream.read_u8().await?;
        if byte == b'\n' {
            return Ok(String::from_utf8_lossy(&line).into_owned());
        }
        line.push(byte);
        if line.len() > MAX_HEADER_LINE {
            return Err(HandshakeError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "handshake header line too long",
            )));
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn upgrade_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("connection", HeaderValue::from_static("Upgrade"));
        headers.insert("upgrade", HeaderValue::from_static("websocket"));
        headers.insert(
            "sec-websocket-key",
            HeaderValue::from_static("dGhlIHNhbXBsZSBub25jZQ=="),
        );
        headers.insert("sec-websocket-version", HeaderValue::from_static("13"));
        headers
    }

    #[test]
    fn accept_key_matches_rfc_worked_example() {
        // RFC 6455 section 1.3.
        assert_eq!(
            accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn conforming_request_is_accepted() {
        let Ok(key) = accept(&upgrade_headers()) else {
            panic!("conforming request rejected");
        };
        assert_eq!(key, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn header_values_match_case_insensitively() {
        let mut headers = upgrade_headers();
        headers.insert("connection", HeaderValue::from_static("upgrade"));
        headers.insert("upgrade", HeaderValue::from_static("WebSocket"));
        assert!(accept(&headers).is_ok());
    }

    #[test]
    fn browser_style_connection_token_list_is_accepted() {
        let mut headers = upgrade_headers();
        headers.insert(
            "connection",
            HeaderValue::from_static("keep-alive, Upgrade"),
        );
        assert!(accept(&headers).is_ok());
    }

    #[test]
    fn missing_version_is_rejected() {
        let mut headers = upgrade_headers();
        headers.remove("sec-websocket-version");
        match accept(&headers) {
            Err(HandshakeError::UnsupportedVersion(_)) => {}
            other => panic!("expected UnsupportedVersion, got {other:?}"),
        }
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut headers = upgrade_headers();
        headers.insert("sec-websocket-version", HeaderValue::from_static("8"));
        assert!(accept(&headers).is_err());
    }

    #[test]
    fn missing_key_is_rejected() {
        let mut headers = upgrade_headers();
        headers.insert("sec-websocket-key", HeaderValue::from_static(""));
        match accept(&headers) {
            Err(HandshakeError::MissingKey) => {}
            other => panic!("expected MissingKey, got {other:?}"),
        }
    }

    #[test]
    fn plain_get_is_rejected() {
        match accept(&HeaderMap::new()) {
            Err(HandshakeError::BadHeader("Connection")) => {}
            other => panic!("expected BadHeader, got {other:?}"),
        }
    }

    #[test]
    fn generated_keys_are_fresh_base64_nonces() {
        let Ok(a) = generate_key() else {
            panic!("entropy unavailable");
        };
        let Ok(b) = generate_key() else {
            panic!("entropy unavailable");
        };
        // 16 bytes base64-encode to 24 characters.
        assert_eq!(a.len(), 24);
        assert_ne!(a, b, "keys must not repeat across connections");
    }

    #[tokio::test]
    async fn client_handshake_exchanges_request_and_response() {
        let (mut client_end, mut server_end) = tokio::io::duplex(4096);

        let server = tokio::spawn(async move {
            let mut request: Vec<u8> = Vec::new();
            loop {
                let n = server_end.read_buf(&mut request).await.unwrap_or(0);
                if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let text = String::from_utf8_lossy(&request).into_owned();
            let _ = server_end
                .write_all(
                    b"HTTP/1.1 101 Switching Protocols\r\n\
                      Upgrade: websocket\r\n\
                      Connection: Upgrade\r\n\
                      Sec-WebSocket-Accept: x\r\n\r\nAFTER",
                )
                .await;
            (text, server_end)
        });

        let Ok(()) = client_handshake(&mut client_end, "example.test:8080", "/ws").await else {
            panic!("handshake failed");
        };

        let Ok((request, _server_end)) = server.await else {
            panic!("server task failed");
        };
        assert!(request.starts_with("GET /ws HTTP/1.1\r\n"));
        assert!(request.contains("Host: example.test:8080\r\n"));
        assert!(request.contains("Upgrade: websocket\r\n"));
        assert!(request.contains("Sec-WebSocket-Version: 13\r\n"));
        assert!(request.contains("Sec-WebSocket-Key: "));

        // Bytes after the blank line must still be on the stream.
        let mut after = [0u8; 5];
        let Ok(()) = client_end.read_exact(&mut after).await.map(|_| ()) else {
            panic!("post-handshake bytes were swallowed");
        };
        assert_eq!(&after, b"AFTER");
    }

    #[tokio::test]
    async fn non_101_response_is_rejected() {
        let (mut client_end, mut server_end) = tokio::io::duplex(4096);
        tokio::spawn(async move {
            let mut sink = vec![0u8; 1024];
            let _ = server_end.read(&mut sink).await;
            let _ = server_end
                .write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n")
                .await;
            server_end
        });

        match client_handshake(&mut client_end, "example.test", "/ws").await {
            Err(HandshakeError::NotSwitchingProtocols(status)) => {
                assert!(status.contains("400"));
            }
            other => panic!("expected NotSwitchingProtocols, got {other:?}"),
        }
    }
}
