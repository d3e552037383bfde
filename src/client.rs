//! Dial-side driver for the hand-rolled WebSocket transport.
//!
//! Connects a TCP stream, runs the client half of the opening handshake,
//! and hands back the raw stream ready for frame traffic. The
//! interactive send/receive loops live in the `client` binary; this
//! module holds everything worth testing without a terminal.

use tokio::net::TcpStream;

use crate::error::HandshakeError;
use crate::ws::handshake;

/// Operator input that ends the client instead of being sent as a
/// message. Matched case-insensitively.
pub const QUIT_COMMAND: &str = "quit";

/// Connects to `addr` and completes the WebSocket handshake on `path`.
///
/// On success the returned stream carries nothing but frame traffic:
/// the handshake reader never consumes bytes past the response's blank
/// line.
///
/// # Errors
///
/// Returns [`HandshakeError::Io`] when the TCP connection fails and the
/// handshake's own errors when the server does not switch protocols.
pub async fn dial(addr: &str, path: &str) -> Result<TcpStream, HandshakeError> {
    let mut stream = TcpStream::connect(addr).await?;
    handshake::client_handshake(&mut stream, addr, path).await?;
    Ok(stream)
}

/// Returns `true` when an input line is the quit sentinel.
#[must_use]
pub fn is_quit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(QUIT_COMMAND)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::ws::frame::{DEFAULT_MAX_PAYLOAD, Opcode, read_frame, write_frame};
    use crate::ws::handshake::accept_key;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn quit_sentinel_is_case_insensitive() {
        assert!(is_quit("quit"));
        assert!(is_quit("QUIT"));
        assert!(is_quit("  Quit \n"));
        assert!(!is_quit("quit now"));
        assert!(!is_quit("hello"));
    }

    /// Minimal scripted server: accepts one connection, answers the
    /// handshake, echoes one frame back, for [`dial`] to run against.
    #[tokio::test]
    async fn dial_handshakes_and_leaves_a_clean_stream() {
        let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };

        tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut request: Vec<u8> = Vec::new();
            loop {
                let n = socket.read_buf(&mut request).await.unwrap_or(0);
                if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let text = String::from_utf8_lossy(&request).into_owned();
            let key = text
                .lines()
                .find_map(|line| line.strip_prefix("Sec-WebSocket-Key: "))
                .unwrap_or_default()
                .trim()
                .to_string();
            let response = format!(
                "HTTP/1.1 101 Switching Protocols\r\n\
                 Upgrade: websocket\r\n\
                 Connection: Upgrade\r\n\
                 Sec-WebSocket-Accept: {}\r\n\r\n",
                accept_key(&key)
            );
            let _ = socket.write_all(response.as_bytes()).await;

            // Echo one frame so the test can prove the stream is clean.
            if let Ok(frame) = read_frame(&mut socket, DEFAULT_MAX_PAYLOAD).await {
                let _ = write_frame(&mut socket, frame.opcode, &frame.payload).await;
            }
        });

        let Ok(mut stream) = dial(&addr.to_string(), "/ws").await else {
            panic!("dial failed");
        };
        let Ok(()) = write_frame(&mut stream, Opcode::Text, b"ping").await else {
            panic!("frame write failed");
        };
        let Ok(echo) = read_frame(&mut stream, DEFAULT_MAX_PAYLOAD).await else {
            panic!("no echo frame");
        };
        assert_eq!(echo.payload, b"ping");
    }

    #[tokio::test]
    async fn dial_rejects_non_switching_server() {
        let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };

        tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut sink = vec![0u8; 1024];
            let _ = socket.read(&mut sink).await;
            let _ = socket
                .write_all(b"HTTP/1.1 404 Not Found\r\n\r\n")
                .await;
        });

        match dial(&addr.to_string(), "/ws").await {
            Err(HandshakeError::NotSwitchingProtocols(status)) => {
                assert!(status.contains("404"));
            }
            other => panic!("expected NotSwitchingProtocols, got {other:?}"),
        }
    }
}
