//! Server configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`) with sensible defaults.

use std::net::SocketAddr;

/// Top-level server configuration.
///
/// Loaded once at startup via [`ServerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// Timeout in seconds applied to HTTP requests before upgrade.
    /// Upgraded WebSocket streams are exempt; idle chat connections are
    /// not reaped.
    pub request_timeout_secs: u64,

    /// Cap on a single inbound frame payload in bytes.
    pub max_frame_bytes: usize,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set. Calls
    /// `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()?;

        let request_timeout_secs = parse_env("REQUEST_TIMEOUT_SECS", 5);
        let max_frame_bytes = parse_env("WS_MAX_FRAME_BYTES", crate::ws::frame::DEFAULT_MAX_PAYLOAD);

        Ok(Self {
            listen_addr,
            request_timeout_secs,
            max_frame_bytes,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
