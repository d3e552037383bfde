//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::ws::hub::Hub;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Registry of open chat sessions.
    pub hub: Arc<Hub>,
    /// Server configuration loaded at startup.
    pub config: ServerConfig,
}
