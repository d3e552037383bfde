//! Plain HTTP surface next to the WebSocket endpoint.
//!
//! Only system routes live here; everything interesting happens on `/ws`.

pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Builds the router for the plain HTTP endpoints.
pub fn build_router() -> Router<AppState> {
    system::routes()
}
