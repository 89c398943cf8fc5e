//! Realtime shared drawing rooms over websockets.
//!
//! SYSTEM CONTEXT
//! ==============
//! Clients join a room, stream stroke intents, and receive every other
//! member's strokes, cursors, and room-wide undo/redo. The server keeps the
//! authoritative history per room in memory only; a room and its drawing
//! disappear when the last member leaves.

pub mod config;
pub mod routes;
pub mod services;
pub mod state;

use tokio::net::TcpListener;

/// Serve the full application on an already-bound listener until it fails.
///
/// # Errors
///
/// Returns the I/O error that stopped the accept loop.
pub async fn serve(listener: TcpListener, state: state::AppState) -> std::io::Result<()> {
    axum::serve(listener, routes::app(state)).await
}
