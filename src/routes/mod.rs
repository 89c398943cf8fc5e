//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One origin serves both the realtime channel at `/ws` and the static
//! client bundle for every other path. There is no REST surface beyond the
//! health check.

pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let bundle = ServeDir::new(&state.config.static_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .fallback_service(bundle)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
