use tracing_subscriber::EnvFilter;

use inkroom::config::ServerConfig;
use inkroom::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env().expect("invalid server configuration");
    let addr = config.socket_addr();
    let static_dir = config.static_dir.display().to_string();

    let state = AppState::new(config);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");

    tracing::info!(%addr, %static_dir, "inkroom listening");
    inkroom::serve(listener, state).await.expect("server failed");
}
