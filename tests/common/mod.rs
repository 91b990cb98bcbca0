//! Shared utilities for integration testing.

use std::net::SocketAddr;

use switchback::{App, EngineConfig, Server, Shutdown};

/// Config suitable for tests: ephemeral port, short drain.
pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.server.bind_address = "127.0.0.1:0".to_string();
    config.server.shutdown_grace_secs = 2;
    config
}

/// Bind and serve `app` in the background.
///
/// Binding happens before this returns, so the address is immediately
/// connectable. Trigger the returned [`Shutdown`] to stop the server.
pub async fn spawn_server(app: App) -> (SocketAddr, Shutdown) {
    let server = Server::bind(app).await.expect("bind test server");
    let addr = server.local_addr();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.serve(rx).await;
    });
    (addr, shutdown)
}

#[allow(dead_code)]
pub fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{addr}{path}")
}
