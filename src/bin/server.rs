use log::{error, info, warn};
use std::sync::Arc;
use tokio::net::TcpListener;

use parley::config::ServerConfig;
use parley::core::server::ServerManager;
use parley::handlers::client::handle_client;

#[tokio::main]
async fn main() {
    // Initialize env
    match dotenvy::dotenv() {
        Ok(_) => info!("Environment variables loaded from .env file"),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    // Initialize logging
    env_logger::init();

    // Load config from the environment
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, idle_timeout={:?}",
        config.host, config.port, config.idle_timeout
    );

    // Create the server manager and start the stale-session sweep.
    // The sweep only reaps sessions well past the idle deadline; the
    // per-connection read timeout is the authoritative cleanup path.
    let server = Arc::new(ServerManager::new());
    server
        .clone()
        .start_cleanup_task(config.cleanup_interval, config.idle_timeout * 2);

    // Bind the listener
    let listener = match TcpListener::bind(config.listen_addr()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Server failed to start: {}", e);
            std::process::exit(1);
        }
    };

    info!("Parley server listening on {}", config.listen_addr());

    // Accept loop: one task per connection
    loop {
        match listener.accept().await {
            Ok((stream, remote_addr)) => {
                info!("New connection from {}", remote_addr);
                let server = server.clone();
                let config = config.clone();
                tokio::spawn(async move {
                    handle_client(stream, remote_addr, server, config).await;
                });
            }
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
            }
        }
    }
}
