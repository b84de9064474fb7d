use tracing::info;

/// Initialize logging with tracing
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pico_rpc=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Log server startup
pub fn log_startup(addr: &str) {
    info!("pico-rpc server started");
    info!("Transport: HTTP (JSON-RPC 2.0 over POST)");
    info!("Address: {}", addr);
    info!("Ready to accept connections");
}

/// Log server shutdown
pub fn log_shutdown() {
    info!("pico-rpc server stopped");
}
