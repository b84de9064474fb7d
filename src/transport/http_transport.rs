use crate::rpc::{RpcServer, SmdDocument};
use crate::transport::shutdown::{ShutdownCoordinator, wait_for_shutdown};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::any,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, trace};

/// HTTP transport layer for the RPC server: a single endpoint at the root
/// path. POST bodies run the dispatch pipeline; every other HTTP method
/// receives the service description document.
///
/// Example usage:
/// ```rust,no_run
/// use pico_rpc::rpc::{RpcServer, register_default_handlers};
/// use pico_rpc::transport::HttpTransport;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let server = Arc::new(RpcServer::new());
///     register_default_handlers(&server).await;
///
///     HttpTransport::new(server).serve("127.0.0.1:3000").await?;
///     Ok(())
/// }
/// ```
pub struct HttpTransport {
    server: Arc<RpcServer>,
}

impl HttpTransport {
    pub fn new(server: Arc<RpcServer>) -> Self {
        Self { server }
    }

    /// Create the axum router.
    pub fn router(self) -> Router {
        let state = Arc::new(self);

        Router::new()
            .route("/", any(root_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Start the HTTP server.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("RPC server listening on http://{}/", addr);

        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    /// Start the HTTP server and run until `coordinator` broadcasts
    /// shutdown; in-flight requests finish before the listener closes.
    pub async fn serve_with_shutdown(
        self,
        addr: &str,
        coordinator: &ShutdownCoordinator,
    ) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("RPC server listening on http://{}/", addr);

        let shutdown_rx = coordinator.subscribe();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
            .await?;
        Ok(())
    }
}

/// Root endpoint for all HTTP methods.
async fn root_handler(
    State(transport): State<Arc<HttpTransport>>,
    method: Method,
    body: Bytes,
) -> Response {
    trace!("accepted {} request", method);

    if method == Method::POST {
        let response = transport.server.handle_slice(&body).await;
        return json_response(&response);
    }

    let smd = SmdDocument::from_registry(transport.server.registry(), "/").await;
    json_response(&smd)
}

/// Protocol outcomes always ride an HTTP 200; errors live inside the
/// JSON-RPC envelope, not in the status code.
fn json_response<T: Serialize>(value: &T) -> Response {
    (StatusCode::OK, [(header::ALLOW, "POST")], Json(value)).into_response()
}
