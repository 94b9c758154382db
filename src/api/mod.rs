//! HTTP front end: `POST /check_patient/` and `GET /health`.

pub mod handlers;
pub mod routes;
pub mod state;
pub mod types;

use std::net::SocketAddr;

use tokio::net::TcpListener;

pub use routes::create_router;
pub use state::AppState;

/// Serve the API until Ctrl+C.
///
/// # Errors
/// Returns an I/O error if the address cannot be bound or the server fails.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let app = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("API server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
