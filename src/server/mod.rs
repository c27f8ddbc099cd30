//! HTTP server for the ranking API.
//!
//! `POST /api/rank` resolves and ranks a request, remembering the result per
//! session; `POST /api/export` writes that session's last ranking to CSV.

pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Routes wrapped in the permissive CORS and request tracing layers.
pub fn app(state: Arc<AppState>) -> Router {
    create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Serve the ranking API on `0.0.0.0:port` until `shutdown_signal` resolves.
///
/// # Errors
/// Returns an error if the port cannot be bound or serving fails.
pub async fn serve<F>(
    state: Arc<AppState>,
    port: u16,
    shutdown_signal: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        "Equity ranker listening on http://{addr} ({} sessions max)",
        state.session_capacity()
    );

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal)
        .await?;
    Ok(())
}
