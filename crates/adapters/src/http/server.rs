use std::future::Future;
use std::sync::Arc;

use super::router::build_router;
use super::state::AppState;

/// Run the HTTP server on the given listen address.
///
/// Returns an error if the address cannot be bound; otherwise serves until
/// `shutdown` resolves, draining in-flight connections before returning.
pub async fn run_http_server(
    state: Arc<AppState>,
    endpoint: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(endpoint).await?;
    tracing::info!(%endpoint, "audit log ingest server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
