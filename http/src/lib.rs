//! Scrape endpoint of the exporter.
//!
//! Serves the shared [`MetricRegistry`] in the Prometheus text exposition format. Handlers only
//! read the registry; they never trigger a refresh, so a scrape is answered from whatever
//! snapshot each family currently holds.

#[macro_use]
extern crate tracing;

pub mod error;
pub mod router;

use sapawarga_exporter_collector::MetricRegistry;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Serves the export surface on `listener` until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    registry: MetricRegistry,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(address) = listener.local_addr() {
        info!("Serving metrics on http://{address}/metrics");
    }

    let app = router::create_router(registry);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Metrics server stopped");
    Ok(())
}
