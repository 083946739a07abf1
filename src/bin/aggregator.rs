use anyhow::Result;
use fleet::*;
use std::sync::Arc;
use tokio::sync::broadcast;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let app_config = config::AggregatorConfig::load()?;
    let (report_tx, _) =
        broadcast::channel::<models::FleetReport>(app_config.publishing.broadcast_capacity);
    let poller = Arc::new(aggregator::Aggregator::from_config(&app_config)?);
    tracing::info!(nodes = app_config.nodes.len(), "Loaded transformer registry");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let poll_handle = aggregator::spawn(poller.clone(), report_tx.clone(), shutdown_rx);

    let app = routes::aggregator_app(poller, report_tx);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Central server running on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown::signal() => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            let _ = poll_handle.await;
        }
    }

    Ok(())
}
