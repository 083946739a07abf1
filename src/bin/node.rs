use anyhow::Result;
use fleet::*;
use std::sync::Arc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let node_config = config::NodeConfig::load()?;
    let service = Arc::new(node::NodeService::from_config(&node_config)?);
    match &node_config.classifier.predict_url {
        Some(url) => tracing::info!(predict_url = %url, "Using inference service"),
        None => tracing::info!("No inference service configured; using load threshold"),
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let simulation_handle = node::spawn_simulation(service.clone(), shutdown_rx);

    let app = routes::node_app(service);
    let addr = format!("{}:{}", node_config.server.host, node_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(node_id = %node_config.node.id, "Transformer running on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown::signal() => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            let _ = simulation_handle.await;
        }
    }

    Ok(())
}
