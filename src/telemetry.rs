use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins over the configured filter.
pub fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

#[cfg(feature = "metrics-exporter")]
pub fn init_metrics(listen: SocketAddr) -> anyhow::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    PrometheusBuilder::new().with_http_listener(listen).install()?;

    tracing::info!("prometheus exporter listening on http://{listen}/metrics");
    metrics::gauge!("bullion_up").set(1.0);
    Ok(())
}

#[cfg(not(feature = "metrics-exporter"))]
pub fn init_metrics(_listen: SocketAddr) -> anyhow::Result<()> {
    Ok(())
}
