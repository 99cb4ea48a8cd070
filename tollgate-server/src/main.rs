use anyhow::Result;
use std::sync::Arc;

use tollgate_server::config::Config;
use tollgate_server::metrics::Metrics;
use tollgate_server::transport::{AppState, Transport, http::HttpTransport};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration from environment variables and CLI arguments
    let config = Config::from_env_and_args()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("tollgate={}", config.log_level).parse()?)
                .add_directive(format!("tollgate_server={}", config.log_level).parse()?),
        )
        .init();

    let gate = config.build_gate()?;
    let metrics = Arc::new(Metrics::new());

    // Idle buckets are swept in the background; each sweep refreshes the store metrics
    let sweep_metrics = Arc::clone(&metrics);
    let evictor = gate
        .evictor()
        .spawn_with(move |report| sweep_metrics.record_sweep(report));

    tracing::info!(
        "Tollgate server started: capacity {}, refill {} every {:?}",
        config.gate.capacity,
        config.gate.refill_amount,
        config.gate.refill_interval
    );
    tracing::info!(
        "Eviction TTL: {:?}, sweep interval: {:?}, shards: {}",
        config.gate.eviction_ttl,
        config.gate.sweep_interval,
        gate.store().shard_count()
    );

    let state = AppState {
        gate,
        metrics,
        identity_field: config.identity.field.clone(),
        trust_proxy_headers: config.identity.trust_proxy_headers,
    };

    let transport = HttpTransport::new(&config.http.host, config.http.port);
    let result = tokio::select! {
        result = transport.start(state) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!("HTTP transport failed: {}", e);
    }

    evictor.shutdown().await;

    result
}
