use bom_enricher::{
    api::{build_router, AppState},
    config::Config,
    httpclient::ResilientHttpClient,
    pipeline::{ApiEnhancer, PipelineOrchestrator, QualityScorer, RuleBasedNormalizer},
    progress::ProgressBroadcaster,
    service::EnrichmentService,
    storage::create_store,
    suppliers::{HttpSupplierAdapter, SupplierAggregator, SupplierRegistry},
};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Component enrichment pipeline service
#[derive(Debug, Parser)]
#[command(name = "bom-enricher", version, about)]
struct Args {
    /// Configuration file path (overrides CONFIG_PATH)
    #[arg(long, env = "CONFIG_PATH")]
    config: Option<String>,

    /// Listen address override, e.g. 127.0.0.1:9090
    #[arg(long)]
    listen: Option<String>,

    /// Tracing filter override, e.g. bom_enricher=debug
    #[arg(long)]
    log_filter: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(ref path) = args.config {
        std::env::set_var("CONFIG_PATH", path);
    }

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(1);
    });

    // Initialize tracing
    let default_filter = args
        .log_filter
        .clone()
        .unwrap_or_else(|| config.observability.log_filter.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting BOM Enricher v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = bom_enricher::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("✅ Prometheus metrics initialized");
        }
    }

    // Initialize storage backend
    tracing::info!("Storage backend: {:?}", config.storage.backend);
    let store = create_store(&config.storage)?;
    tracing::info!("✅ Catalog store initialized");

    // Shared outbound HTTP client
    let http_client = ResilientHttpClient::new(config.http_client.clone())?;

    // Supplier registry from configuration
    let mut registry = SupplierRegistry::new();
    for entry in &config.suppliers.adapters {
        registry.register(Arc::new(HttpSupplierAdapter::new(
            entry.name.clone(),
            entry.base_url.clone(),
            entry.priority,
            entry.timeout_ms,
            http_client.clone(),
        )));
    }
    registry.sort_by_priority();
    tracing::info!("✅ {} supplier adapters registered", registry.len());
    let registry = Arc::new(registry);

    let aggregator = Arc::new(SupplierAggregator::new(
        Arc::clone(&registry),
        config.suppliers.aggregator.clone(),
    ));

    // AI enhancer, when configured
    let enhancer = match (&config.ai.endpoint, config.ai.enabled) {
        (Some(endpoint), true) => {
            tracing::info!(endpoint = %endpoint, "✅ AI enhancement enabled");
            Some(Arc::new(ApiEnhancer::new(
                endpoint.clone(),
                config.ai.timeout_secs,
                http_client.clone(),
            )) as Arc<dyn bom_enricher::pipeline::Enhancer>)
        }
        _ => {
            tracing::info!("⚠️  AI enhancement disabled");
            None
        }
    };

    // Progress broadcaster and orchestrator
    let broadcaster = Arc::new(ProgressBroadcaster::new(config.broadcaster.clone()));
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        Arc::new(RuleBasedNormalizer::new()),
        Arc::clone(&aggregator),
        enhancer,
        QualityScorer::new(config.pipeline.quality.clone()),
        store.clone(),
        Arc::clone(&broadcaster),
        config.pipeline.clone(),
    ));

    // Worker pool
    let service = EnrichmentService::new(
        orchestrator,
        aggregator,
        Arc::clone(&broadcaster),
        config.pipeline.worker_count,
        config.pipeline.queue_size,
    );
    tracing::info!(
        "✅ Enrichment service started with {} workers",
        config.pipeline.worker_count
    );

    // HTTP server
    let state = AppState::new(service, store, broadcaster)
        .with_prometheus(config.observability.prometheus_enabled);
    let router = build_router(state);

    let listen_addr = args
        .listen
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!("🚀 Listening on {}", listen_addr);

    axum::serve(listener, router).await?;

    Ok(())
}
