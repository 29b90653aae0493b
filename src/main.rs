use anyhow::Context;
use global_search::{
    api::{build_router, AppState},
    config::{BackendConfig, BackendKind, Config, ObservabilityConfig, ServerConfig},
    search::{ElasticsearchBackend, InMemoryBackend, SearchBackend, SearchExecutor},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        default_config()
    });

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "global_search={},tower_http=info",
            config.observability.log_level
        )
        .into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Global Search v{}", env!("CARGO_PKG_VERSION"));

    // Field catalog
    let catalog = Arc::new(
        config
            .catalog
            .clone()
            .into_catalog()
            .context("invalid field catalog")?,
    );
    tracing::info!("✅ Field catalog loaded ({} fields)", catalog.len());

    // Search backend
    let backend = create_backend(&config.backend)?;
    tracing::info!("✅ Search backend initialized: {}", backend.name());

    let executor = Arc::new(SearchExecutor::new(catalog, &config.search, backend));
    let state = AppState::new(executor);

    let app = build_router(state).layer(TimeoutLayer::new(Duration::from_secs(
        config.server.request_timeout_secs,
    )));

    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("failed to bind {}", http_addr))?;

    tracing::info!("🚀 HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Search API: http://{}/v1/search", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = http_handle => {
            tracing::warn!("HTTP server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

fn create_backend(config: &BackendConfig) -> anyhow::Result<Arc<dyn SearchBackend>> {
    let backend: Arc<dyn SearchBackend> = match config.kind {
        BackendKind::Elasticsearch => {
            tracing::info!("Backend: {} index {}", config.url, config.index);
            Arc::new(ElasticsearchBackend::new(config)?)
        }
        BackendKind::Memory => match &config.seed_path {
            Some(path) => {
                let backend = InMemoryBackend::from_file(path)?;
                tracing::info!("Loaded {} documents from {}", backend.len(), path.display());
                Arc::new(backend)
            }
            None => {
                tracing::warn!("⚠️  Memory backend has no seed_path, starting empty");
                Arc::new(InMemoryBackend::default())
            }
        },
    };
    Ok(backend)
}

fn default_config() -> Config {
    Config {
        server: ServerConfig {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
            request_timeout_secs: 30,
        },
        backend: BackendConfig::default(),
        search: Default::default(),
        catalog: Default::default(),
        observability: ObservabilityConfig {
            log_level: "info".to_string(),
            json_logs: false,
        },
    }
}
