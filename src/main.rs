use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use eventopia::config::EventopiaConfig;
use eventopia::pipeline::EventPipeline;
use eventopia::providers::{
    EventSearchProvider, GeminiClient, GenerativeTextProvider, GeocodingProvider, IpApiClient,
    SerpApiClient,
};
use eventopia::store::{DocumentStore, PersistentStore};
use eventopia::web;

fn init_tracing(config: &EventopiaConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn expand_store_path(location: &str) -> PathBuf {
    if let Some(rest) = location.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(location)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = EventopiaConfig::load().context("Failed to load configuration")?;
    init_tracing(&config);
    config.require_credentials()?;

    let serpapi = Arc::new(SerpApiClient::new(&config)?);
    let gemini: Arc<dyn GenerativeTextProvider> = Arc::new(GeminiClient::new(&config)?);
    let ip_location = Arc::new(IpApiClient::new()?);

    let store_path = expand_store_path(&config.store.location);
    let store: Arc<dyn DocumentStore> = Arc::new(
        PersistentStore::open(&store_path)
            .with_context(|| format!("Failed to open document store at {}", store_path.display()))?,
    );

    let pipeline = Arc::new(EventPipeline::new(
        &config,
        Arc::clone(&serpapi) as Arc<dyn EventSearchProvider>,
        serpapi as Arc<dyn GeocodingProvider>,
        gemini,
        ip_location,
        store,
    ));

    web::run(config.server.port, pipeline).await
}
