use std::net::SocketAddr;
use std::sync::Arc;

use doc_search::api::{create_router, AppState, JobProducer};
use doc_search::infrastructure::{bootstrap, init_tracing, queue, AppConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Arc::new(AppConfig::load()?);
    init_tracing(&config.logging, "api=debug,doc_search=debug,tower_http=debug");

    let services = bootstrap::connect(&config).await?;
    info!(
        collection = %config.vector_store.collection,
        provider = ?config.embedding.provider,
        "services initialized"
    );

    let mut state = AppState::new(config.clone(), services);
    match config.redis.url.as_deref() {
        Some(url) => {
            let pool = queue::create_pool(url)?;
            state = state.with_job_producer(JobProducer::new(
                pool,
                config.worker.result_ttl_seconds,
            ));
            info!("Redis pool initialized");
        }
        None => warn!("REDIS_URL not set, background ingestion jobs disabled"),
    }

    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
