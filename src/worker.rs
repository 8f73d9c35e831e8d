use deadpool_redis::redis::AsyncCommands;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

use doc_search::application::Indexer;
use doc_search::infrastructure::{
    bootstrap, init_tracing, queue, queues, AppConfig, QueueError, RedisPool,
};

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Worker pool closed: {0}")]
    Closed(String),
}

pub type Result<T> = std::result::Result<T, WorkerError>;

pub struct WorkerState {
    pub redis_pool: RedisPool,
    pub indexer: Arc<Indexer>,
    pub result_ttl_seconds: u64,
}

pub struct JobConsumer {
    state: Arc<WorkerState>,
    concurrency: usize,
}

impl JobConsumer {
    pub fn new(state: WorkerState, concurrency: usize) -> Self {
        Self {
            state: Arc::new(state),
            concurrency: concurrency.max(1),
        }
    }

    pub async fn start(&self) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        info!(concurrency = self.concurrency, "consumer started");

        loop {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| WorkerError::Closed(e.to_string()))?;
            let state = self.state.clone();

            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = process_next_job(&state).await {
                    error!(error = %e, "job failed");
                }
            });

            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        }
    }
}

async fn process_next_job(state: &WorkerState) -> Result<()> {
    let mut conn = queue::connection(&state.redis_pool).await?;

    let popped: Option<(String, String)> = conn
        .brpop(queues::INGEST_QUEUE, 1.0)
        .await
        .map_err(|e| WorkerError::Redis(e.to_string()))?;

    let Some((_, payload)) = popped else {
        return Ok(());
    };

    queue::process_ingest_payload(&mut conn, &state.indexer, &payload, state.result_ttl_seconds)
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config.logging, "worker=debug,doc_search=debug");

    let redis_url = config
        .redis
        .url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("REDIS_URL must be set for the worker"))?;
    let redis_pool = queue::create_pool(redis_url)?;
    info!("Redis connected");

    let services = bootstrap::connect(&config).await?;
    info!(collection = %config.vector_store.collection, "Qdrant connected");

    let state = WorkerState {
        redis_pool,
        indexer: services.indexer,
        result_ttl_seconds: config.worker.result_ttl_seconds,
    };
    let consumer = JobConsumer::new(state, config.worker.concurrency);

    info!(concurrency = config.worker.concurrency, "worker started");
    tokio::select! {
        result = consumer.start() => result?,
        _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
    }

    Ok(())
}
