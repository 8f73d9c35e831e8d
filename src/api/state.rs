use std::sync::Arc;

use crate::api::queue::JobProducer;
use crate::application::{Indexer, QueryService};
use crate::domain::ports::VectorStore;
use crate::infrastructure::{AppConfig, Services};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub indexer: Arc<Indexer>,
    pub query: Arc<QueryService>,
    pub vector_store: Arc<dyn VectorStore>,
    pub job_producer: Option<JobProducer>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, services: Services) -> Self {
        Self {
            config,
            indexer: services.indexer,
            query: services.query,
            vector_store: services.vector_store,
            job_producer: None,
        }
    }

    pub fn with_job_producer(mut self, producer: JobProducer) -> Self {
        self.job_producer = Some(producer);
        self
    }
}
