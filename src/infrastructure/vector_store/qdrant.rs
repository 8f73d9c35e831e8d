use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, DeletePointsBuilder,
    Distance, FieldType, Filter, PointStruct, Range, ScoredPoint, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant, QdrantError};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::{
    ports::VectorStore, DomainError, Embedding, MetadataFilter, MetadataValue, RecordPayload,
    VectorMatch, VectorRecord,
};
use crate::infrastructure::config::VectorStoreConfig;

pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
    timeout: Duration,
}

impl QdrantVectorStore {
    pub async fn connect(config: &VectorStoreConfig, dimension: usize) -> Result<Self, DomainError> {
        let client = Qdrant::from_url(&config.url)
            .api_key(config.api_key.clone())
            .build()
            .map_err(|e| DomainError::store_unavailable(e.to_string()))?;

        let store = Self {
            client,
            collection: config.collection.clone(),
            dimension,
            timeout: config.timeout(),
        };

        store.ensure_collection().await?;

        Ok(store)
    }

    async fn ensure_collection(&self) -> Result<(), DomainError> {
        let collections = self
            .call("list collections", self.client.list_collections())
            .await?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            self.call(
                "create collection",
                self.client.create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                ),
            )
            .await?;

            self.call(
                "create document_id index",
                self.client.create_field_index(CreateFieldIndexCollectionBuilder::new(
                    &self.collection,
                    "document_id",
                    FieldType::Keyword,
                )),
            )
            .await?;

            info!(collection = %self.collection, dimension = self.dimension, "created collection");
        }

        Ok(())
    }

    /// Runs one client call under the configured deadline.
    async fn call<T>(
        &self,
        op: &str,
        fut: impl Future<Output = Result<T, QdrantError>>,
    ) -> Result<T, DomainError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(DomainError::store_unavailable(format!("{op}: {e}"))),
            Err(_) => Err(DomainError::store_unavailable(format!(
                "{op} timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

/// Qdrant ids must be integers or UUIDs, so chunk ids map to a stable UUIDv5.
pub fn point_id(chunk_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_bytes()).to_string()
}

fn to_point(record: &VectorRecord) -> Result<PointStruct, DomainError> {
    let mut json = serde_json::to_value(&record.payload)
        .map_err(|e| DomainError::internal(format!("Failed to encode payload: {e}")))?;
    if let Some(map) = json.as_object_mut() {
        map.insert("chunk_id".into(), record.chunk_id.clone().into());
    }

    let payload: Payload = json
        .try_into()
        .map_err(|_| DomainError::internal("Failed to create payload"))?;

    Ok(PointStruct::new(
        point_id(&record.chunk_id),
        record.vector.as_slice().to_vec(),
        payload,
    ))
}

fn to_json(value: &QdrantValue) -> serde_json::Value {
    use serde_json::Value as Json;

    match &value.kind {
        None | Some(Kind::NullValue(_)) => Json::Null,
        Some(Kind::BoolValue(b)) => Json::Bool(*b),
        Some(Kind::IntegerValue(i)) => Json::from(*i),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(*d)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Some(Kind::StringValue(s)) => Json::String(s.clone()),
        Some(Kind::ListValue(list)) => Json::Array(list.values.iter().map(to_json).collect()),
        Some(Kind::StructValue(s)) => Json::Object(
            s.fields
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        ),
    }
}

fn to_match(point: ScoredPoint) -> VectorMatch {
    let fields: serde_json::Map<String, serde_json::Value> = point
        .payload
        .iter()
        .map(|(k, v)| (k.clone(), to_json(v)))
        .collect();

    let chunk_id = fields
        .get("chunk_id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| {
            point
                .id
                .as_ref()
                .and_then(|pid| match &pid.point_id_options {
                    Some(PointIdOptions::Uuid(s)) => Some(s.clone()),
                    Some(PointIdOptions::Num(n)) => Some(n.to_string()),
                    None => None,
                })
        })
        .unwrap_or_default();

    let payload = serde_json::from_value::<RecordPayload>(serde_json::Value::Object(fields)).ok();

    VectorMatch {
        chunk_id,
        score: point.score,
        payload,
    }
}

fn to_condition(key: &str, value: &MetadataValue) -> Condition {
    let field = format!("metadata.{key}");
    match value {
        MetadataValue::String(s) => Condition::matches(field, s.clone()),
        MetadataValue::Integer(i) => Condition::matches(field, *i),
        MetadataValue::Bool(b) => Condition::matches(field, *b),
        MetadataValue::Float(f) => Condition::range(
            field,
            Range {
                gte: Some(*f),
                lte: Some(*f),
                ..Default::default()
            },
        ),
    }
}

pub fn to_filter(filter: &MetadataFilter) -> Filter {
    Filter::must(filter.iter().map(|(k, v)| to_condition(k, v)))
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), DomainError> {
        if records.is_empty() {
            return Ok(());
        }

        let points = records
            .iter()
            .map(to_point)
            .collect::<Result<Vec<_>, _>>()?;

        self.call(
            "upsert",
            self.client
                .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true)),
        )
        .await?;

        debug!(collection = %self.collection, "upserted points");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_by_document(&self, document_id: &str) -> Result<(), DomainError> {
        let filter = Filter::must([Condition::matches("document_id", document_id.to_string())]);

        self.call(
            "delete",
            self.client.delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(filter)
                    .wait(true),
            ),
        )
        .await?;

        Ok(())
    }

    #[instrument(skip(self, vector, filter))]
    async fn query(
        &self,
        vector: &Embedding,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorMatch>, DomainError> {
        let mut request =
            SearchPointsBuilder::new(&self.collection, vector.as_slice().to_vec(), top_k as u64)
                .with_payload(true);
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            request = request.filter(to_filter(filter));
        }

        let response = self.call("search", self.client.search_points(request)).await?;

        Ok(response.result.into_iter().map(to_match).collect())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        self.call("health check", self.client.health_check())
            .await
            .map(|_| ())
    }
}
