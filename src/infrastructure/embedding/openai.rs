use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::domain::{ports::EmbeddingProvider, DomainError, Embedding, ProviderError};
use crate::infrastructure::config::EmbeddingConfig;

/// Inputs per request accepted by the embeddings endpoint.
const MAX_BATCH_SIZE: usize = 2048;

/// Client for OpenAI-compatible `/embeddings` endpoints.
pub struct OpenAiEmbedding {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedding {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, DomainError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(DomainError::invalid_input("OpenAI API key must not be empty"));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: "https://api.openai.com/v1/embeddings".to_string(),
            api_key,
            model: model.into(),
            dimension,
        })
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, DomainError> {
        let api_key = config.api_key.clone().unwrap_or_default();
        Ok(Self::new(api_key, &config.model, config.dimension)?.with_base_url(&config.base_url))
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Only the `text-embedding-3` family accepts a requested output size.
    fn requested_dimensions(&self) -> Option<usize> {
        self.model
            .starts_with("text-embedding-3")
            .then_some(self.dimension)
    }

    fn request<'a>(&'a self, texts: &'a [String]) -> EmbeddingRequest<'a> {
        EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.requested_dimensions(),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Rate limits, timeouts and server-side failures are worth another attempt.
pub fn classify_status(status: StatusCode, detail: &str) -> ProviderError {
    let message = format!("API returned {status}: {detail}");
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        ProviderError::Transient(message)
    } else {
        ProviderError::Rejected(message)
    }
}

fn classify_transport(err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        ProviderError::transient(format!("request failed: {err}"))
    } else {
        ProviderError::rejected(format!("request failed: {err}"))
    }
}

/// A success status with a body that is not an embeddings response will not
/// improve on retry.
fn parse_body(body: &str, expected: usize) -> Result<Vec<Embedding>, ProviderError> {
    let parsed: EmbeddingResponse = serde_json::from_str(body).map_err(|e| {
        error!(error = %e, "failed to parse embedding response");
        ProviderError::rejected(format!("malformed embedding response: {e}"))
    })?;
    into_ordered(parsed.data, expected)
}

/// Puts response items back in request order; the API tags each with its input index.
fn into_ordered(
    mut data: Vec<EmbeddingData>,
    expected: usize,
) -> Result<Vec<Embedding>, ProviderError> {
    data.sort_by_key(|d| d.index);
    if data.len() != expected || data.iter().enumerate().any(|(i, d)| d.index != i) {
        return Err(ProviderError::rejected(format!(
            "response covered {} of {expected} inputs",
            data.len()
        )));
    }
    Ok(data.into_iter().map(|d| Embedding::new(d.embedding)).collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(batch_size = texts.len(), model = %self.model, "embedding batch");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request(texts))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "embedding request failed");
                classify_transport(&e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(%status, "embedding API error");
            return Err(classify_status(status, &detail));
        }

        let body = response.text().await.map_err(|e| {
            error!(error = %e, "failed to read embedding response");
            ProviderError::transient(format!("failed to read response: {e}"))
        })?;

        parse_body(&body, texts.len())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down").is_transient());
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, "").is_transient());
        assert!(classify_status(StatusCode::INTERNAL_SERVER_ERROR, "").is_transient());
        assert!(classify_status(StatusCode::REQUEST_TIMEOUT, "").is_transient());
        assert!(!classify_status(StatusCode::UNAUTHORIZED, "bad key").is_transient());
        assert!(!classify_status(StatusCode::BAD_REQUEST, "too long").is_transient());
    }

    #[test]
    fn test_response_reordered_by_index() {
        let data = vec![
            EmbeddingData {
                index: 1,
                embedding: vec![2.0],
            },
            EmbeddingData {
                index: 0,
                embedding: vec![1.0],
            },
        ];
        let ordered = into_ordered(data, 2).unwrap();
        assert_eq!(ordered[0].as_slice(), &[1.0]);
        assert_eq!(ordered[1].as_slice(), &[2.0]);
    }

    #[test]
    fn test_short_response_rejected() {
        let data = vec![EmbeddingData {
            index: 0,
            embedding: vec![1.0],
        }];
        assert!(matches!(
            into_ordered(data, 2),
            Err(ProviderError::Rejected(_))
        ));
    }

    #[test]
    fn test_malformed_success_body_is_rejected() {
        assert!(matches!(
            parse_body("<html>gateway</html>", 1),
            Err(ProviderError::Rejected(_))
        ));
        assert!(matches!(
            parse_body(r#"{"object": "list"}"#, 1),
            Err(ProviderError::Rejected(_))
        ));

        let ordered = parse_body(
            r#"{"data": [{"index": 0, "embedding": [0.5, 0.25]}]}"#,
            1,
        )
        .unwrap();
        assert_eq!(ordered[0].as_slice(), &[0.5, 0.25]);
    }

    #[test]
    fn test_dimensions_sent_for_v3_models_only() {
        let texts = vec!["hello".to_string()];

        let v3 = OpenAiEmbedding::new("sk-test", "text-embedding-3-large", 256).unwrap();
        let json = serde_json::to_value(v3.request(&texts)).unwrap();
        assert_eq!(json["dimensions"], 256);
        assert_eq!(json["model"], "text-embedding-3-large");

        let ada = OpenAiEmbedding::new("sk-test", "text-embedding-ada-002", 1536).unwrap();
        let json = serde_json::to_value(ada.request(&texts)).unwrap();
        assert!(json.get("dimensions").is_none());
        assert_eq!(json["input"][0], "hello");
    }

    #[test]
    fn test_requires_api_key() {
        assert!(OpenAiEmbedding::new("", "text-embedding-3-small", 1536).is_err());

        let provider = OpenAiEmbedding::new("sk-test", "text-embedding-3-small", 1536)
            .unwrap()
            .with_base_url("http://localhost:8000/v1/");
        assert_eq!(provider.endpoint, "http://localhost:8000/v1/embeddings");
        assert_eq!(provider.model(), "text-embedding-3-small");
    }
}
