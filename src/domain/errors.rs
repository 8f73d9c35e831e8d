use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Embedding provider rejected the request: {0}")]
    ProviderRejected(String),

    #[error("Embedding provider unavailable after {attempts} attempts: {message}")]
    ProviderUnavailable { attempts: u32, message: String },

    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Ingest of document {document_id} failed after {records_written} records were written: {source}")]
    PartialIngestFailure {
        document_id: String,
        records_written: usize,
        #[source]
        source: Box<DomainError>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    pub fn provider_rejected(msg: impl Into<String>) -> Self {
        Self::ProviderRejected(msg.into())
    }

    pub fn provider_unavailable(attempts: u32, msg: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            attempts,
            message: msg.into(),
        }
    }

    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn partial_ingest(
        document_id: impl Into<String>,
        records_written: usize,
        source: DomainError,
    ) -> Self {
        Self::PartialIngestFailure {
            document_id: document_id.into(),
            records_written,
            source: Box::new(source),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Records committed before the failure, for errors that carry that count.
    pub fn records_written(&self) -> Option<usize> {
        match self {
            Self::PartialIngestFailure {
                records_written, ..
            } => Some(*records_written),
            _ => None,
        }
    }
}

/// Failure classification reported by an embedding provider for one call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Rate limiting, timeouts, 5xx and network errors. Worth retrying.
    #[error("transient provider failure: {0}")]
    Transient(String),

    /// Invalid input, auth failures and other non-retryable responses.
    #[error("provider rejected request: {0}")]
    Rejected(String),
}

impl ProviderError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
