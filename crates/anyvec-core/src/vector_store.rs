//! Vector store trait and search request types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{Document, ScoredDocument};
use crate::filter::Filter;
use crate::Result;

/// A similarity search request
///
/// When `query_vector` is absent the store embeds `query` through its
/// embedding model. The similarity threshold, when set, drops hits scoring
/// below it; backends without a native cutoff apply it client-side, so fewer
/// than `top_k` results may come back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub query_vector: Option<Vec<f32>>,
    pub top_k: usize,
    pub similarity_threshold: Option<f32>,
    pub filter: Option<Filter>,
}

impl SearchRequest {
    /// Create a request with defaults (top_k = 5, no threshold, no filter)
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            query_vector: None,
            top_k: 5,
            similarity_threshold: None,
            filter: None,
        }
    }

    pub fn with_query_vector(mut self, vector: Vec<f32>) -> Self {
        self.query_vector = Some(vector);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self::new("")
    }
}

/// Trait for vector stores (e.g. Typesense, Qdrant, etc.)
///
/// This trait defines the portable interface for vector store connectors.
/// Implementations hold no document cache; the backend collection is the
/// system of record. All operations are safe for concurrent callers once
/// `connect` has completed.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Initialize the store: ensure the backend collection schema exists
    async fn connect(&mut self) -> Result<()>;

    /// Ingest documents in batches, returning the stored ids
    ///
    /// Per-record failures do not abort later batches; when any record fails
    /// the call returns `Error::PartialIngestion` enumerating every failed
    /// document id with its reason.
    async fn add(&self, documents: Vec<Document>) -> Result<Vec<String>>;

    /// Delete documents by id
    async fn delete(&self, ids: Vec<String>) -> Result<()>;

    /// Similarity search, results ordered by descending similarity
    async fn similarity_search(&self, request: SearchRequest) -> Result<Vec<ScoredDocument>>;
}
