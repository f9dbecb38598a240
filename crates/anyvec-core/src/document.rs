//! Document model shared by all connectors

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A document stored in (or retrieved from) a vector store
///
/// Metadata values are scalars (string, number, bool) or string arrays.
/// An absent id is generated by the connector at write time. The embedding,
/// when absent, is computed from `content` by the configured embedding model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    /// Create a document with content only
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            metadata: Map::new(),
            embedding: None,
        }
    }

    /// Set an explicit document id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach a metadata key/value pair
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach a precomputed embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// A search hit: a reconstructed document plus its similarity score in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}
