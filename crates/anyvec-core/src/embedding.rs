//! Embedding model trait

use async_trait::async_trait;

use crate::Result;

/// Trait for embedding models (e.g. OpenAI, WatsonX, local ONNX, etc.)
///
/// Converts text into a fixed-length numeric vector. Implementations are
/// external collaborators; connectors only call `embed` when a document or
/// query arrives without a precomputed vector.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed a piece of text into a vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// The fixed output dimension of this model
    fn dimension(&self) -> usize;
}
