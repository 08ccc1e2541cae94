use async_trait::async_trait;

use crate::{domain::entities::entity_point::Embeddings, helper::error_chain_fmt};

/// Capability to turn text into a fixed-dimension embedding vector.
///
/// Implementations hold a long-lived model handle built once at process
/// start and shared across requests.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Dimension D of every vector produced by this embedder
    fn dimension(&self) -> usize;

    /// Embeds a single text.
    ///
    /// Empty or whitespace-only text yields the zero vector of length D,
    /// never an error: it is the sentinel for "no content".
    async fn embed(&self, text: &str) -> Result<Embeddings, EmbedderError>;

    /// Embeds several texts in one call. Empty items follow the same
    /// zero-vector rule as `embed`.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embeddings>, EmbedderError>;
}

#[derive(thiserror::Error)]
pub enum EmbedderError {
    #[error("Embedding backend unavailable: {0}")]
    Unavailable(String),
}

impl std::fmt::Debug for EmbedderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
