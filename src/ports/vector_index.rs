use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    domain::entities::{
        entity_kind::EntityKind,
        entity_point::{Embeddings, EntityPointPayload},
        search_hit::SearchHit,
    },
    helper::error_chain_fmt,
};

/// Capability to store embedding vectors and run k-nearest-neighbor
/// searches with payload filtering.
///
/// The exclusion predicate is pushed into the index query, before the
/// top-k cut. A post-hoc scan over a fixed-size top-k would silently
/// return fewer than `limit` results whenever excluded ids appear in the
/// naive top-k, so implementations must not do that.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Creates the collection for `kind` if it does not exist yet
    /// (cosine distance). Idempotent.
    async fn ensure_collection(&self, kind: EntityKind) -> Result<(), VectorIndexError>;

    async fn upsert_point(
        &self,
        kind: EntityKind,
        point_id: Uuid,
        vector: Embeddings,
        payload: EntityPointPayload,
    ) -> Result<(), VectorIndexError>;

    /// Returns up to `limit` hits ordered by descending similarity score,
    /// with every point whose entity id is in `exclude_ids` filtered out
    /// by a must-not-match predicate over the kind's payload id key.
    async fn search(
        &self,
        kind: EntityKind,
        vector: Embeddings,
        limit: u64,
        exclude_ids: &[String],
    ) -> Result<Vec<SearchHit>, VectorIndexError>;

    /// Deletes every point whose payload id key matches `entity_id`.
    /// Deleting an entity that was never indexed is a no-op, not an error.
    async fn delete(&self, kind: EntityKind, entity_id: &str) -> Result<(), VectorIndexError>;

    async fn count(&self, kind: EntityKind) -> Result<u64, VectorIndexError>;
}

#[derive(thiserror::Error)]
pub enum VectorIndexError {
    #[error("Error from the vector index: {0}")]
    Unavailable(String),

    #[error("Error from the vector index configuration: {0}")]
    Configuration(String),
}

impl std::fmt::Debug for VectorIndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
