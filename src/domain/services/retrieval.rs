use std::sync::Arc;

use tracing::debug;

use crate::{
    domain::entities::{entity_kind::EntityKind, search_hit::SearchHit},
    helper::error_chain_fmt,
    ports::{
        embedder::{Embedder, EmbedderError},
        record_store::{RecordStore, RecordStoreError},
        vector_index::{VectorIndex, VectorIndexError},
    },
};

/// Overfetch factor for searches that push an exclude-self/following filter:
/// requesting more candidates keeps the filter from starving the result count
const EXCLUSION_OVERFETCH_FACTOR: u64 = 2;

/// Turns a subject entity or a free-text query into a ranked, filtered list
/// of candidate entity ids.
///
/// Ordering is whatever the vector index returned (descending similarity);
/// the engine only truncates, it never re-sorts.
pub struct RetrievalEngine {
    embedder: Arc<dyn Embedder>,
    vector_index: Arc<dyn VectorIndex>,
    record_store: Arc<dyn RecordStore>,
}

impl RetrievalEngine {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector_index: Arc<dyn VectorIndex>,
        record_store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            embedder,
            vector_index,
            record_store,
        }
    }

    /// Recommends users similar to the subject's profile.
    ///
    /// The subject is always part of the exclusion set: an entity is never
    /// its own recommendation. An absent subject degrades to an empty
    /// result, not an error.
    #[tracing::instrument(name = "Recommending users", skip(self))]
    pub async fn recommend_users(
        &self,
        user_id: &str,
        limit: u64,
        exclude_following: bool,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        let user = match self.record_store.get_user(user_id).await? {
            Some(user) => user,
            None => {
                debug!("Subject user not found, returning empty recommendations");
                return Ok(Vec::new());
            }
        };

        let embedding = self.embedder.embed(&user.embedding_text()).await?;

        let mut exclude_ids = vec![user_id.to_string()];
        if exclude_following {
            exclude_ids.extend(self.record_store.get_following(user_id).await?);
        }

        let mut hits = self
            .vector_index
            .search(
                EntityKind::User,
                embedding,
                limit.saturating_mul(EXCLUSION_OVERFETCH_FACTOR),
                &exclude_ids,
            )
            .await?;
        hits.truncate(limit as usize);

        Ok(hits)
    }

    /// Recommends posts matching the subject's profile (content-based),
    /// excluding posts the subject already liked
    #[tracing::instrument(name = "Recommending posts", skip(self))]
    pub async fn recommend_posts(
        &self,
        user_id: &str,
        limit: u64,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        let user = match self.record_store.get_user(user_id).await? {
            Some(user) => user,
            None => {
                debug!("Subject user not found, returning empty recommendations");
                return Ok(Vec::new());
            }
        };

        let liked_posts = self
            .record_store
            .get_interactions(user_id)
            .await?
            .liked_posts;

        let embedding = self.embedder.embed(&user.embedding_text()).await?;

        let mut hits = self
            .vector_index
            .search(EntityKind::Post, embedding, limit, &liked_posts)
            .await?;
        hits.truncate(limit as usize);

        Ok(hits)
    }

    /// Semantic search over either collection.
    ///
    /// The raw query text is embedded directly; an empty or whitespace-only
    /// query yields the zero vector, a documented degenerate case that is
    /// rejected at the request boundary, not here.
    #[tracing::instrument(name = "Semantic search", skip(self))]
    pub async fn search(
        &self,
        kind: EntityKind,
        query: &str,
        limit: u64,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        let embedding = self.embedder.embed(query).await?;

        let mut hits = self.vector_index.search(kind, embedding, limit, &[]).await?;
        hits.truncate(limit as usize);

        Ok(hits)
    }
}

#[derive(thiserror::Error)]
pub enum RetrievalError {
    #[error(transparent)]
    EmbedderError(#[from] EmbedderError),
    #[error(transparent)]
    VectorIndexError(#[from] VectorIndexError),
    #[error(transparent)]
    RecordStoreError(#[from] RecordStoreError),
}

impl std::fmt::Debug for RetrievalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
