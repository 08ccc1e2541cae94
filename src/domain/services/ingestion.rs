use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    domain::entities::{
        entity_kind::EntityKind,
        entity_point::{EntityPoint, EntityPointPayload},
        post_record::PostRecord,
        user_profile::UserProfile,
    },
    helper::error_chain_fmt,
    ports::{
        embedder::{Embedder, EmbedderError},
        record_store::{RecordStore, RecordStoreError},
        vector_index::{VectorIndex, VectorIndexError},
    },
};

/// Embeds an entity and upserts it into the vector index, triggered by
/// entity lifecycle events.
///
/// The point id is derived from the entity id, so re-ingesting an entity
/// replaces its point: ingestion is idempotent at the entity-id level.
pub struct IngestionPipeline {
    record_store: Arc<dyn RecordStore>,
    embedder: Arc<dyn Embedder>,
    vector_index: Arc<dyn VectorIndex>,
}

impl IngestionPipeline {
    pub fn new(
        record_store: Arc<dyn RecordStore>,
        embedder: Arc<dyn Embedder>,
        vector_index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            record_store,
            embedder,
            vector_index,
        }
    }

    /// Ingests one entity, returning the dimension of the stored vector.
    ///
    /// Unlike the recommendation paths, an absent entity here is a failure:
    /// the caller asked to index something that does not exist.
    #[tracing::instrument(name = "Ingesting entity", skip(self))]
    pub async fn ingest(&self, kind: EntityKind, entity_id: &str) -> Result<usize, IngestionError> {
        let (embedding_text, fields) = match kind {
            EntityKind::User => {
                let user = self.record_store.get_user(entity_id).await?.ok_or_else(|| {
                    IngestionError::EntityNotFound {
                        kind,
                        id: entity_id.to_string(),
                    }
                })?;

                (user.embedding_text(), user_payload_fields(&user))
            }
            EntityKind::Post => {
                let post = self.record_store.get_post(entity_id).await?.ok_or_else(|| {
                    IngestionError::EntityNotFound {
                        kind,
                        id: entity_id.to_string(),
                    }
                })?;

                (post.embedding_text(), post_payload_fields(&post))
            }
        };

        let vector = self.embedder.embed(&embedding_text).await?;
        let dimension = vector.len();

        self.upsert(kind, entity_id, vector, fields).await?;

        info!(%kind, entity_id, dimension, "Entity ingested");
        Ok(dimension)
    }

    /// Removes an entity's point from the index. Removing an entity that
    /// was never indexed is a no-op.
    #[tracing::instrument(name = "Removing entity from index", skip(self))]
    pub async fn remove(&self, kind: EntityKind, entity_id: &str) -> Result<(), IngestionError> {
        self.vector_index.delete(kind, entity_id).await?;

        info!(%kind, entity_id, "Entity removed from index");
        Ok(())
    }

    /// One-time backfill: embeds and indexes existing entities in bulk.
    ///
    /// With explicit id lists only those entities are processed (missing ids
    /// are silently omitted, like everywhere else); without them the whole
    /// record store is walked. A failed upsert skips that entity and the
    /// backfill carries on; a failed embedding batch aborts, since every
    /// entity of the batch would fail the same way.
    #[tracing::instrument(name = "Backfilling embeddings", skip(self))]
    pub async fn backfill(
        &self,
        user_ids: Option<&[String]>,
        post_ids: Option<&[String]>,
    ) -> Result<BackfillReport, IngestionError> {
        let users = match user_ids {
            Some(ids) => self.record_store.get_users_by_ids(ids).await?,
            None => self.record_store.get_all_users().await?,
        };
        let posts = match post_ids {
            Some(ids) => self.record_store.get_posts_by_ids(ids).await?,
            None => self.record_store.get_all_posts().await?,
        };

        let mut report = BackfillReport::default();

        let user_texts: Vec<String> = users.iter().map(UserProfile::embedding_text).collect();
        let user_vectors = self.embedder.embed_batch(&user_texts).await?;

        for (user, vector) in users.iter().zip(user_vectors) {
            match self
                .upsert(EntityKind::User, &user.id, vector, user_payload_fields(user))
                .await
            {
                Ok(()) => report.users_processed += 1,
                Err(error) => {
                    warn!(?error, user_id = %user.id, "Skipping user during backfill");
                    report.users_skipped += 1;
                }
            }
        }

        let post_texts: Vec<String> = posts.iter().map(PostRecord::embedding_text).collect();
        let post_vectors = self.embedder.embed_batch(&post_texts).await?;

        for (post, vector) in posts.iter().zip(post_vectors) {
            match self
                .upsert(EntityKind::Post, &post.id, vector, post_payload_fields(post))
                .await
            {
                Ok(()) => report.posts_processed += 1,
                Err(error) => {
                    warn!(?error, post_id = %post.id, "Skipping post during backfill");
                    report.posts_skipped += 1;
                }
            }
        }

        info!(
            users_processed = report.users_processed,
            posts_processed = report.posts_processed,
            "Backfill finished"
        );
        Ok(report)
    }

    /// Point counts per collection, for the status report
    #[tracing::instrument(name = "Reporting index status", skip(self))]
    pub async fn index_status(&self) -> Result<IndexStatus, IngestionError> {
        Ok(IndexStatus {
            users_in_vector_db: self.vector_index.count(EntityKind::User).await?,
            posts_in_vector_db: self.vector_index.count(EntityKind::Post).await?,
        })
    }

    async fn upsert(
        &self,
        kind: EntityKind,
        entity_id: &str,
        vector: Vec<f32>,
        fields: HashMap<String, serde_json::Value>,
    ) -> Result<(), IngestionError> {
        let point_id = EntityPoint::deterministic_id(kind, entity_id);
        let payload = EntityPointPayload {
            entity_id: entity_id.to_string(),
            fields,
        };

        self.vector_index
            .upsert_point(kind, point_id, vector, payload)
            .await?;

        Ok(())
    }
}

fn user_payload_fields(user: &UserProfile) -> HashMap<String, serde_json::Value> {
    HashMap::from([
        (
            "first_name".to_string(),
            serde_json::Value::from(user.first_name.clone().unwrap_or_default()),
        ),
        (
            "last_name".to_string(),
            serde_json::Value::from(user.last_name.clone().unwrap_or_default()),
        ),
        (
            "bio".to_string(),
            serde_json::Value::from(user.bio.clone().unwrap_or_default()),
        ),
    ])
}

fn post_payload_fields(post: &PostRecord) -> HashMap<String, serde_json::Value> {
    HashMap::from([(
        "author_id".to_string(),
        serde_json::Value::from(post.author_id.clone()),
    )])
}

/// Outcome of a backfill run: skipped entities were logged and left out,
/// they did not abort the run
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BackfillReport {
    pub users_processed: u64,
    pub posts_processed: u64,
    pub users_skipped: u64,
    pub posts_skipped: u64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct IndexStatus {
    pub users_in_vector_db: u64,
    pub posts_in_vector_db: u64,
}

#[derive(thiserror::Error)]
pub enum IngestionError {
    #[error("{kind} {id} was not found in the record store")]
    EntityNotFound { kind: EntityKind, id: String },
    #[error(transparent)]
    RecordStoreError(#[from] RecordStoreError),
    #[error(transparent)]
    EmbedderError(#[from] EmbedderError),
    #[error(transparent)]
    VectorIndexError(#[from] VectorIndexError),
}

impl std::fmt::Debug for IngestionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
