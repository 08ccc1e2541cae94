use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use claims::assert_ok;
use fake::{faker::name::en::Name, Fake};
use uuid::Uuid;

use recommendation_service::{
    domain::{
        entities::{
            entity_kind::EntityKind,
            entity_point::{Embeddings, EntityPointPayload},
            interaction_set::InteractionSet,
            post_record::PostRecord,
            search_hit::SearchHit,
            user_profile::UserProfile,
        },
        services::{
            collaborative::CollaborativeAggregator,
            ingestion::{IngestionError, IngestionPipeline},
            retrieval::RetrievalEngine,
        },
    },
    ports::{
        embedder::{Embedder, EmbedderError},
        record_store::{RecordStore, RecordStoreError},
        vector_index::{VectorIndex, VectorIndexError},
    },
};

/// Embedder fake mapping known texts to fixed vectors. Unknown texts and
/// empty texts embed to the zero vector, like the real service does for
/// empty content.
struct MappedEmbedder {
    dimension: usize,
    map: HashMap<String, Embeddings>,
}

impl MappedEmbedder {
    fn new(dimension: usize, entries: Vec<(&str, Embeddings)>) -> Self {
        Self {
            dimension,
            map: entries
                .into_iter()
                .map(|(text, vector)| (text.to_string(), vector))
                .collect(),
        }
    }
}

#[async_trait]
impl Embedder for MappedEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embeddings, EmbedderError> {
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }
        Ok(self
            .map
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.dimension]))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embeddings>, EmbedderError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}

/// Vector index fake: brute-force cosine similarity over in-memory points,
/// with the same exclusion-before-top-k contract as the Qdrant adapter.
#[derive(Default)]
struct InMemoryVectorIndex {
    points: Mutex<HashMap<EntityKind, HashMap<Uuid, (Embeddings, EntityPointPayload)>>>,
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn ensure_collection(&self, kind: EntityKind) -> Result<(), VectorIndexError> {
        self.points
            .lock()
            .unwrap()
            .entry(kind)
            .or_insert_with(HashMap::new);
        Ok(())
    }

    async fn upsert_point(
        &self,
        kind: EntityKind,
        point_id: Uuid,
        vector: Embeddings,
        payload: EntityPointPayload,
    ) -> Result<(), VectorIndexError> {
        self.points
            .lock()
            .unwrap()
            .entry(kind)
            .or_insert_with(HashMap::new)
            .insert(point_id, (vector, payload));
        Ok(())
    }

    async fn search(
        &self,
        kind: EntityKind,
        vector: Embeddings,
        limit: u64,
        exclude_ids: &[String],
    ) -> Result<Vec<SearchHit>, VectorIndexError> {
        let excluded: HashSet<&String> = exclude_ids.iter().collect();

        let points = self.points.lock().unwrap();
        let mut hits: Vec<SearchHit> = points
            .get(&kind)
            .map(|collection| {
                collection
                    .values()
                    .filter(|(_, payload)| !excluded.contains(&payload.entity_id))
                    .map(|(point_vector, payload)| SearchHit {
                        entity_id: payload.entity_id.clone(),
                        score: cosine_similarity(&vector, point_vector),
                        payload: payload.fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        hits.truncate(limit as usize);

        Ok(hits)
    }

    async fn delete(&self, kind: EntityKind, entity_id: &str) -> Result<(), VectorIndexError> {
        if let Some(collection) = self.points.lock().unwrap().get_mut(&kind) {
            collection.retain(|_, (_, payload)| payload.entity_id != entity_id);
        }
        Ok(())
    }

    async fn count(&self, kind: EntityKind) -> Result<u64, VectorIndexError> {
        Ok(self
            .points
            .lock()
            .unwrap()
            .get(&kind)
            .map(|collection| collection.len() as u64)
            .unwrap_or(0))
    }
}

#[derive(Default)]
struct InMemoryRecordStore {
    users: HashMap<String, UserProfile>,
    posts: HashMap<String, PostRecord>,
    following: HashMap<String, Vec<String>>,
    interactions: HashMap<String, InteractionSet>,
    failing_interactions: HashSet<String>,
}

impl InMemoryRecordStore {
    fn with_user(mut self, id: &str, bio: &str) -> Self {
        self.users.insert(
            id.to_string(),
            UserProfile {
                id: id.to_string(),
                first_name: None,
                last_name: None,
                bio: Some(bio.to_string()),
            },
        );
        self
    }

    fn with_post(mut self, id: &str, author_id: &str, body: &str) -> Self {
        self.posts.insert(
            id.to_string(),
            PostRecord {
                id: id.to_string(),
                author_id: author_id.to_string(),
                body: body.to_string(),
            },
        );
        self
    }

    fn with_following(mut self, user_id: &str, following: &[&str]) -> Self {
        self.following.insert(
            user_id.to_string(),
            following.iter().map(|id| id.to_string()).collect(),
        );
        self
    }

    fn with_liked_posts(mut self, user_id: &str, liked: &[&str]) -> Self {
        self.interactions.insert(
            user_id.to_string(),
            InteractionSet {
                liked_posts: liked.iter().map(|id| id.to_string()).collect(),
                commented_posts: Vec::new(),
            },
        );
        self
    }

    fn with_failing_interactions(mut self, user_id: &str) -> Self {
        self.failing_interactions.insert(user_id.to_string());
        self
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, RecordStoreError> {
        Ok(self.users.get(user_id).cloned())
    }

    async fn get_post(&self, post_id: &str) -> Result<Option<PostRecord>, RecordStoreError> {
        Ok(self.posts.get(post_id).cloned())
    }

    async fn get_users_by_ids(
        &self,
        user_ids: &[String],
    ) -> Result<Vec<UserProfile>, RecordStoreError> {
        Ok(user_ids
            .iter()
            .filter_map(|id| self.users.get(id).cloned())
            .collect())
    }

    async fn get_posts_by_ids(
        &self,
        post_ids: &[String],
    ) -> Result<Vec<PostRecord>, RecordStoreError> {
        Ok(post_ids
            .iter()
            .filter_map(|id| self.posts.get(id).cloned())
            .collect())
    }

    async fn get_all_users(&self) -> Result<Vec<UserProfile>, RecordStoreError> {
        let mut users: Vec<UserProfile> = self.users.values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn get_all_posts(&self) -> Result<Vec<PostRecord>, RecordStoreError> {
        let mut posts: Vec<PostRecord> = self.posts.values().cloned().collect();
        posts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(posts)
    }

    async fn get_following(&self, user_id: &str) -> Result<Vec<String>, RecordStoreError> {
        Ok(self.following.get(user_id).cloned().unwrap_or_default())
    }

    async fn get_interactions(&self, user_id: &str) -> Result<InteractionSet, RecordStoreError> {
        if self.failing_interactions.contains(user_id) {
            return Err(RecordStoreError::Unavailable(
                "interaction lookup failed".into(),
            ));
        }
        Ok(self.interactions.get(user_id).cloned().unwrap_or_default())
    }
}

fn build_retrieval_engine(
    embedder: MappedEmbedder,
    vector_index: Arc<InMemoryVectorIndex>,
    record_store: Arc<InMemoryRecordStore>,
) -> Arc<RetrievalEngine> {
    Arc::new(RetrievalEngine::new(
        Arc::new(embedder),
        vector_index,
        record_store,
    ))
}

async fn index_user(index: &InMemoryVectorIndex, id: &str, vector: Embeddings) {
    index
        .upsert_point(
            EntityKind::User,
            Uuid::new_v4(),
            vector,
            EntityPointPayload {
                entity_id: id.to_string(),
                fields: HashMap::new(),
            },
        )
        .await
        .unwrap();
}

async fn index_post(index: &InMemoryVectorIndex, id: &str, vector: Embeddings) {
    index
        .upsert_point(
            EntityKind::Post,
            Uuid::new_v4(),
            vector,
            EntityPointPayload {
                entity_id: id.to_string(),
                fields: HashMap::new(),
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn recommended_users_never_include_the_subject_nor_its_following() {
    let embedder = MappedEmbedder::new(2, vec![("climbing and coffee", vec![1.0, 0.0])]);
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    let record_store = Arc::new(
        InMemoryRecordStore::default()
            .with_user("alice", "climbing and coffee")
            .with_following("alice", &["bob"]),
    );

    // All four profiles are close to the subject, the naive top-2 would be
    // [alice, bob], exactly the two that must not come back
    index_user(&vector_index, "alice", vec![1.0, 0.0]).await;
    index_user(&vector_index, "bob", vec![0.99, 0.14]).await;
    index_user(&vector_index, "carol", vec![0.9, 0.43]).await;
    index_user(&vector_index, "dave", vec![0.8, 0.6]).await;

    let engine = build_retrieval_engine(embedder, vector_index, record_store);

    let hits = assert_ok!(engine.recommend_users("alice", 2, true).await);

    let ids: Vec<&str> = hits.iter().map(|hit| hit.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["carol", "dave"]);
}

#[tokio::test]
async fn the_subject_is_excluded_even_when_following_is_not() {
    let embedder = MappedEmbedder::new(2, vec![("gardening", vec![1.0, 0.0])]);
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    let record_store = Arc::new(
        InMemoryRecordStore::default()
            .with_user("alice", "gardening")
            .with_following("alice", &["bob"]),
    );

    index_user(&vector_index, "alice", vec![1.0, 0.0]).await;
    index_user(&vector_index, "bob", vec![0.9, 0.43]).await;

    let engine = build_retrieval_engine(embedder, vector_index, record_store);

    let hits = assert_ok!(engine.recommend_users("alice", 5, false).await);

    let ids: Vec<&str> = hits.iter().map(|hit| hit.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["bob"]);
}

#[tokio::test]
async fn an_absent_subject_yields_empty_recommendations_without_error() {
    let embedder = MappedEmbedder::new(2, vec![]);
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    let record_store = Arc::new(InMemoryRecordStore::default());

    index_user(&vector_index, "bob", vec![1.0, 0.0]).await;

    let engine = build_retrieval_engine(embedder, vector_index, record_store);

    let hits = assert_ok!(engine.recommend_users("ghost", 5, true).await);
    assert!(hits.is_empty());

    let hits = assert_ok!(engine.recommend_posts("ghost", 5).await);
    assert!(hits.is_empty());
}

#[tokio::test]
async fn recommended_posts_exclude_already_liked_ones() {
    let embedder = MappedEmbedder::new(2, vec![("cooking", vec![1.0, 0.0])]);
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    let record_store = Arc::new(
        InMemoryRecordStore::default()
            .with_user("alice", "cooking")
            .with_liked_posts("alice", &["p1"]),
    );

    index_post(&vector_index, "p1", vec![1.0, 0.0]).await;
    index_post(&vector_index, "p2", vec![0.9, 0.43]).await;

    let engine = build_retrieval_engine(embedder, vector_index, record_store);

    let hits = assert_ok!(engine.recommend_posts("alice", 5).await);

    let ids: Vec<&str> = hits.iter().map(|hit| hit.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["p2"]);
}

#[tokio::test]
async fn ingesting_an_entity_makes_it_searchable() {
    let embedder = MappedEmbedder::new(
        2,
        vec![
            ("a long hike in the alps", vec![1.0, 0.0]),
            ("mountain trip", vec![0.9, 0.43]),
        ],
    );
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    let author: String = Name().fake();
    let record_store = Arc::new(InMemoryRecordStore::default().with_post(
        "p1",
        &author,
        "a long hike in the alps",
    ));

    let embedder = Arc::new(embedder);
    let pipeline = IngestionPipeline::new(
        record_store.clone(),
        embedder.clone(),
        vector_index.clone(),
    );

    let dimension = assert_ok!(pipeline.ingest(EntityKind::Post, "p1").await);
    assert_eq!(dimension, 2);

    let engine = Arc::new(RetrievalEngine::new(
        embedder,
        vector_index.clone(),
        record_store,
    ));

    let hits = assert_ok!(engine.search(EntityKind::Post, "mountain trip", 5).await);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entity_id, "p1");
}

#[tokio::test]
async fn reingesting_the_same_entity_replaces_its_point() {
    let embedder = MappedEmbedder::new(2, vec![("hello world", vec![1.0, 0.0])]);
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    let record_store =
        Arc::new(InMemoryRecordStore::default().with_post("p1", "alice", "hello world"));

    let pipeline = IngestionPipeline::new(
        record_store,
        Arc::new(embedder),
        vector_index.clone(),
    );

    assert_ok!(pipeline.ingest(EntityKind::Post, "p1").await);
    assert_ok!(pipeline.ingest(EntityKind::Post, "p1").await);

    assert_eq!(vector_index.count(EntityKind::Post).await.unwrap(), 1);
}

#[tokio::test]
async fn ingesting_a_missing_entity_fails_with_entity_not_found() {
    let embedder = MappedEmbedder::new(2, vec![]);
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    let record_store = Arc::new(InMemoryRecordStore::default());

    let pipeline = IngestionPipeline::new(record_store, Arc::new(embedder), vector_index);

    let result = pipeline.ingest(EntityKind::User, "ghost").await;
    assert!(matches!(
        result,
        Err(IngestionError::EntityNotFound { .. })
    ));
}

#[tokio::test]
async fn collaborative_scores_accumulate_neighbor_similarities() {
    let embedder = MappedEmbedder::new(2, vec![("subject profile", vec![1.0, 0.0])]);
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    let record_store = Arc::new(
        InMemoryRecordStore::default()
            .with_user("alice", "subject profile")
            .with_liked_posts("n1", &["pa", "pb"])
            .with_liked_posts("n2", &["pa"]),
    );

    // cosine(subject, n1) = 0.8, cosine(subject, n2) = 0.6
    index_user(&vector_index, "n1", vec![0.8, 0.6]).await;
    index_user(&vector_index, "n2", vec![0.6, 0.8]).await;

    let engine = build_retrieval_engine(embedder, vector_index, record_store.clone());
    let aggregator = CollaborativeAggregator::new(engine, record_store);

    let recommendation = assert_ok!(aggregator.recommend_posts_collaborative("alice", 10).await);

    assert_eq!(recommendation.posts.len(), 2);
    assert_eq!(recommendation.posts[0].0, "pa");
    assert!((recommendation.posts[0].1 - 1.4).abs() < 1e-6);
    assert_eq!(recommendation.posts[1].0, "pb");
    assert!((recommendation.posts[1].1 - 0.8).abs() < 1e-6);
}

#[tokio::test]
async fn collaborative_ties_break_on_ascending_post_id() {
    let embedder = MappedEmbedder::new(2, vec![("subject profile", vec![1.0, 0.0])]);
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    let record_store = Arc::new(
        InMemoryRecordStore::default()
            .with_user("alice", "subject profile")
            .with_liked_posts("n1", &["pb"])
            .with_liked_posts("n2", &["pa"]),
    );

    // Both neighbors sit at the same similarity, their liked posts tie
    index_user(&vector_index, "n1", vec![0.8, 0.6]).await;
    index_user(&vector_index, "n2", vec![0.8, -0.6]).await;

    let engine = build_retrieval_engine(embedder, vector_index, record_store.clone());
    let aggregator = CollaborativeAggregator::new(engine, record_store);

    let recommendation = assert_ok!(aggregator.recommend_posts_collaborative("alice", 10).await);

    let ids: Vec<&str> = recommendation
        .posts
        .iter()
        .map(|(id, _)| id.as_str())
        .collect();
    assert_eq!(ids, vec!["pa", "pb"]);
}

#[tokio::test]
async fn a_failing_neighbor_is_skipped_not_fatal() {
    let embedder = MappedEmbedder::new(2, vec![("subject profile", vec![1.0, 0.0])]);
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    let record_store = Arc::new(
        InMemoryRecordStore::default()
            .with_user("alice", "subject profile")
            .with_liked_posts("n1", &["pa"])
            .with_failing_interactions("n2"),
    );

    index_user(&vector_index, "n1", vec![0.8, 0.6]).await;
    index_user(&vector_index, "n2", vec![0.6, 0.8]).await;

    let engine = build_retrieval_engine(embedder, vector_index, record_store.clone());
    let aggregator = CollaborativeAggregator::new(engine, record_store);

    let recommendation = assert_ok!(aggregator.recommend_posts_collaborative("alice", 10).await);

    assert_eq!(recommendation.posts.len(), 1);
    assert_eq!(recommendation.posts[0].0, "pa");

    let skipped: Vec<_> = recommendation
        .neighbor_outcomes
        .iter()
        .filter(|outcome| outcome.is_skipped())
        .collect();
    assert_eq!(skipped.len(), 1);
}

#[tokio::test]
async fn removing_an_entity_takes_it_out_of_search_results() {
    let embedder = MappedEmbedder::new(
        2,
        vec![("hello world", vec![1.0, 0.0]), ("hello", vec![0.9, 0.43])],
    );
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    let record_store =
        Arc::new(InMemoryRecordStore::default().with_post("p1", "alice", "hello world"));

    let embedder = Arc::new(embedder);
    let pipeline = IngestionPipeline::new(
        record_store.clone(),
        embedder.clone(),
        vector_index.clone(),
    );

    assert_ok!(pipeline.ingest(EntityKind::Post, "p1").await);
    assert_eq!(vector_index.count(EntityKind::Post).await.unwrap(), 1);

    assert_ok!(pipeline.remove(EntityKind::Post, "p1").await);
    assert_eq!(vector_index.count(EntityKind::Post).await.unwrap(), 0);

    let engine = Arc::new(RetrievalEngine::new(embedder, vector_index, record_store));
    let hits = assert_ok!(engine.search(EntityKind::Post, "hello", 5).await);
    assert!(hits.is_empty());
}

#[tokio::test]
async fn removing_a_never_indexed_entity_is_a_noop() {
    let embedder = MappedEmbedder::new(2, vec![]);
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    let record_store = Arc::new(InMemoryRecordStore::default());

    let pipeline = IngestionPipeline::new(record_store, Arc::new(embedder), vector_index);

    assert_ok!(pipeline.remove(EntityKind::User, "ghost").await);
}

#[tokio::test]
async fn backfill_indexes_every_stored_entity() {
    let embedder = MappedEmbedder::new(
        2,
        vec![
            ("climbing", vec![1.0, 0.0]),
            ("gardening", vec![0.0, 1.0]),
            ("a post about climbing", vec![0.9, 0.43]),
        ],
    );
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    let record_store = Arc::new(
        InMemoryRecordStore::default()
            .with_user("alice", "climbing")
            .with_user("bob", "gardening")
            .with_post("p1", "alice", "a post about climbing"),
    );

    let pipeline = IngestionPipeline::new(
        record_store.clone(),
        Arc::new(embedder),
        vector_index.clone(),
    );

    let report = assert_ok!(pipeline.backfill(None, None).await);

    assert_eq!(report.users_processed, 2);
    assert_eq!(report.posts_processed, 1);
    assert_eq!(report.users_skipped, 0);
    assert_eq!(report.posts_skipped, 0);
    assert_eq!(vector_index.count(EntityKind::User).await.unwrap(), 2);
    assert_eq!(vector_index.count(EntityKind::Post).await.unwrap(), 1);
}

#[tokio::test]
async fn a_scoped_backfill_only_touches_the_requested_ids() {
    let embedder = MappedEmbedder::new(2, vec![("climbing", vec![1.0, 0.0])]);
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    let record_store = Arc::new(
        InMemoryRecordStore::default()
            .with_user("alice", "climbing")
            .with_user("bob", "gardening"),
    );

    let pipeline = IngestionPipeline::new(
        record_store,
        Arc::new(embedder),
        vector_index.clone(),
    );

    // "ghost" does not exist; missing ids are omitted, not errors
    let requested = vec!["alice".to_string(), "ghost".to_string()];
    let report = assert_ok!(pipeline.backfill(Some(&requested), Some(&[])).await);

    assert_eq!(report.users_processed, 1);
    assert_eq!(report.posts_processed, 0);
    assert_eq!(vector_index.count(EntityKind::User).await.unwrap(), 1);
}

#[tokio::test]
async fn index_status_reports_counts_per_collection() {
    let embedder = MappedEmbedder::new(
        2,
        vec![("climbing", vec![1.0, 0.0]), ("hello world", vec![0.0, 1.0])],
    );
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    let record_store = Arc::new(
        InMemoryRecordStore::default()
            .with_user("alice", "climbing")
            .with_post("p1", "alice", "hello world"),
    );

    let pipeline = IngestionPipeline::new(
        record_store,
        Arc::new(embedder),
        vector_index.clone(),
    );

    assert_ok!(pipeline.backfill(None, None).await);

    let status = assert_ok!(pipeline.index_status().await);
    assert_eq!(status.users_in_vector_db, 1);
    assert_eq!(status.posts_in_vector_db, 1);
}

#[tokio::test]
async fn a_pathological_limit_does_not_overflow_the_overfetch() {
    let embedder = MappedEmbedder::new(2, vec![("gardening", vec![1.0, 0.0])]);
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    let record_store = Arc::new(InMemoryRecordStore::default().with_user("alice", "gardening"));

    index_user(&vector_index, "alice", vec![1.0, 0.0]).await;
    index_user(&vector_index, "bob", vec![0.9, 0.43]).await;

    let engine = build_retrieval_engine(embedder, vector_index, record_store);

    let hits = assert_ok!(engine.recommend_users("alice", u64::MAX, true).await);

    let ids: Vec<&str> = hits.iter().map(|hit| hit.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["bob"]);
}

#[tokio::test]
async fn collaborative_results_are_truncated_to_the_limit() {
    let embedder = MappedEmbedder::new(2, vec![("subject profile", vec![1.0, 0.0])]);
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    let record_store = Arc::new(
        InMemoryRecordStore::default()
            .with_user("alice", "subject profile")
            .with_liked_posts("n1", &["pa", "pb", "pc"]),
    );

    index_user(&vector_index, "n1", vec![0.8, 0.6]).await;

    let engine = build_retrieval_engine(embedder, vector_index, record_store.clone());
    let aggregator = CollaborativeAggregator::new(engine, record_store);

    let recommendation = assert_ok!(aggregator.recommend_posts_collaborative("alice", 2).await);
    assert_eq!(recommendation.posts.len(), 2);
}
