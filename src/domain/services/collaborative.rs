use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::{
    domain::services::retrieval::{RetrievalEngine, RetrievalError},
    ports::record_store::RecordStore,
};

/// How many similar users form the neighborhood the aggregation runs over
const NEIGHBORHOOD_SIZE: u64 = 10;

/// Collaborative filtering: ranks posts by how much the subject's most
/// similar users liked them.
pub struct CollaborativeAggregator {
    retrieval: Arc<RetrievalEngine>,
    record_store: Arc<dyn RecordStore>,
}

/// Per-neighbor aggregation outcome. A failed interaction lookup is a
/// skip, never an abort, and the counts stay inspectable.
#[derive(Debug)]
pub enum NeighborOutcome {
    Aggregated {
        neighbor_id: String,
        liked_count: usize,
    },
    Skipped {
        neighbor_id: String,
        reason: String,
    },
}

#[derive(Debug)]
pub struct CollaborativeRecommendation {
    /// (post id, aggregated score), sorted by descending score with
    /// ascending post id as the deterministic tie-break
    pub posts: Vec<(String, f32)>,
    pub neighbor_outcomes: Vec<NeighborOutcome>,
}

impl CollaborativeAggregator {
    pub fn new(retrieval: Arc<RetrievalEngine>, record_store: Arc<dyn RecordStore>) -> Self {
        Self {
            retrieval,
            record_store,
        }
    }

    /// Recommends posts liked by users similar to the subject.
    ///
    /// Every post a neighbor liked accumulates that neighbor's similarity
    /// score — an exact floating sum, not an average, so popularity among
    /// several similar neighbors is explicitly rewarded.
    #[tracing::instrument(name = "Recommending posts collaboratively", skip(self))]
    pub async fn recommend_posts_collaborative(
        &self,
        user_id: &str,
        limit: u64,
    ) -> Result<CollaborativeRecommendation, RetrievalError> {
        let neighbors = self
            .retrieval
            .recommend_users(user_id, NEIGHBORHOOD_SIZE, false)
            .await?;

        if neighbors.is_empty() {
            return Ok(CollaborativeRecommendation {
                posts: Vec::new(),
                neighbor_outcomes: Vec::new(),
            });
        }

        let mut post_scores: HashMap<String, f32> = HashMap::new();
        let mut neighbor_outcomes = Vec::with_capacity(neighbors.len());

        for neighbor in &neighbors {
            match self.record_store.get_interactions(&neighbor.entity_id).await {
                Ok(interactions) => {
                    for post_id in &interactions.liked_posts {
                        *post_scores.entry(post_id.clone()).or_insert(0.0) += neighbor.score;
                    }
                    neighbor_outcomes.push(NeighborOutcome::Aggregated {
                        neighbor_id: neighbor.entity_id.clone(),
                        liked_count: interactions.liked_posts.len(),
                    });
                }
                Err(error) => {
                    // This neighbor contributes nothing, aggregation continues
                    warn!(
                        ?error,
                        neighbor_id = %neighbor.entity_id,
                        "Skipping neighbor, interaction lookup failed"
                    );
                    neighbor_outcomes.push(NeighborOutcome::Skipped {
                        neighbor_id: neighbor.entity_id.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        let mut posts: Vec<(String, f32)> = post_scores.into_iter().collect();
        posts.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        posts.truncate(limit as usize);

        Ok(CollaborativeRecommendation {
            posts,
            neighbor_outcomes,
        })
    }
}

impl NeighborOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, NeighborOutcome::Skipped { .. })
    }
}
