use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::{
    prelude::QdrantClient,
    qdrant::{
        self, condition::ConditionOneOf, points_selector::PointsSelectorOneOf, r#match::MatchValue,
        value::Kind, vectors_config::Config, with_payload_selector::SelectorOptions, Condition,
        CountPoints, CreateCollection, Distance, FieldCondition, Filter, Match, PointStruct,
        PointsSelector, VectorParams, VectorsConfig, WithPayloadSelector,
    },
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    domain::entities::{
        entity_kind::EntityKind,
        entity_point::{Embeddings, EntityPointPayload},
        search_hit::SearchHit,
    },
    ports::vector_index::{VectorIndex, VectorIndexError},
};

/// `VectorIndex` implemented over Qdrant: one collection per entity kind,
/// cosine distance, exclusion filters pushed into the search query
pub struct EntityPointQdrantRepository {
    client: QdrantClient,
    collection_vector_size: u64,
    collection_distance: Distance,
}

impl EntityPointQdrantRepository {
    /// Builds the repository and makes sure both collections exist
    #[tracing::instrument(name = "Initializing Qdrant and the associated collections", skip(client))]
    pub async fn try_new(
        client: QdrantClient,
        collection_distance: &str,
        collection_vector_size: u64,
    ) -> Result<Self, VectorIndexError> {
        let collection_distance =
            Distance::from_str_name(collection_distance).ok_or_else(|| {
                VectorIndexError::Configuration(format!(
                    "Invalid Qdrant distance from configuration: {}",
                    collection_distance
                ))
            })?;

        let repository = Self {
            client,
            collection_vector_size,
            collection_distance,
        };

        repository.ensure_collection(EntityKind::User).await?;
        repository.ensure_collection(EntityKind::Post).await?;

        Ok(repository)
    }

    fn exclusion_filter(kind: EntityKind, exclude_ids: &[String]) -> Option<Filter> {
        if exclude_ids.is_empty() {
            return None;
        }

        // "Must not match any of these ids", evaluated before the top-k cut
        let must_not = exclude_ids
            .iter()
            .map(|id| Condition {
                condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                    key: kind.payload_id_key().to_string(),
                    r#match: Some(Match {
                        match_value: Some(MatchValue::Keyword(id.clone())),
                    }),
                    ..Default::default()
                })),
            })
            .collect();

        Some(Filter {
            must_not,
            ..Default::default()
        })
    }
}

#[async_trait]
impl VectorIndex for EntityPointQdrantRepository {
    #[tracing::instrument(name = "Ensuring Qdrant collection", skip(self))]
    async fn ensure_collection(&self, kind: EntityKind) -> Result<(), VectorIndexError> {
        match self
            .client
            .create_collection(&CreateCollection {
                collection_name: kind.collection_name().to_string(),
                vectors_config: Some(VectorsConfig {
                    config: Some(Config::Params(VectorParams {
                        size: self.collection_vector_size,
                        distance: self.collection_distance as i32,
                        ..Default::default()
                    })),
                }),
                ..Default::default()
            })
            .await
        {
            Ok(_) => {
                info!("Created collection {}", kind.collection_name());
                Ok(())
            }
            Err(error) => {
                // Qdrant client only returns anyhow errors for now
                if error.to_string().contains("already exists") {
                    Ok(())
                } else {
                    Err(VectorIndexError::Unavailable(error.to_string()))
                }
            }
        }
    }

    #[tracing::instrument(name = "Upserting point to Qdrant", skip(self, vector, payload))]
    async fn upsert_point(
        &self,
        kind: EntityKind,
        point_id: Uuid,
        vector: Embeddings,
        payload: EntityPointPayload,
    ) -> Result<(), VectorIndexError> {
        let mut qdrant_payload: HashMap<String, qdrant::Value> = HashMap::from([(
            kind.payload_id_key().to_string(),
            qdrant::Value::from(payload.entity_id),
        )]);
        for (key, value) in payload.fields {
            qdrant_payload.insert(key, json_to_qdrant_value(value));
        }

        let point = PointStruct {
            id: Some(point_id.to_string().into()),
            vectors: Some(vector.into()),
            payload: qdrant_payload,
        };

        self.client
            .upsert_points(kind.collection_name(), vec![point], None)
            .await
            .map_err(|e| VectorIndexError::Unavailable(e.to_string()))?;

        Ok(())
    }

    #[tracing::instrument(name = "Searching Qdrant", skip(self, vector))]
    async fn search(
        &self,
        kind: EntityKind,
        vector: Embeddings,
        limit: u64,
        exclude_ids: &[String],
    ) -> Result<Vec<SearchHit>, VectorIndexError> {
        let response = self
            .client
            .search_points(&qdrant::SearchPoints {
                collection_name: kind.collection_name().to_string(),
                vector,
                limit,
                filter: Self::exclusion_filter(kind, exclude_ids),
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| VectorIndexError::Unavailable(e.to_string()))?;

        let hits = response
            .result
            .into_iter()
            .filter_map(|point| {
                let entity_id = match point.payload.get(kind.payload_id_key()) {
                    Some(value) => match &value.kind {
                        Some(Kind::StringValue(id)) => id.clone(),
                        _ => {
                            warn!(?point.id, "Point payload id key is not a string, skipping hit");
                            return None;
                        }
                    },
                    None => {
                        warn!(?point.id, "Point payload misses its id key, skipping hit");
                        return None;
                    }
                };

                let payload = point
                    .payload
                    .into_iter()
                    .map(|(key, value)| (key, qdrant_to_json_value(value)))
                    .collect();

                Some(SearchHit {
                    entity_id,
                    score: point.score,
                    payload,
                })
            })
            .collect();

        Ok(hits)
    }

    #[tracing::instrument(name = "Deleting points from Qdrant", skip(self))]
    async fn delete(&self, kind: EntityKind, entity_id: &str) -> Result<(), VectorIndexError> {
        // Delete by payload filter rather than by point id: it also cleans up
        // points written before ids became deterministic
        let filter = Filter {
            must: vec![Condition {
                condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                    key: kind.payload_id_key().to_string(),
                    r#match: Some(Match {
                        match_value: Some(MatchValue::Keyword(entity_id.to_string())),
                    }),
                    ..Default::default()
                })),
            }],
            ..Default::default()
        };

        self.client
            .delete_points(
                kind.collection_name(),
                &PointsSelector {
                    points_selector_one_of: Some(PointsSelectorOneOf::Filter(filter)),
                },
                None,
            )
            .await
            .map_err(|e| VectorIndexError::Unavailable(e.to_string()))?;

        Ok(())
    }

    async fn count(&self, kind: EntityKind) -> Result<u64, VectorIndexError> {
        let response = self
            .client
            .count(&CountPoints {
                collection_name: kind.collection_name().to_string(),
                exact: Some(true),
                ..Default::default()
            })
            .await
            .map_err(|e| VectorIndexError::Unavailable(e.to_string()))?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }
}

fn json_to_qdrant_value(value: serde_json::Value) -> qdrant::Value {
    match value {
        serde_json::Value::String(s) => qdrant::Value::from(s),
        serde_json::Value::Bool(b) => qdrant::Value::from(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                qdrant::Value::from(i)
            } else {
                qdrant::Value::from(n.as_f64().unwrap_or(0.0))
            }
        }
        other => qdrant::Value::from(other.to_string()),
    }
}

fn qdrant_to_json_value(value: qdrant::Value) -> serde_json::Value {
    match value.kind {
        Some(Kind::StringValue(s)) => serde_json::Value::from(s),
        Some(Kind::IntegerValue(i)) => serde_json::Value::from(i),
        Some(Kind::DoubleValue(d)) => serde_json::Value::from(d),
        Some(Kind::BoolValue(b)) => serde_json::Value::from(b),
        _ => serde_json::Value::Null,
    }
}
