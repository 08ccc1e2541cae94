use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity_kind::EntityKind;

pub type Embeddings = Vec<f32>;

/// A point upserted into the vector index: one embedding plus the payload
/// identifying the entity it was generated from
#[derive(Debug, Deserialize, Serialize)]
pub struct EntityPoint {
    pub id: Uuid,
    pub vector: Embeddings,
    pub payload: EntityPointPayload,
}

/// Payload stored alongside a vector: the owning entity id under the
/// collection's fixed key, plus denormalized display fields
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntityPointPayload {
    pub entity_id: String,
    pub fields: HashMap<String, serde_json::Value>,
}

impl EntityPoint {
    /// Derives the point id deterministically from the entity id, so that
    /// re-ingesting the same entity replaces its previous point instead of
    /// accumulating stale duplicates.
    pub fn deterministic_id(kind: EntityKind, entity_id: &str) -> Uuid {
        let name = format!("{}:{}", kind.collection_name(), entity_id);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_id_is_stable_for_the_same_entity() {
        let first = EntityPoint::deterministic_id(EntityKind::User, "user-42");
        let second = EntityPoint::deterministic_id(EntityKind::User, "user-42");
        assert_eq!(first, second);
    }

    #[test]
    fn point_ids_differ_across_entities_and_kinds() {
        let user = EntityPoint::deterministic_id(EntityKind::User, "42");
        let post = EntityPoint::deterministic_id(EntityKind::Post, "42");
        let other_user = EntityPoint::deterministic_id(EntityKind::User, "43");
        assert_ne!(user, post);
        assert_ne!(user, other_user);
    }
}
