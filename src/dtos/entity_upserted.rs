use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{domain::entities::entity_kind::EntityKind, helper::error_chain_fmt};

/// Lifecycle event emitted by the main application when an entity is
/// created or updated; it triggers the ingestion pipeline
#[derive(Debug, Deserialize, Serialize)]
pub struct EntityUpsertedDto {
    pub id: Uuid,
    pub entity_kind: EntityKind,
    pub entity_id: String,
}

impl EntityUpsertedDto {
    pub fn try_parsing(data: &[u8]) -> Result<Self, EntityUpsertedDtoError> {
        let data = std::str::from_utf8(data)?;
        let dto = serde_json::from_str(data)
            .map_err(|e| EntityUpsertedDtoError::InvalidJsonData(e, data.to_string()))?;

        Ok(dto)
    }
}

#[derive(thiserror::Error)]
pub enum EntityUpsertedDtoError {
    #[error("Data could not be converted from utf8 u8 vector to string")]
    InvalidStringData(#[from] std::str::Utf8Error),

    #[error("Data did not represent a valid JSON object: {0}. Data: {1}")]
    InvalidJsonData(serde_json::Error, String),
}

impl std::fmt::Debug for EntityUpsertedDtoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_valid_event() {
        let data = serde_json::json!({
            "id": Uuid::new_v4(),
            "entity_kind": "post",
            "entity_id": "post-7",
        })
        .to_string();

        let dto = EntityUpsertedDto::try_parsing(data.as_bytes()).unwrap();

        assert_eq!(dto.entity_kind, EntityKind::Post);
        assert_eq!(dto.entity_id, "post-7");
    }

    #[test]
    fn rejects_an_unknown_entity_kind() {
        let data = serde_json::json!({
            "id": Uuid::new_v4(),
            "entity_kind": "comment",
            "entity_id": "comment-7",
        })
        .to_string();

        assert!(EntityUpsertedDto::try_parsing(data.as_bytes()).is_err());
    }
}
