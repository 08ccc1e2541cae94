use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{domain::entities::entity_kind::EntityKind, helper::error_chain_fmt};

/// Lifecycle event emitted by the main application when an entity is
/// deleted; its point is removed from the vector index
#[derive(Debug, Deserialize, Serialize)]
pub struct EntityDeletedDto {
    pub id: Uuid,
    pub entity_kind: EntityKind,
    pub entity_id: String,
}

impl EntityDeletedDto {
    pub fn try_parsing(data: &[u8]) -> Result<Self, EntityDeletedDtoError> {
        let data = std::str::from_utf8(data)?;
        let dto = serde_json::from_str(data)
            .map_err(|e| EntityDeletedDtoError::InvalidJsonData(e, data.to_string()))?;

        Ok(dto)
    }
}

#[derive(thiserror::Error)]
pub enum EntityDeletedDtoError {
    #[error("Data could not be converted from utf8 u8 vector to string")]
    InvalidStringData(#[from] std::str::Utf8Error),

    #[error("Data did not represent a valid JSON object: {0}. Data: {1}")]
    InvalidJsonData(serde_json::Error, String),
}

impl std::fmt::Debug for EntityDeletedDtoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
