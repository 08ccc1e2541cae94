use serde::{Deserialize, Serialize};

use crate::helper::error_chain_fmt;

/// The administrative operations exposed over the RPC surface
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum AdminRequestDto {
    /// Bulk embed-and-index of existing entities. Without id lists the
    /// whole record store is walked; with them only those ids are processed.
    InitializeEmbeddings {
        #[serde(default)]
        user_ids: Option<Vec<String>>,
        #[serde(default)]
        post_ids: Option<Vec<String>>,
    },
    Status,
}

impl AdminRequestDto {
    pub fn try_parsing(data: &[u8]) -> Result<Self, AdminRequestDtoError> {
        let data = std::str::from_utf8(data)?;
        let dto = serde_json::from_str(data)
            .map_err(|e| AdminRequestDtoError::InvalidJsonData(e, data.to_string()))?;

        Ok(dto)
    }
}

#[derive(thiserror::Error)]
pub enum AdminRequestDtoError {
    #[error("Data could not be converted from utf8 u8 vector to string")]
    InvalidStringData(#[from] std::str::Utf8Error),

    #[error("Data did not represent a valid JSON object: {0}. Data: {1}")]
    InvalidJsonData(serde_json::Error, String),
}

impl std::fmt::Debug for AdminRequestDtoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_backfill_request_defaults_to_walking_everything() {
        let data = r#"{"operation": "initialize_embeddings"}"#;

        let dto = AdminRequestDto::try_parsing(data.as_bytes()).unwrap();

        match dto {
            AdminRequestDto::InitializeEmbeddings { user_ids, post_ids } => {
                assert!(user_ids.is_none());
                assert!(post_ids.is_none());
            }
            other => panic!("Unexpected operation: {:?}", other),
        }
    }

    #[test]
    fn a_scoped_backfill_request_carries_its_ids() {
        let data = r#"{"operation": "initialize_embeddings", "user_ids": ["u1", "u2"]}"#;

        let dto = AdminRequestDto::try_parsing(data.as_bytes()).unwrap();

        match dto {
            AdminRequestDto::InitializeEmbeddings { user_ids, post_ids } => {
                assert_eq!(user_ids.unwrap(), vec!["u1", "u2"]);
                assert!(post_ids.is_none());
            }
            other => panic!("Unexpected operation: {:?}", other),
        }
    }

    #[test]
    fn parses_a_status_request() {
        let data = r#"{"operation": "status"}"#;

        let dto = AdminRequestDto::try_parsing(data.as_bytes()).unwrap();
        assert!(matches!(dto, AdminRequestDto::Status));
    }
}
