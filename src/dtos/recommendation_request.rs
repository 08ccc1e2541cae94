use serde::{Deserialize, Serialize};

use crate::helper::error_chain_fmt;

fn default_user_limit() -> u64 {
    10
}

fn default_post_limit() -> u64 {
    20
}

fn default_exclude_following() -> bool {
    true
}

/// The retrieval operations exposed over the RPC surface
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum RecommendationRequestDto {
    RecommendUsers {
        user_id: String,
        #[serde(default = "default_user_limit")]
        limit: u64,
        #[serde(default = "default_exclude_following")]
        exclude_following: bool,
    },
    RecommendPosts {
        user_id: String,
        #[serde(default = "default_post_limit")]
        limit: u64,
    },
    RecommendPostsCollaborative {
        user_id: String,
        #[serde(default = "default_post_limit")]
        limit: u64,
    },
    SearchUsers {
        query: String,
        #[serde(default = "default_user_limit")]
        limit: u64,
    },
    SearchPosts {
        query: String,
        #[serde(default = "default_post_limit")]
        limit: u64,
    },
}

impl RecommendationRequestDto {
    pub fn try_parsing(data: &[u8]) -> Result<Self, RecommendationRequestDtoError> {
        let data = std::str::from_utf8(data)?;
        let dto = serde_json::from_str(data)
            .map_err(|e| RecommendationRequestDtoError::InvalidJsonData(e, data.to_string()))?;

        Ok(dto)
    }

    pub fn limit(&self) -> u64 {
        match self {
            Self::RecommendUsers { limit, .. }
            | Self::RecommendPosts { limit, .. }
            | Self::RecommendPostsCollaborative { limit, .. }
            | Self::SearchUsers { limit, .. }
            | Self::SearchPosts { limit, .. } => *limit,
        }
    }
}

#[derive(thiserror::Error)]
pub enum RecommendationRequestDtoError {
    #[error("Data could not be converted from utf8 u8 vector to string")]
    InvalidStringData(#[from] std::str::Utf8Error),

    #[error("Data did not represent a valid JSON object: {0}. Data: {1}")]
    InvalidJsonData(serde_json::Error, String),
}

impl std::fmt::Debug for RecommendationRequestDtoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
