use serde::{Deserialize, Serialize};

use super::templates::rpc_response::RpcResponse;
use crate::{domain::entities::moderation_verdict::ModerationVerdict, helper::error_chain_fmt};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ModerateTextRequestDto {
    pub text: String,
    #[serde(default = "default_true")]
    pub check_toxicity: bool,
    #[serde(default = "default_true")]
    pub check_spam: bool,
}

impl ModerateTextRequestDto {
    pub fn try_parsing(data: &[u8]) -> Result<Self, ModerateTextRequestDtoError> {
        let data = std::str::from_utf8(data)?;
        let dto = serde_json::from_str(data)
            .map_err(|e| ModerateTextRequestDtoError::InvalidJsonData(e, data.to_string()))?;

        Ok(dto)
    }
}

pub type ModerateTextResponseDto = RpcResponse<ModerationVerdict>;

#[derive(thiserror::Error)]
pub enum ModerateTextRequestDtoError {
    #[error("Data could not be converted from utf8 u8 vector to string")]
    InvalidStringData(#[from] std::str::Utf8Error),

    #[error("Data did not represent a valid JSON object: {0}. Data: {1}")]
    InvalidJsonData(serde_json::Error, String),
}

impl std::fmt::Debug for ModerateTextRequestDtoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
