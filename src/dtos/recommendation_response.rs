use serde::{Deserialize, Serialize};

use super::templates::rpc_response::RpcResponse;

/// Parallel arrays of ids and scores in descending score order;
/// `total` always equals the length of the returned arrays
#[derive(Debug, Deserialize, Serialize)]
pub struct RecommendationResponseData {
    pub ids: Vec<String>,
    pub scores: Vec<f32>,
    pub total: usize,
}

impl RecommendationResponseData {
    pub fn from_ranked(ranked: Vec<(String, f32)>) -> Self {
        let total = ranked.len();
        let (ids, scores) = ranked.into_iter().unzip();

        Self { ids, scores, total }
    }
}

pub type RecommendationResponseDto = RpcResponse<RecommendationResponseData>;
