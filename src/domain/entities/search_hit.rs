use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One ranked candidate returned by a similarity search.
///
/// Lists of hits are ordered by descending similarity score (cosine space,
/// [-1, 1]); ties keep the underlying index order.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchHit {
    pub entity_id: String,
    pub score: f32,
    pub payload: HashMap<String, serde_json::Value>,
}
