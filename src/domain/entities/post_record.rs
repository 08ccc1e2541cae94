use serde::{Deserialize, Serialize};

use super::entity_kind::EntityKind;

/// Transient copy of a post fetched from the record store for one request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostRecord {
    pub id: String,
    pub author_id: String,
    pub body: String,
}

impl PostRecord {
    /// Text the post's embedding is generated from, with the fixed fallback
    /// phrase when the body is empty
    pub fn embedding_text(&self) -> String {
        if self.body.trim().is_empty() {
            EntityKind::Post.fallback_embedding_text().to_string()
        } else {
            self.body.clone()
        }
    }
}
