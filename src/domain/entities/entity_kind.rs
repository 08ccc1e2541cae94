use serde::{Deserialize, Serialize};

/// The two kinds of entities indexed and recommended by this service.
///
/// Each kind maps to its own collection in the vector index and carries
/// its owning entity id under a fixed payload key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Post,
}

impl EntityKind {
    pub fn collection_name(&self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Post => "posts",
        }
    }

    /// Payload key under which every indexed point stores its owning entity id
    pub fn payload_id_key(&self) -> &'static str {
        match self {
            EntityKind::User => "user_id",
            EntityKind::Post => "post_id",
        }
    }

    /// Substituted when an entity has no text at all, so an embedding is
    /// never generated from an empty string
    pub fn fallback_embedding_text(&self) -> &'static str {
        match self {
            EntityKind::User => "user profile",
            EntityKind::Post => "post content",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::User => write!(f, "user"),
            EntityKind::Post => write!(f, "post"),
        }
    }
}
