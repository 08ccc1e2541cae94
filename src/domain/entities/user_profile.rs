use serde::{Deserialize, Serialize};

use super::entity_kind::EntityKind;

/// Transient copy of a user fetched from the record store for one request.
/// The service never owns users, it only reads them.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

impl UserProfile {
    /// Text the user's embedding is generated from: the present optional
    /// fields concatenated in a fixed order, separated by single spaces.
    ///
    /// An entirely empty profile falls back to a fixed phrase so the
    /// embedding is never generated from an empty string.
    pub fn embedding_text(&self) -> String {
        let text = [&self.first_name, &self.last_name, &self.bio]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<&str>>()
            .join(" ");

        if text.trim().is_empty() {
            EntityKind::User.fallback_embedding_text().to_string()
        } else {
            text
        }
    }
}
