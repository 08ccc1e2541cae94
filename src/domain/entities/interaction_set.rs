use serde::{Deserialize, Serialize};

/// A user's interaction history, fetched fresh per request from the
/// record store and never cached
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InteractionSet {
    pub liked_posts: Vec<String>,
    pub commented_posts: Vec<String>,
}
