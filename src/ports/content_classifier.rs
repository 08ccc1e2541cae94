use async_trait::async_trait;

use crate::{domain::entities::moderation_verdict::CategoryScores, helper::error_chain_fmt};

/// Capability to score a text over the fixed six-category toxicity taxonomy.
///
/// Backends are interchangeable (rule-based or model-based) and selected at
/// composition time; callers depend only on this trait. An unavailable
/// backend must surface as an error, never as an all-clear score.
#[async_trait]
pub trait ContentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<CategoryScores, ContentClassifierError>;
}

#[derive(thiserror::Error)]
pub enum ContentClassifierError {
    #[error("Classifier backend unavailable: {0}")]
    Unavailable(String),
}

impl std::fmt::Debug for ContentClassifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
