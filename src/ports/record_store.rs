use async_trait::async_trait;

use crate::{
    domain::entities::{
        interaction_set::InteractionSet, post_record::PostRecord, user_profile::UserProfile,
    },
    helper::error_chain_fmt,
};

/// Capability to read entities and their relationships from durable storage.
///
/// An absent entity is a normal occurrence, not a fault: single lookups
/// return `None` and batch lookups silently omit missing ids.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, RecordStoreError>;

    async fn get_post(&self, post_id: &str) -> Result<Option<PostRecord>, RecordStoreError>;

    async fn get_users_by_ids(
        &self,
        user_ids: &[String],
    ) -> Result<Vec<UserProfile>, RecordStoreError>;

    async fn get_posts_by_ids(
        &self,
        post_ids: &[String],
    ) -> Result<Vec<PostRecord>, RecordStoreError>;

    /// Every user in the store, for the one-time embedding backfill
    async fn get_all_users(&self) -> Result<Vec<UserProfile>, RecordStoreError>;

    async fn get_all_posts(&self) -> Result<Vec<PostRecord>, RecordStoreError>;

    /// Ids of the users that `user_id` follows
    async fn get_following(&self, user_id: &str) -> Result<Vec<String>, RecordStoreError>;

    async fn get_interactions(&self, user_id: &str) -> Result<InteractionSet, RecordStoreError>;
}

#[derive(thiserror::Error)]
pub enum RecordStoreError {
    #[error("Error from the record store: {0}")]
    Unavailable(String),
}

impl std::fmt::Debug for RecordStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
