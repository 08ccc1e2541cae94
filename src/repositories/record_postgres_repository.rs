use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    domain::entities::{
        interaction_set::InteractionSet, post_record::PostRecord, user_profile::UserProfile,
    },
    ports::record_store::{RecordStore, RecordStoreError},
};

/// Accepted follow relationship; pending or rejected follows are not
/// "following" for recommendation purposes
const FOLLOW_STATUS_ACCEPTED: i32 = 2;

/// `RecordStore` implemented over the social application's Postgres database.
///
/// The service only reads: entities stay owned by the main application.
pub struct RecordPostgresRepository {
    pool: PgPool,
}

impl RecordPostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> Result<UserProfile, sqlx::Error> {
    Ok(UserProfile {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        bio: row.try_get("bio")?,
    })
}

fn post_from_row(row: &PgRow) -> Result<PostRecord, sqlx::Error> {
    Ok(PostRecord {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        body: row.try_get("body")?,
    })
}

#[async_trait]
impl RecordStore for RecordPostgresRepository {
    #[tracing::instrument(name = "Fetching user from database", skip(self))]
    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, RecordStoreError> {
        let row = sqlx::query("SELECT id, first_name, last_name, bio FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RecordStoreError::Unavailable(e.to_string()))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| RecordStoreError::Unavailable(e.to_string()))
    }

    #[tracing::instrument(name = "Fetching post from database", skip(self))]
    async fn get_post(&self, post_id: &str) -> Result<Option<PostRecord>, RecordStoreError> {
        let row = sqlx::query("SELECT id, author_id, body FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RecordStoreError::Unavailable(e.to_string()))?;

        row.as_ref()
            .map(post_from_row)
            .transpose()
            .map_err(|e| RecordStoreError::Unavailable(e.to_string()))
    }

    /// Missing ids are silently omitted from the result
    #[tracing::instrument(name = "Fetching users by ids from database", skip(self, user_ids))]
    async fn get_users_by_ids(
        &self,
        user_ids: &[String],
    ) -> Result<Vec<UserProfile>, RecordStoreError> {
        let rows =
            sqlx::query("SELECT id, first_name, last_name, bio FROM users WHERE id = ANY($1)")
                .bind(user_ids)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| RecordStoreError::Unavailable(e.to_string()))?;

        rows.iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RecordStoreError::Unavailable(e.to_string()))
    }

    /// Missing ids are silently omitted from the result
    #[tracing::instrument(name = "Fetching posts by ids from database", skip(self, post_ids))]
    async fn get_posts_by_ids(
        &self,
        post_ids: &[String],
    ) -> Result<Vec<PostRecord>, RecordStoreError> {
        let rows = sqlx::query("SELECT id, author_id, body FROM posts WHERE id = ANY($1)")
            .bind(post_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RecordStoreError::Unavailable(e.to_string()))?;

        rows.iter()
            .map(post_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RecordStoreError::Unavailable(e.to_string()))
    }

    #[tracing::instrument(name = "Fetching all users from database", skip(self))]
    async fn get_all_users(&self) -> Result<Vec<UserProfile>, RecordStoreError> {
        let rows = sqlx::query("SELECT id, first_name, last_name, bio FROM users")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RecordStoreError::Unavailable(e.to_string()))?;

        rows.iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RecordStoreError::Unavailable(e.to_string()))
    }

    #[tracing::instrument(name = "Fetching all posts from database", skip(self))]
    async fn get_all_posts(&self) -> Result<Vec<PostRecord>, RecordStoreError> {
        let rows = sqlx::query("SELECT id, author_id, body FROM posts")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RecordStoreError::Unavailable(e.to_string()))?;

        rows.iter()
            .map(post_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RecordStoreError::Unavailable(e.to_string()))
    }

    #[tracing::instrument(name = "Fetching following list from database", skip(self))]
    async fn get_following(&self, user_id: &str) -> Result<Vec<String>, RecordStoreError> {
        let rows =
            sqlx::query("SELECT followee_id FROM follows WHERE follower_id = $1 AND status = $2")
                .bind(user_id)
                .bind(FOLLOW_STATUS_ACCEPTED)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| RecordStoreError::Unavailable(e.to_string()))?;

        rows.iter()
            .map(|row| row.try_get("followee_id"))
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| RecordStoreError::Unavailable(e.to_string()))
    }

    #[tracing::instrument(name = "Fetching interactions from database", skip(self))]
    async fn get_interactions(&self, user_id: &str) -> Result<InteractionSet, RecordStoreError> {
        let liked_rows = sqlx::query("SELECT post_id FROM post_reactions WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RecordStoreError::Unavailable(e.to_string()))?;

        let commented_rows = sqlx::query("SELECT post_id FROM post_comments WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RecordStoreError::Unavailable(e.to_string()))?;

        let liked_posts = liked_rows
            .iter()
            .map(|row| row.try_get("post_id"))
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| RecordStoreError::Unavailable(e.to_string()))?;

        let commented_posts = commented_rows
            .iter()
            .map(|row| row.try_get("post_id"))
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| RecordStoreError::Unavailable(e.to_string()))?;

        Ok(InteractionSet {
            liked_posts,
            commented_posts,
        })
    }
}
