//! Discussion read-log repository.

use std::sync::Arc;

use agora_common::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::entities::{DiscussionReader, discussion_reader};

/// Repository for per-user, per-discussion read logs.
#[derive(Clone)]
pub struct DiscussionReaderRepository {
    db: Arc<DatabaseConnection>,
}

impl DiscussionReaderRepository {
    /// Create a new read-log repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the read log for one (discussion, user) pair.
    pub async fn find_one(
        &self,
        discussion_id: &str,
        user_id: &str,
    ) -> AppResult<Option<discussion_reader::Model>> {
        DiscussionReader::find()
            .filter(discussion_reader::Column::DiscussionId.eq(discussion_id))
            .filter(discussion_reader::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Read logs a user holds for any of the given discussions.
    pub async fn find_for_user(
        &self,
        user_id: &str,
        discussion_ids: &[String],
    ) -> AppResult<Vec<discussion_reader::Model>> {
        if discussion_ids.is_empty() {
            return Ok(vec![]);
        }

        DiscussionReader::find()
            .filter(discussion_reader::Column::UserId.eq(user_id))
            .filter(discussion_reader::Column::DiscussionId.is_in(discussion_ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record that the user viewed a discussion at `at`, creating the read
    /// log on first view and advancing it afterwards.
    pub async fn mark_read(
        &self,
        id: String,
        discussion_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<discussion_reader::Model> {
        if let Some(existing) = self.find_one(discussion_id, user_id).await? {
            let mut active: discussion_reader::ActiveModel = existing.into();
            active.last_viewed_at = Set(at.into());
            return active
                .update(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()));
        }

        let model = discussion_reader::ActiveModel {
            id: Set(id),
            discussion_id: Set(discussion_id.to_string()),
            user_id: Set(user_id.to_string()),
            last_viewed_at: Set(at.into()),
            created_at: Set(Utc::now().into()),
        };

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::mock_read_log;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_for_user_empty_ids_skips_query() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let repo = DiscussionReaderRepository::new(db);
        let result = repo.find_for_user("usr1", &[]).await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_find_one() {
        let log = mock_read_log("rdr1", "dsc1", "usr1", Utc::now());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[log]])
                .into_connection(),
        );

        let repo = DiscussionReaderRepository::new(db);
        let result = repo.find_one("dsc1", "usr1").await.unwrap();

        assert_eq!(result.unwrap().discussion_id, "dsc1");
    }
}
