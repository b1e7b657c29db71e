//! Discussion and comment repository.

use std::sync::Arc;

use agora_common::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, Order,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{Comment, Discussion, comment, discussion};

/// Repository for the discussion/comment store the activity engine consumes.
#[derive(Clone)]
pub struct DiscussionRepository {
    db: Arc<DatabaseConnection>,
}

impl DiscussionRepository {
    /// Create a new discussion repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find discussion by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<discussion::Model>> {
        Discussion::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List discussions in a group, newest first.
    pub async fn find_by_group(&self, group_id: &str) -> AppResult<Vec<discussion::Model>> {
        Discussion::find()
            .filter(discussion::Column::GroupId.eq(group_id))
            .order_by(discussion::Column::CreatedAt, Order::Desc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new discussion.
    pub async fn create(&self, model: discussion::ActiveModel) -> AppResult<discussion::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Comments on the given discussions posted after `since`.
    pub async fn comments_since(
        &self,
        discussion_ids: &[String],
        since: DateTime<Utc>,
    ) -> AppResult<Vec<comment::Model>> {
        if discussion_ids.is_empty() {
            return Ok(vec![]);
        }

        Comment::find()
            .filter(comment::Column::DiscussionId.is_in(discussion_ids.iter().cloned()))
            .filter(comment::Column::CreatedAt.gt(since))
            .order_by(comment::Column::CreatedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List comments on one discussion, oldest first.
    pub async fn list_comments(
        &self,
        discussion_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(comment::Column::DiscussionId.eq(discussion_id))
            .order_by(comment::Column::CreatedAt, Order::Asc)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a comment and advance the discussion's `last_comment_at`.
    pub async fn add_comment(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        let discussion_id = match &model.discussion_id {
            ActiveValue::Set(id) => id.clone(),
            _ => return Err(AppError::Internal("comment without discussion_id".to_string())),
        };

        let posted = model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let discussion = self
            .find_by_id(&discussion_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Discussion not found: {discussion_id}")))?;

        let mut active: discussion::ActiveModel = discussion.into();
        active.last_comment_at = Set(Some(posted.created_at));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(posted)
    }
}
