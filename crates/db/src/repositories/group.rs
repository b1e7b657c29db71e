//! Group repository.

use std::sync::Arc;

use agora_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::entities::{
    Comment, Discussion, DiscussionReader, Group, Membership, comment, discussion,
    discussion_reader, group, membership,
};

/// Repository for group operations.
#[derive(Clone)]
pub struct GroupRepository {
    db: Arc<DatabaseConnection>,
}

impl GroupRepository {
    /// Create a new group repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get reference to the database connection.
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Find group by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<group::Model>> {
        Group::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get group by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<group::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group not found: {id}")))
    }

    /// Find the parent of a group, if it has one.
    pub async fn find_parent(&self, group: &group::Model) -> AppResult<Option<group::Model>> {
        match &group.parent_id {
            Some(parent_id) => self.find_by_id(parent_id).await,
            None => Ok(None),
        }
    }

    /// Find subgroups of a group, excluding archived ones.
    pub async fn find_subgroups(
        &self,
        parent_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<group::Model>> {
        Group::find()
            .filter(group::Column::ParentId.eq(parent_id))
            .filter(group::Column::ArchivedAt.is_null())
            .order_by(group::Column::CreatedAt, Order::Asc)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find active (non-archived) groups.
    pub async fn find_active(&self, limit: u64, offset: u64) -> AppResult<Vec<group::Model>> {
        Group::find()
            .filter(group::Column::ArchivedAt.is_null())
            .order_by(group::Column::CreatedAt, Order::Desc)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new group.
    pub async fn create(&self, model: group::ActiveModel) -> AppResult<group::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a group.
    pub async fn update(&self, model: group::ActiveModel) -> AppResult<group::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Archive a group (soft delete).
    pub async fn archive(&self, id: &str) -> AppResult<group::Model> {
        let group = self.get_by_id(id).await?;
        let now = Utc::now();
        let mut active: group::ActiveModel = group.into();
        active.archived_at = Set(Some(now.into()));
        active.updated_at = Set(Some(now.into()));

        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Hard-delete a group together with its memberships and discussions.
    ///
    /// The cascade is explicit and runs inside one transaction: comments and
    /// read logs of the group's discussions first, then the discussions,
    /// memberships, and finally the group row itself.
    pub async fn destroy(&self, id: &str) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let discussion_ids: Vec<String> = Discussion::find()
            .filter(discussion::Column::GroupId.eq(id))
            .all(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .into_iter()
            .map(|d| d.id)
            .collect();

        if !discussion_ids.is_empty() {
            Comment::delete_many()
                .filter(comment::Column::DiscussionId.is_in(discussion_ids.clone()))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            DiscussionReader::delete_many()
                .filter(discussion_reader::Column::DiscussionId.is_in(discussion_ids))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            Discussion::delete_many()
                .filter(discussion::Column::GroupId.eq(id))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        Membership::delete_many()
            .filter(membership::Column::GroupId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Group::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::mock_group;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_by_id() {
        let group = mock_group("grp1", None, "usr1", "Open Assembly");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[group.clone()]])
                .into_connection(),
        );

        let repo = GroupRepository::new(db);
        let result = repo.find_by_id("grp1").await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().name, "Open Assembly");
    }

    #[tokio::test]
    async fn test_find_parent_of_root_skips_query() {
        let root = mock_group("grp1", None, "usr1", "Root");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let repo = GroupRepository::new(db);
        let parent = repo.find_parent(&root).await.unwrap();

        assert!(parent.is_none());
    }

    #[tokio::test]
    async fn test_find_parent_of_subgroup() {
        let root = mock_group("grp1", None, "usr1", "Root");
        let sub = mock_group("grp2", Some("grp1"), "usr1", "Sub");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[root]])
                .into_connection(),
        );

        let repo = GroupRepository::new(db);
        let parent = repo.find_parent(&sub).await.unwrap();

        assert_eq!(parent.unwrap().id, "grp1");
    }

    #[tokio::test]
    async fn test_find_subgroups() {
        let sub1 = mock_group("grp2", Some("grp1"), "usr1", "Sub A");
        let sub2 = mock_group("grp3", Some("grp1"), "usr1", "Sub B");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[sub1, sub2]])
                .into_connection(),
        );

        let repo = GroupRepository::new(db);
        let result = repo.find_subgroups("grp1", 10, 0).await.unwrap();

        assert_eq!(result.len(), 2);
    }
}
