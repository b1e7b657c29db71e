//! Membership repository.

use std::sync::Arc;

use agora_common::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};

use crate::entities::membership::AccessLevel;
use crate::entities::{Group, Membership, group, membership};

/// Repository for membership operations.
#[derive(Clone)]
pub struct MembershipRepository {
    db: Arc<DatabaseConnection>,
}

impl MembershipRepository {
    /// Create a new membership repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the membership for a (group, user) pair.
    pub async fn find_by_group_and_user(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<Option<membership::Model>> {
        Membership::find()
            .filter(membership::Column::GroupId.eq(group_id))
            .filter(membership::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the membership for a (group, user) pair, or `MembershipNotFound`.
    pub async fn get_by_group_and_user(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<membership::Model> {
        self.find_by_group_and_user(group_id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::MembershipNotFound(format!("user {user_id} in group {group_id}"))
            })
    }

    /// Find a membership by its invitation token.
    pub async fn find_by_invitation_token(
        &self,
        token: &str,
    ) -> AppResult<Option<membership::Model>> {
        Membership::find()
            .filter(membership::Column::InvitationToken.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new membership row and bump the group's denormalized count.
    /// Insert and bump run in one transaction so a failure between the two
    /// never leaves the count stale.
    ///
    /// A losing concurrent insert for the same (group, user) pair hits the
    /// unique index and is surfaced as `DuplicateMembership`; the caller
    /// retries as a lookup followed by a transition.
    pub async fn create(&self, model: membership::ActiveModel) -> AppResult<membership::Model> {
        let group_id = match &model.group_id {
            ActiveValue::Set(id) => id.clone(),
            _ => return Err(AppError::Internal("membership without group_id".to_string())),
        };
        let user_id = match &model.user_id {
            ActiveValue::Set(id) => id.clone(),
            _ => return Err(AppError::Internal("membership without user_id".to_string())),
        };

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let member = model.insert(&txn).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::DuplicateMembership { group_id, user_id }
            } else {
                AppError::Database(e.to_string())
            }
        })?;

        Group::update_many()
            .col_expr(
                group::Column::MembershipsCount,
                Expr::col(group::Column::MembershipsCount).add(1),
            )
            .filter(group::Column::Id.eq(member.group_id.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(member)
    }

    /// Update a membership row.
    pub async fn update(&self, model: membership::ActiveModel) -> AppResult<membership::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Remove a membership and decrement the group's denormalized count,
    /// both in one transaction.
    pub async fn remove(&self, group_id: &str, user_id: &str) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let deleted = Membership::delete_many()
            .filter(membership::Column::GroupId.eq(group_id))
            .filter(membership::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if deleted.rows_affected > 0 {
            Group::update_many()
                .col_expr(
                    group::Column::MembershipsCount,
                    Expr::cust("GREATEST(memberships_count - 1, 0)").into(),
                )
                .filter(group::Column::Id.eq(group_id))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List memberships of a group, oldest first.
    pub async fn list_for_group(
        &self,
        group_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<membership::Model>> {
        Membership::find()
            .filter(membership::Column::GroupId.eq(group_id))
            .order_by(membership::Column::CreatedAt, Order::Asc)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List memberships held by a user across groups.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<membership::Model>> {
        Membership::find()
            .filter(membership::Column::UserId.eq(user_id))
            .order_by(membership::Column::CreatedAt, Order::Desc)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List admin memberships of a group, oldest first.
    ///
    /// The ascending order defines the "first admin" used for the group's
    /// contact address.
    pub async fn list_admins(&self, group_id: &str) -> AppResult<Vec<membership::Model>> {
        Membership::find()
            .filter(membership::Column::GroupId.eq(group_id))
            .filter(membership::Column::AccessLevel.eq(AccessLevel::Admin))
            .order_by(membership::Column::CreatedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count accepted (member or admin) memberships in a group.
    pub async fn count_accepted(&self, group_id: &str) -> AppResult<u64> {
        Membership::find()
            .filter(membership::Column::GroupId.eq(group_id))
            .filter(
                membership::Column::AccessLevel
                    .is_in([AccessLevel::Member, AccessLevel::Admin]),
            )
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record when the user last viewed the group's activity.
    pub async fn set_group_last_viewed(
        &self,
        group_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<membership::Model> {
        let member = self.get_by_group_and_user(group_id, user_id).await?;

        let mut active: membership::ActiveModel = member.into();
        active.group_last_viewed_at = Set(Some(at.into()));
        active.updated_at = Set(Some(Utc::now().into()));

        self.update(active).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::mock_membership;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_find_by_group_and_user() {
        let member = mock_membership("mbr1", "grp1", "usr1", AccessLevel::Member);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[member]])
                .into_connection(),
        );

        let repo = MembershipRepository::new(db);
        let result = repo.find_by_group_and_user("grp1", "usr1").await.unwrap();

        assert_eq!(result.unwrap().access_level, AccessLevel::Member);
    }

    #[tokio::test]
    async fn test_get_missing_membership_is_membership_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<membership::Model>::new()])
                .into_connection(),
        );

        let repo = MembershipRepository::new(db);
        let err = repo.get_by_group_and_user("grp1", "usr9").await.unwrap_err();

        assert_eq!(err.error_code(), "MEMBERSHIP_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_create_bumps_count_in_same_transaction() {
        let created = mock_membership("mbr1", "grp1", "usr1", AccessLevel::Request);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[created]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = MembershipRepository::new(db.clone());
        let model = membership::ActiveModel {
            id: Set("mbr1".to_string()),
            group_id: Set("grp1".to_string()),
            user_id: Set("usr1".to_string()),
            access_level: Set(AccessLevel::Request),
            invitation_token: Set(None),
            inviter_id: Set(None),
            group_last_viewed_at: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let member = repo.create(model).await.unwrap();
        assert_eq!(member.group_id, "grp1");

        drop(repo);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        // Insert and count bump grouped under one BEGIN/COMMIT.
        assert_eq!(log.len(), 1);
        let rendered = format!("{log:?}");
        assert!(rendered.contains("memberships_count"));
    }

    #[tokio::test]
    async fn test_remove_missing_membership_skips_count_update() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = MembershipRepository::new(db.clone());
        repo.remove("grp1", "usr9").await.unwrap();

        drop(repo);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 1);
        let rendered = format!("{log:?}");
        assert!(!rendered.contains("memberships_count"));
    }

    #[tokio::test]
    async fn test_list_admins() {
        let admin1 = mock_membership("mbr1", "grp1", "usr1", AccessLevel::Admin);
        let admin2 = mock_membership("mbr2", "grp1", "usr2", AccessLevel::Admin);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[admin1, admin2]])
                .into_connection(),
        );

        let repo = MembershipRepository::new(db);
        let admins = repo.list_admins("grp1").await.unwrap();

        assert_eq!(admins.len(), 2);
        assert_eq!(admins[0].id, "mbr1");
    }
}
