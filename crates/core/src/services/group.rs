//! Group service.

use std::sync::Arc;

use agora_common::{AppError, AppResult, IdGenerator, PlatformConfig};
use agora_db::entities::group::{self, PermissionCategory, SectorTags};
use agora_db::entities::membership::{self, AccessLevel};
use agora_db::repositories::{GroupRepository, MembershipRepository, UserRepository};
use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::services::membership::MembershipService;
use crate::services::notifier::MembershipNotifier;
use crate::services::{hierarchy, permission};

/// Separator used between a parent's and a subgroup's name.
pub const FULL_NAME_SEPARATOR: &str = " - ";

/// Input for creating a group.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupInput {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub creator_id: String,
    /// Permission category wire string; defaulted when absent.
    pub viewable_by: Option<String>,
    /// Permission category wire string; defaulted when absent.
    pub members_invitable_by: Option<String>,
    pub max_size: Option<i32>,
    #[serde(default)]
    pub cannot_contribute: bool,
    #[serde(default)]
    pub beta_features: bool,
    #[serde(default)]
    pub sectors_metric: Vec<String>,
}

/// Input for updating a group.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupInput {
    pub group_id: String,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub viewable_by: Option<String>,
    pub members_invitable_by: Option<String>,
    pub max_size: Option<Option<i32>>,
    pub cannot_contribute: Option<bool>,
    pub beta_features: Option<bool>,
    pub sectors_metric: Option<Vec<String>>,
}

/// Group response enriched with resolved hierarchy values.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: String,
    pub parent_id: Option<String>,
    pub creator_id: String,
    pub name: String,
    pub full_name: String,
    pub root_name: String,
    pub description: Option<String>,
    pub viewable_by: PermissionCategory,
    pub members_invitable_by: PermissionCategory,
    pub max_size: Option<i32>,
    /// Beta-features flag after one level of parent inheritance.
    pub beta_features: bool,
    pub cannot_contribute: bool,
    pub memberships_count: i64,
    pub archived_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl GroupResponse {
    #[must_use]
    pub fn from_model(model: group::Model, parent: Option<&group::Model>) -> Self {
        Self {
            full_name: permission::full_name(&model, parent, FULL_NAME_SEPARATOR),
            root_name: permission::root_name(&model, parent),
            beta_features: permission::effective_beta_features(&model, parent),
            max_size: permission::effective_max_size(&model, parent),
            id: model.id,
            parent_id: model.parent_id,
            creator_id: model.creator_id,
            name: model.name,
            description: model.description,
            viewable_by: model.viewable_by,
            members_invitable_by: model.members_invitable_by,
            cannot_contribute: model.cannot_contribute,
            memberships_count: model.memberships_count,
            archived_at: model.archived_at.map(Into::into),
            created_at: model.created_at.into(),
        }
    }
}

/// Service for managing groups and their memberships.
#[derive(Clone)]
pub struct GroupService {
    group_repo: GroupRepository,
    membership_repo: MembershipRepository,
    user_repo: UserRepository,
    memberships: MembershipService,
    notifier: Option<Arc<dyn MembershipNotifier>>,
    platform: PlatformConfig,
    id_gen: IdGenerator,
}

impl GroupService {
    /// Create a new group service.
    #[must_use]
    pub fn new(
        group_repo: GroupRepository,
        membership_repo: MembershipRepository,
        user_repo: UserRepository,
        platform: PlatformConfig,
    ) -> Self {
        let memberships = MembershipService::new(membership_repo.clone());
        Self {
            group_repo,
            membership_repo,
            user_repo,
            memberships,
            notifier: None,
            platform,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the membership notifier.
    pub fn set_notifier(&mut self, notifier: Arc<dyn MembershipNotifier>) {
        self.notifier = Some(notifier);
    }

    /// Get a group by ID.
    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<group::Model>> {
        self.group_repo.find_by_id(id).await
    }

    /// Get a group with its hierarchy-resolved fields.
    pub async fn get_response(&self, id: &str) -> AppResult<GroupResponse> {
        let group = self.group_repo.get_by_id(id).await?;
        let parent = self.group_repo.find_parent(&group).await?;
        Ok(GroupResponse::from_model(group, parent.as_ref()))
    }

    /// Create a new group.
    ///
    /// Defaults are filled before validation and never overwrite explicit
    /// values; the hierarchy guard then runs atomically with the insert. The
    /// creator is bootstrapped as admin unless it is the helper-bot account.
    pub async fn create(&self, input: CreateGroupInput) -> AppResult<group::Model> {
        let parent = match &input.parent_id {
            Some(parent_id) => Some(self.group_repo.get_by_id(parent_id).await?),
            None => None,
        };

        let mut viewable_by = parse_category(input.viewable_by.as_deref())?;
        let mut members_invitable_by = parse_category(input.members_invitable_by.as_deref())?;
        let mut max_size = input.max_size;

        permission::fill_defaults(
            parent.is_some(),
            &mut viewable_by,
            &mut members_invitable_by,
            &mut max_size,
            self.platform.default_group_max_size,
        );

        hierarchy::validate(
            &input.name,
            input.description.as_deref(),
            parent.as_ref(),
            max_size,
        )?;

        let creator = self.user_repo.get_by_id(&input.creator_id).await?;
        let group_id = self.id_gen.generate();
        let now = Utc::now();

        let model = group::ActiveModel {
            id: Set(group_id.clone()),
            parent_id: Set(input.parent_id),
            creator_id: Set(creator.id.clone()),
            name: Set(input.name),
            description: Set(input.description),
            // Filled above; absent only if fill_defaults were skipped.
            viewable_by: Set(viewable_by.unwrap_or(PermissionCategory::Members)),
            members_invitable_by: Set(
                members_invitable_by.unwrap_or(PermissionCategory::Members)
            ),
            max_size: Set(max_size),
            cannot_contribute: Set(input.cannot_contribute),
            beta_features: Set(input.beta_features),
            sectors_metric: Set(SectorTags(input.sectors_metric)),
            memberships_count: Set(0),
            archived_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };

        let group = self.group_repo.create(model).await?;

        if !creator.is_helper_bot {
            self.memberships.make_admin(&group.id, &creator.id).await?;
        }

        Ok(group)
    }

    /// Update a group. The hierarchy guard re-runs against the merged state;
    /// a failure blocks the whole mutation.
    pub async fn update(&self, input: UpdateGroupInput) -> AppResult<group::Model> {
        let group = self.group_repo.get_by_id(&input.group_id).await?;
        let parent = self.group_repo.find_parent(&group).await?;

        let name = input.name.clone().unwrap_or_else(|| group.name.clone());
        let description = input
            .description
            .clone()
            .unwrap_or_else(|| group.description.clone());
        let max_size = input.max_size.unwrap_or(group.max_size);

        hierarchy::validate(&name, description.as_deref(), parent.as_ref(), max_size)?;

        let mut active: group::ActiveModel = group.into();
        active.name = Set(name);
        active.description = Set(description);
        active.max_size = Set(max_size);

        if let Some(raw) = input.viewable_by.as_deref() {
            active.viewable_by = Set(require_category(raw)?);
        }
        if let Some(raw) = input.members_invitable_by.as_deref() {
            active.members_invitable_by = Set(require_category(raw)?);
        }
        if let Some(cannot_contribute) = input.cannot_contribute {
            active.cannot_contribute = Set(cannot_contribute);
        }
        if let Some(beta_features) = input.beta_features {
            active.beta_features = Set(beta_features);
        }
        if let Some(sectors_metric) = input.sectors_metric {
            active.sectors_metric = Set(SectorTags(sectors_metric));
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.group_repo.update(active).await
    }

    /// Archive a group (soft delete).
    pub async fn archive(&self, id: &str) -> AppResult<group::Model> {
        self.group_repo.archive(id).await
    }

    /// Hard-delete a group, cascading to memberships and discussions.
    pub async fn destroy(&self, id: &str) -> AppResult<()> {
        self.group_repo.destroy(id).await
    }

    // ==================== Hierarchy Queries ====================

    /// Parent's name + separator + own name for subgroups, else own name.
    pub async fn full_name(&self, group_id: &str) -> AppResult<String> {
        let group = self.group_repo.get_by_id(group_id).await?;
        let parent = self.group_repo.find_parent(&group).await?;
        Ok(permission::full_name(&group, parent.as_ref(), FULL_NAME_SEPARATOR))
    }

    /// Name of the hierarchy root.
    pub async fn root_name(&self, group_id: &str) -> AppResult<String> {
        let group = self.group_repo.get_by_id(group_id).await?;
        let parent = self.group_repo.find_parent(&group).await?;
        Ok(permission::root_name(&group, parent.as_ref()))
    }

    /// Contact address: first admin's email, else the creator's, else the
    /// platform fallback.
    pub async fn admin_email(&self, group_id: &str) -> AppResult<String> {
        let group = self.group_repo.get_by_id(group_id).await?;

        let mut admin_emails = Vec::new();
        if let Some(first_admin) = self.membership_repo.list_admins(group_id).await?.first() {
            if let Some(user) = self.user_repo.find_by_id(&first_admin.user_id).await? {
                admin_emails.push(user.email);
            }
        }

        let creator = self.user_repo.find_by_id(&group.creator_id).await?;

        Ok(permission::resolve_admin_email(
            &admin_emails,
            creator.as_ref().map(|u| u.email.as_str()),
            &self.platform.fallback_admin_email,
        ))
    }

    /// Whether the user is an admin of this group, or of its parent.
    /// Parent-admin authority cascades down one level.
    pub async fn has_admin_user(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        let group = self.group_repo.get_by_id(group_id).await?;

        if let Some(own) = self
            .membership_repo
            .find_by_group_and_user(group_id, user_id)
            .await?
        {
            if own.access_level.is_admin() {
                return Ok(true);
            }
        }

        if let Some(parent_id) = &group.parent_id {
            if let Some(parent_membership) = self
                .membership_repo
                .find_by_group_and_user(parent_id, user_id)
                .await?
            {
                return Ok(parent_membership.access_level.is_admin());
            }
        }

        Ok(false)
    }

    /// Whether the viewer may see the group, per its visibility category.
    pub async fn can_view_group(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        let group = self.group_repo.get_by_id(group_id).await?;
        let viewer = self.viewer_for(&group, user_id).await?;
        Ok(permission::can_view(group.viewable_by, viewer))
    }

    /// List a group's subgroups in creation order. Archived subgroups are
    /// excluded.
    pub async fn subgroups(
        &self,
        parent_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<group::Model>> {
        self.group_repo.find_subgroups(parent_id, limit, offset).await
    }

    /// List a group's memberships in joining order.
    pub async fn memberships_of(
        &self,
        group_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<membership::Model>> {
        self.membership_repo.list_for_group(group_id, limit, offset).await
    }

    /// List the groups a user belongs to, most recent first.
    pub async fn memberships_for_user(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<membership::Model>> {
        self.membership_repo.list_for_user(user_id, limit, offset).await
    }

    // ==================== Membership Operations ====================

    /// Look up the user's membership in a group.
    pub async fn membership(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<Option<membership::Model>> {
        self.membership_repo
            .find_by_group_and_user(group_id, user_id)
            .await
    }

    /// Whether the user may file a join request: the group is a root group,
    /// or the user already holds a membership in the group's parent.
    pub async fn user_can_join(&self, group: &group::Model, user_id: &str) -> AppResult<bool> {
        let Some(parent_id) = &group.parent_id else {
            return Ok(true);
        };

        let parent_membership = self
            .membership_repo
            .find_by_group_and_user(parent_id, user_id)
            .await?;

        Ok(parent_membership.is_some_and(|m| m.access_level.is_accepted()))
    }

    /// File a join request.
    ///
    /// Ineligible users and users who already hold a membership get a no-op
    /// (`Ok(None)`), not an error. On success the notifier fires best-effort.
    pub async fn add_join_request(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<Option<membership::Model>> {
        let group = self.group_repo.get_by_id(group_id).await?;

        if !self.user_can_join(&group, user_id).await? {
            return Ok(None);
        }

        if self.membership(group_id, user_id).await?.is_some() {
            return Ok(None);
        }

        let model = membership::ActiveModel {
            id: Set(self.id_gen.generate()),
            group_id: Set(group_id.to_string()),
            user_id: Set(user_id.to_string()),
            access_level: Set(AccessLevel::Request),
            invitation_token: Set(None),
            inviter_id: Set(None),
            group_last_viewed_at: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let Some(request) = Self::join_request_outcome(self.membership_repo.create(model).await)?
        else {
            return Ok(None);
        };

        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.membership_requested(&request).await {
                tracing::warn!(
                    membership_id = %request.id,
                    error = %e,
                    "membership request notification failed"
                );
            }
        }

        Ok(Some(request))
    }

    /// Idempotently make the user a member.
    pub async fn add_member(
        &self,
        group_id: &str,
        user_id: &str,
        inviter_id: Option<&str>,
    ) -> AppResult<membership::Model> {
        self.memberships
            .promote_to_member(group_id, user_id, inviter_id)
            .await
    }

    /// Idempotently make the user an admin.
    pub async fn add_admin(&self, group_id: &str, user_id: &str) -> AppResult<membership::Model> {
        self.memberships.make_admin(group_id, user_id).await
    }

    /// Claim a pending invitation by its token.
    pub async fn accept_invitation(
        &self,
        token: &str,
        user_id: &str,
    ) -> AppResult<membership::Model> {
        self.memberships.accept_invitation(token, user_id).await
    }

    /// Stage a pending invitation: a member-level row holding a token until
    /// the invitee claims it.
    pub async fn invite(
        &self,
        group_id: &str,
        user_id: &str,
        inviter_id: &str,
    ) -> AppResult<membership::Model> {
        let model = membership::ActiveModel {
            id: Set(self.id_gen.generate()),
            group_id: Set(group_id.to_string()),
            user_id: Set(user_id.to_string()),
            access_level: Set(AccessLevel::Member),
            invitation_token: Set(Some(self.id_gen.generate_token())),
            inviter_id: Set(Some(inviter_id.to_string())),
            group_last_viewed_at: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        self.membership_repo.create(model).await
    }

    /// Whether the group has reached its effective size limit.
    pub async fn is_full(&self, group_id: &str) -> AppResult<bool> {
        let group = self.group_repo.get_by_id(group_id).await?;
        let parent = self.group_repo.find_parent(&group).await?;

        let Some(max_size) = permission::effective_max_size(&group, parent.as_ref()) else {
            return Ok(false);
        };

        let accepted = self.membership_repo.count_accepted(group_id).await?;
        Ok(accepted >= u64::try_from(max_size).unwrap_or(0))
    }

    /// Record that the user viewed the group's activity.
    pub async fn mark_group_viewed(
        &self,
        group_id: &str,
        user_id: &str,
        at: chrono::DateTime<Utc>,
    ) -> AppResult<membership::Model> {
        self.membership_repo
            .set_group_last_viewed(group_id, user_id, at)
            .await
    }

    // ==================== Helpers ====================

    /// Collapse a lost concurrent request-creation race into the no-op
    /// outcome; the surviving row already represents the user.
    fn join_request_outcome(
        created: AppResult<membership::Model>,
    ) -> AppResult<Option<membership::Model>> {
        match created {
            Ok(request) => Ok(Some(request)),
            Err(AppError::DuplicateMembership { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn viewer_for(
        &self,
        group: &group::Model,
        user_id: &str,
    ) -> AppResult<permission::Viewer> {
        let own = self
            .membership_repo
            .find_by_group_and_user(&group.id, user_id)
            .await?;

        let parent_membership = match &group.parent_id {
            Some(parent_id) => {
                self.membership_repo
                    .find_by_group_and_user(parent_id, user_id)
                    .await?
            }
            None => None,
        };

        Ok(permission::Viewer {
            is_member: own.as_ref().is_some_and(|m| m.access_level.is_accepted()),
            is_admin: own.as_ref().is_some_and(|m| m.access_level.is_admin()),
            is_parent_group_member: parent_membership
                .is_some_and(|m| m.access_level.is_accepted()),
        })
    }
}

fn parse_category(raw: Option<&str>) -> AppResult<Option<PermissionCategory>> {
    raw.map(require_category).transpose()
}

fn require_category(raw: &str) -> AppResult<PermissionCategory> {
    PermissionCategory::parse(raw)
        .ok_or_else(|| AppError::InvalidPermissionCategory(raw.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use agora_db::test_utils::{mock_group, mock_membership};
    use async_trait::async_trait;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};

    struct CountingNotifier {
        calls: AtomicUsize,
    }

    impl CountingNotifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }

        fn count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MembershipNotifier for CountingNotifier {
        async fn membership_requested(&self, _membership: &membership::Model) -> AppResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn service_with(
        db: Arc<DatabaseConnection>,
        notifier: Arc<CountingNotifier>,
    ) -> GroupService {
        let mut service = GroupService::new(
            GroupRepository::new(db.clone()),
            MembershipRepository::new(db.clone()),
            UserRepository::new(db),
            PlatformConfig::default(),
        );
        service.set_notifier(notifier);
        service
    }

    #[tokio::test]
    async fn test_join_request_creates_request_row_and_notifies_once() {
        let request_row = mock_membership("mbr1", "grp1", "usr1", AccessLevel::Request);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[mock_group("grp1", None, "usr9", "Assembly")]])
                .append_query_results([Vec::<membership::Model>::new()])
                .append_query_results([[request_row]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let notifier = CountingNotifier::new();
        let service = service_with(db, notifier.clone());

        let result = service.add_join_request("grp1", "usr1").await.unwrap();

        assert_eq!(result.unwrap().access_level, AccessLevel::Request);
        assert_eq!(notifier.count(), 1);
    }

    #[tokio::test]
    async fn test_join_request_with_existing_membership_is_a_noop() {
        let existing = mock_membership("mbr1", "grp1", "usr1", AccessLevel::Member);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[mock_group("grp1", None, "usr9", "Assembly")]])
                .append_query_results([[existing]])
                .into_connection(),
        );
        let notifier = CountingNotifier::new();
        let service = service_with(db, notifier.clone());

        let result = service.add_join_request("grp1", "usr1").await.unwrap();

        assert!(result.is_none());
        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test]
    async fn test_join_request_on_subgroup_requires_parent_membership() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[mock_group("grp2", Some("grp1"), "usr9", "Working Group")]])
                .append_query_results([Vec::<membership::Model>::new()])
                .into_connection(),
        );
        let notifier = CountingNotifier::new();
        let service = service_with(db, notifier.clone());

        let result = service.add_join_request("grp2", "usr1").await.unwrap();

        assert!(result.is_none());
        assert_eq!(notifier.count(), 0);
    }

    #[test]
    fn test_lost_join_request_race_is_a_noop() {
        let lost: AppResult<membership::Model> = Err(AppError::DuplicateMembership {
            group_id: "grp1".to_string(),
            user_id: "usr1".to_string(),
        });
        assert!(GroupService::join_request_outcome(lost).unwrap().is_none());

        let failed: AppResult<membership::Model> = Err(AppError::Database("down".to_string()));
        assert!(GroupService::join_request_outcome(failed).is_err());
    }

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category(None).unwrap(), None);
        assert_eq!(
            parse_category(Some("admins")).unwrap(),
            Some(PermissionCategory::Admins)
        );

        let err = parse_category(Some("friends")).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PERMISSION_CATEGORY");
    }

    #[test]
    fn test_group_response_resolves_hierarchy_fields() {
        use agora_db::test_utils::mock_group;

        let mut root = mock_group("grp1", None, "usr1", "Assembly");
        root.beta_features = true;
        let sub = mock_group("grp2", Some("grp1"), "usr1", "Working Group");

        let response = GroupResponse::from_model(sub, Some(&root));

        assert_eq!(response.full_name, "Assembly - Working Group");
        assert_eq!(response.root_name, "Assembly");
        assert!(response.beta_features);
        assert_eq!(response.max_size, Some(50));
    }
}
