//! Membership state machine.
//!
//! One user's relationship to one group moves request -> member -> admin.
//! Transitions are monotonic: reaching a level a membership already holds
//! (or exceeds) is a no-op, never a demotion.

use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::entities::membership::{self, AccessLevel};
use agora_db::repositories::MembershipRepository;
use chrono::Utc;
use sea_orm::Set;

/// Result of the canonical find-or-build entry point: the existing row if
/// present, else a staged unsaved one.
pub enum FoundOrBuilt {
    /// A membership row already exists for the (group, user) pair.
    Existing(membership::Model),
    /// No row exists yet; this staged model has not been persisted.
    Built(membership::ActiveModel),
}

/// The level a membership holds after a monotonic transition toward `target`.
#[must_use]
pub const fn next_level(current: AccessLevel, target: AccessLevel) -> AccessLevel {
    if target.rank() > current.rank() {
        target
    } else {
        current
    }
}

/// Service owning membership lifecycle transitions.
#[derive(Clone)]
pub struct MembershipService {
    membership_repo: MembershipRepository,
    id_gen: IdGenerator,
}

impl MembershipService {
    /// Create a new membership service.
    #[must_use]
    pub const fn new(membership_repo: MembershipRepository) -> Self {
        Self {
            membership_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Look up the membership for a (group, user) pair, or stage a new
    /// unsaved row. Creating a second row for the same pair fails with
    /// `DuplicateMembership`, so callers transition the existing row instead.
    pub async fn find_or_build_for_user(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<FoundOrBuilt> {
        if let Some(existing) = self
            .membership_repo
            .find_by_group_and_user(group_id, user_id)
            .await?
        {
            return Ok(FoundOrBuilt::Existing(existing));
        }

        Ok(FoundOrBuilt::Built(membership::ActiveModel {
            id: Set(self.id_gen.generate()),
            group_id: Set(group_id.to_string()),
            user_id: Set(user_id.to_string()),
            access_level: Set(AccessLevel::Request),
            invitation_token: Set(None),
            inviter_id: Set(None),
            group_last_viewed_at: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        }))
    }

    /// Idempotently bring the user's membership to `member`.
    pub async fn promote_to_member(
        &self,
        group_id: &str,
        user_id: &str,
        inviter_id: Option<&str>,
    ) -> AppResult<membership::Model> {
        self.ensure_level(group_id, user_id, AccessLevel::Member, inviter_id)
            .await
    }

    /// Idempotently bring the user's membership to `admin`.
    pub async fn make_admin(&self, group_id: &str, user_id: &str) -> AppResult<membership::Model> {
        self.ensure_level(group_id, user_id, AccessLevel::Admin, None)
            .await
    }

    /// Claim a pending invitation by its token, accepting it as `member`.
    pub async fn accept_invitation(
        &self,
        token: &str,
        user_id: &str,
    ) -> AppResult<membership::Model> {
        let invited = self
            .membership_repo
            .find_by_invitation_token(token)
            .await?
            .ok_or_else(|| {
                AppError::MembershipNotFound(format!("no membership for token {token}"))
            })?;

        if invited.user_id != user_id {
            return Err(AppError::Forbidden("not your invitation".to_string()));
        }

        self.promote_to_member(&invited.group_id, user_id, invited.inviter_id.as_deref())
            .await
    }

    /// Reach `target` for the (group, user) pair, creating the row if needed.
    ///
    /// A losing concurrent create surfaces `DuplicateMembership`; per the
    /// retry contract it is replayed once as a lookup-then-transition.
    async fn ensure_level(
        &self,
        group_id: &str,
        user_id: &str,
        target: AccessLevel,
        inviter_id: Option<&str>,
    ) -> AppResult<membership::Model> {
        match self.find_or_build_for_user(group_id, user_id).await? {
            FoundOrBuilt::Existing(existing) => {
                self.transition(existing, target, inviter_id).await
            }
            FoundOrBuilt::Built(mut staged) => {
                staged.access_level = Set(target);
                staged.inviter_id = Set(inviter_id.map(ToString::to_string));

                let created = self.membership_repo.create(staged).await;
                self.resolve_create_race(created, group_id, user_id, target, inviter_id)
                    .await
            }
        }
    }

    /// Resolve the outcome of a raw create. A losing concurrent insert
    /// surfaces `DuplicateMembership` and is replayed once as a lookup
    /// followed by a transition on the winner's row.
    async fn resolve_create_race(
        &self,
        created: AppResult<membership::Model>,
        group_id: &str,
        user_id: &str,
        target: AccessLevel,
        inviter_id: Option<&str>,
    ) -> AppResult<membership::Model> {
        match created {
            Ok(created) => Ok(created),
            Err(AppError::DuplicateMembership { .. }) => {
                let existing = self
                    .membership_repo
                    .get_by_group_and_user(group_id, user_id)
                    .await?;
                self.transition(existing, target, inviter_id).await
            }
            Err(e) => Err(e),
        }
    }

    /// Apply a monotonic transition to an existing row.
    async fn transition(
        &self,
        existing: membership::Model,
        target: AccessLevel,
        inviter_id: Option<&str>,
    ) -> AppResult<membership::Model> {
        let level = next_level(existing.access_level, target);
        if level == existing.access_level && existing.invitation_token.is_none() {
            return Ok(existing);
        }

        let had_inviter = existing.inviter_id.is_some();
        let mut active: membership::ActiveModel = existing.into();
        active.access_level = Set(level);
        // Acceptance consumes any pending invitation token.
        active.invitation_token = Set(None);
        if !had_inviter {
            if let Some(inviter_id) = inviter_id {
                active.inviter_id = Set(Some(inviter_id.to_string()));
            }
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.membership_repo.update(active).await
    }
}
