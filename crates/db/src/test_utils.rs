//! Test utilities for database operations.
//!
//! Model builders shared by repository and service tests.

use chrono::{DateTime, Utc};

use crate::entities::group::{PermissionCategory, SectorTags};
use crate::entities::membership::AccessLevel;
use crate::entities::{comment, discussion, discussion_reader, group, membership, user};

/// Build a user model for tests.
#[must_use]
pub fn mock_user(id: &str, username: &str, email: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: username.to_string(),
        email: email.to_string(),
        is_helper_bot: false,
        created_at: Utc::now().into(),
    }
}

/// Build a group model for tests. Root groups get `max_size = 50`.
#[must_use]
pub fn mock_group(
    id: &str,
    parent_id: Option<&str>,
    creator_id: &str,
    name: &str,
) -> group::Model {
    let is_root = parent_id.is_none();
    group::Model {
        id: id.to_string(),
        parent_id: parent_id.map(ToString::to_string),
        creator_id: creator_id.to_string(),
        name: name.to_string(),
        description: None,
        viewable_by: if is_root {
            PermissionCategory::Members
        } else {
            PermissionCategory::ParentGroupMembers
        },
        members_invitable_by: PermissionCategory::Members,
        max_size: is_root.then_some(50),
        cannot_contribute: false,
        beta_features: false,
        sectors_metric: SectorTags::default(),
        memberships_count: 0,
        archived_at: None,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

/// Build a membership model for tests.
#[must_use]
pub fn mock_membership(
    id: &str,
    group_id: &str,
    user_id: &str,
    access_level: AccessLevel,
) -> membership::Model {
    membership::Model {
        id: id.to_string(),
        group_id: group_id.to_string(),
        user_id: user_id.to_string(),
        access_level,
        invitation_token: None,
        inviter_id: None,
        group_last_viewed_at: None,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

/// Build a discussion model for tests.
#[must_use]
pub fn mock_discussion(
    id: &str,
    group_id: &str,
    author_id: &str,
    created_at: DateTime<Utc>,
    last_comment_at: Option<DateTime<Utc>>,
) -> discussion::Model {
    discussion::Model {
        id: id.to_string(),
        group_id: group_id.to_string(),
        author_id: author_id.to_string(),
        title: format!("Discussion {id}"),
        created_at: created_at.into(),
        last_comment_at: last_comment_at.map(Into::into),
    }
}

/// Build a comment model for tests.
#[must_use]
pub fn mock_comment(
    id: &str,
    discussion_id: &str,
    author_id: &str,
    created_at: DateTime<Utc>,
) -> comment::Model {
    comment::Model {
        id: id.to_string(),
        discussion_id: discussion_id.to_string(),
        author_id: author_id.to_string(),
        body: "A comment".to_string(),
        created_at: created_at.into(),
    }
}

/// Build a discussion read-log model for tests.
#[must_use]
pub fn mock_read_log(
    id: &str,
    discussion_id: &str,
    user_id: &str,
    last_viewed_at: DateTime<Utc>,
) -> discussion_reader::Model {
    discussion_reader::Model {
        id: id.to_string(),
        discussion_id: discussion_id.to_string(),
        user_id: user_id.to_string(),
        last_viewed_at: last_viewed_at.into(),
        created_at: Utc::now().into(),
    }
}
