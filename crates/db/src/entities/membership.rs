//! Membership entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Access level of a membership. Transitions are monotonic:
/// request -> member -> admin, never demoted by this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[derive(Default)]
pub enum AccessLevel {
    /// A pending, self-initiated join request.
    #[sea_orm(string_value = "request")]
    #[default]
    Request,
    /// An accepted member.
    #[sea_orm(string_value = "member")]
    Member,
    /// A group admin.
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl AccessLevel {
    /// Position in the monotonic promotion order.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Request => 0,
            Self::Member => 1,
            Self::Admin => 2,
        }
    }

    /// Whether this level grants admin rights.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Whether this level represents an accepted relationship.
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Member | Self::Admin)
    }
}

/// Membership - one user's relationship to one group.
///
/// At most one row exists per (`group_id`, `user_id`) pair; the unique index
/// created by the migrations is the serialization point for concurrent
/// creation attempts.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "membership")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The group the membership belongs to.
    #[sea_orm(indexed)]
    pub group_id: String,

    /// The user holding the membership.
    #[sea_orm(indexed)]
    pub user_id: String,

    /// Current access level.
    pub access_level: AccessLevel,

    /// Present while the row represents a pending invitation rather than an
    /// accepted relationship.
    #[sea_orm(nullable)]
    pub invitation_token: Option<String>,

    /// User who promoted/invited this member, if any.
    #[sea_orm(indexed, nullable)]
    pub inviter_id: Option<String>,

    /// Last time the user viewed the group's activity. Null means never.
    #[sea_orm(nullable)]
    pub group_last_viewed_at: Option<DateTimeWithTimeZone>,

    /// When the membership was created.
    pub created_at: DateTimeWithTimeZone,

    /// When the membership was last updated.
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id",
        on_delete = "Cascade"
    )]
    Group,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::InviterId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Inviter,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
