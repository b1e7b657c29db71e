//! Discussion read-log entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Tracks, per user and per discussion, when the user last read it.
///
/// At most one row exists per (`discussion_id`, `user_id`) pair.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "discussion_reader")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Discussion that was read.
    #[sea_orm(indexed)]
    pub discussion_id: String,

    /// User who read it.
    #[sea_orm(indexed)]
    pub user_id: String,

    /// When the user last viewed the discussion.
    pub last_viewed_at: DateTimeWithTimeZone,

    /// When the read log row was first created.
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::discussion::Entity",
        from = "Column::DiscussionId",
        to = "super::discussion::Column::Id",
        on_delete = "Cascade"
    )]
    Discussion,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::discussion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Discussion.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
