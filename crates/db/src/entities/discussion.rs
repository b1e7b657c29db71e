//! Discussion entity.
//!
//! Discussion content is owned by a collaborator; agora only consumes the
//! timestamps the unread-activity engine needs.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Discussion - a thread of comments within a group.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "discussion")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Group the discussion belongs to.
    #[sea_orm(indexed)]
    pub group_id: String,

    /// User who opened the discussion.
    #[sea_orm(indexed)]
    pub author_id: String,

    /// Discussion title.
    pub title: String,

    /// When the discussion was created.
    pub created_at: DateTimeWithTimeZone,

    /// When the most recent comment was posted.
    #[sea_orm(nullable)]
    pub last_comment_at: Option<DateTimeWithTimeZone>,
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
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
    #[sea_orm(has_many = "super::discussion_reader::Entity")]
    Readers,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::discussion_reader::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Readers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
