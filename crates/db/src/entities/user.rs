//! User entity.
//!
//! Agora only references users by id; this entity is the concrete shape of
//! the user directory contract (id, email, reserved helper-bot identity).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User entity.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Login / display handle.
    #[sea_orm(unique)]
    pub username: String,

    /// Contact email address.
    pub email: String,

    /// Reserved system/bot account flag. The helper bot never receives
    /// admin rights when it creates seed content.
    #[sea_orm(default_value = false)]
    pub is_helper_bot: bool,

    /// When the user registered.
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::membership::Entity")]
    Memberships,
}

impl Related<super::membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
