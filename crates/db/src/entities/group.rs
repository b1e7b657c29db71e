//! Group entity for deliberation communities.

use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Permission category governing visibility or invite rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum PermissionCategory {
    /// Anyone, including non-members.
    #[sea_orm(string_value = "everyone")]
    Everyone,
    /// Members of the group itself.
    #[sea_orm(string_value = "members")]
    Members,
    /// Admins of the group only.
    #[sea_orm(string_value = "admins")]
    Admins,
    /// Members of the group's parent group.
    #[sea_orm(string_value = "parent_group_members")]
    ParentGroupMembers,
}

impl PermissionCategory {
    /// Parse a category from its wire string. Invalid values are rejected
    /// at this boundary, never silently coerced.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "everyone" => Some(Self::Everyone),
            "members" => Some(Self::Members),
            "admins" => Some(Self::Admins),
            "parent_group_members" => Some(Self::ParentGroupMembers),
            _ => None,
        }
    }

    /// Render the category as its wire string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Everyone => "everyone",
            Self::Members => "members",
            Self::Admins => "admins",
            Self::ParentGroupMembers => "parent_group_members",
        }
    }
}

/// Ordered sector tags attached to a group, stored as a JSON array.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult,
)]
pub struct SectorTags(pub Vec<String>);

/// Group entity - a community holding discussions.
///
/// Groups form a strictly two-level hierarchy: a group may have at most one
/// parent, and a parent may never itself have a parent.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Parent group, if this is a subgroup.
    #[sea_orm(indexed, nullable)]
    pub parent_id: Option<String>,

    /// User who created the group. Immutable.
    #[sea_orm(indexed)]
    pub creator_id: String,

    /// Group name.
    pub name: String,

    /// Group description (optional).
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Who can see the group.
    pub viewable_by: PermissionCategory,

    /// Who can invite new members.
    pub members_invitable_by: PermissionCategory,

    /// Size limit. Required on root groups, always null on subgroups.
    #[sea_orm(nullable)]
    pub max_size: Option<i32>,

    /// Whether members are barred from contributing content.
    #[sea_orm(default_value = false)]
    pub cannot_contribute: bool,

    /// Own beta-features flag, before parent inheritance.
    #[sea_orm(default_value = false)]
    pub beta_features: bool,

    /// Ordered sector metric tags.
    #[sea_orm(column_type = "JsonBinary")]
    pub sectors_metric: SectorTags,

    /// Number of memberships (denormalized).
    #[sea_orm(default_value = 0)]
    pub memberships_count: i64,

    /// Soft-delete marker. Archived groups are excluded from default queries.
    #[sea_orm(nullable)]
    pub archived_at: Option<DateTimeWithTimeZone>,

    /// When the group was created.
    pub created_at: DateTimeWithTimeZone,

    /// When the group was last updated.
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether this group sits at the root of a hierarchy.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Whether this group has been archived (soft deleted).
    #[must_use]
    pub const fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_delete = "SetNull"
    )]
    Parent,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Creator,
    #[sea_orm(has_many = "super::membership::Entity")]
    Memberships,
    #[sea_orm(has_many = "super::discussion::Entity")]
    Discussions,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

impl Related<super::membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::discussion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Discussions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_category_parse() {
        assert_eq!(
            PermissionCategory::parse("everyone"),
            Some(PermissionCategory::Everyone)
        );
        assert_eq!(
            PermissionCategory::parse("parent_group_members"),
            Some(PermissionCategory::ParentGroupMembers)
        );
        assert_eq!(PermissionCategory::parse("public"), None);
        assert_eq!(PermissionCategory::parse(""), None);
    }

    #[test]
    fn test_permission_category_round_trip() {
        for category in [
            PermissionCategory::Everyone,
            PermissionCategory::Members,
            PermissionCategory::Admins,
            PermissionCategory::ParentGroupMembers,
        ] {
            assert_eq!(PermissionCategory::parse(category.as_str()), Some(category));
        }
    }
}
