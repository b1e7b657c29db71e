//! Permission resolver.
//!
//! Pure, stateless computations over a group and (when present) its parent.
//! One level of inheritance only: a subgroup's parent is always a root group
//! by the depth invariant, so nothing ever "grand-inherits".

use agora_db::entities::group::{self, PermissionCategory};

/// Who the caller is relative to a group, for visibility/invite checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Viewer {
    /// Holds an accepted membership (member or admin) in the group itself.
    pub is_member: bool,
    /// Holds an admin membership in the group itself.
    pub is_admin: bool,
    /// Holds an accepted membership in the group's parent.
    pub is_parent_group_member: bool,
}

/// Effective beta-features flag: the group's own flag, or its parent's own
/// flag. Inheritance stops at the immediate parent.
#[must_use]
pub fn effective_beta_features(group: &group::Model, parent: Option<&group::Model>) -> bool {
    group.beta_features || parent.is_some_and(|p| p.beta_features)
}

/// Default visibility for a new group.
#[must_use]
pub const fn default_viewable_by(has_parent: bool) -> PermissionCategory {
    if has_parent {
        PermissionCategory::ParentGroupMembers
    } else {
        PermissionCategory::Members
    }
}

/// Default invite rights for a new group, regardless of hierarchy position.
#[must_use]
pub const fn default_members_invitable_by() -> PermissionCategory {
    PermissionCategory::Members
}

/// Fill still-unset permission fields with their defaults.
///
/// Only fills holes; explicit values are never overwritten, so applying this
/// twice yields the same result as applying it once. `max_size` is only
/// defaulted for root groups.
pub fn fill_defaults(
    has_parent: bool,
    viewable_by: &mut Option<PermissionCategory>,
    members_invitable_by: &mut Option<PermissionCategory>,
    max_size: &mut Option<i32>,
    default_max_size: i32,
) {
    if viewable_by.is_none() {
        *viewable_by = Some(default_viewable_by(has_parent));
    }
    if members_invitable_by.is_none() {
        *members_invitable_by = Some(default_members_invitable_by());
    }
    if !has_parent && max_size.is_none() {
        *max_size = Some(default_max_size);
    }
}

/// Parent's name + separator + own name for subgroups, else the own name.
#[must_use]
pub fn full_name(group: &group::Model, parent: Option<&group::Model>, separator: &str) -> String {
    match parent {
        Some(p) => format!("{}{}{}", p.name, separator, group.name),
        None => group.name.clone(),
    }
}

/// Name of the hierarchy root: the parent's name for subgroups, else own.
#[must_use]
pub fn root_name(group: &group::Model, parent: Option<&group::Model>) -> String {
    parent.map_or_else(|| group.name.clone(), |p| p.name.clone())
}

/// Effective size limit: own for root groups, the parent's for subgroups.
#[must_use]
pub const fn effective_max_size(group: &group::Model, parent: Option<&group::Model>) -> Option<i32> {
    match parent {
        Some(p) => p.max_size,
        None => group.max_size,
    }
}

/// Whether `viewer` may see a group with the given visibility category.
#[must_use]
pub const fn can_view(category: PermissionCategory, viewer: Viewer) -> bool {
    match category {
        PermissionCategory::Everyone => true,
        PermissionCategory::Members => viewer.is_member,
        PermissionCategory::Admins => viewer.is_admin,
        PermissionCategory::ParentGroupMembers => {
            viewer.is_member || viewer.is_parent_group_member
        }
    }
}

/// Whether `viewer` may invite new members under the given category.
#[must_use]
pub const fn can_invite(category: PermissionCategory, viewer: Viewer) -> bool {
    can_view(category, viewer)
}

/// Resolve the group's contact address: first admin's email, else the
/// creator's, else the platform fallback.
#[must_use]
pub fn resolve_admin_email(
    admin_emails: &[String],
    creator_email: Option<&str>,
    fallback: &str,
) -> String {
    admin_emails.first().map_or_else(
        || creator_email.unwrap_or(fallback).to_string(),
        Clone::clone,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_db::test_utils::mock_group;

    #[test]
    fn test_beta_features_inherit_one_level() {
        let mut root = mock_group("grp1", None, "usr1", "Root");
        let mut sub = mock_group("grp2", Some("grp1"), "usr1", "Sub");

        assert!(!effective_beta_features(&sub, Some(&root)));

        root.beta_features = true;
        assert!(effective_beta_features(&sub, Some(&root)));

        root.beta_features = false;
        sub.beta_features = true;
        assert!(effective_beta_features(&sub, Some(&root)));
    }

    #[test]
    fn test_root_group_ignores_parent_concept() {
        let mut root = mock_group("grp1", None, "usr1", "Root");
        root.beta_features = false;
        assert!(!effective_beta_features(&root, None));

        root.beta_features = true;
        assert!(effective_beta_features(&root, None));
    }

    #[test]
    fn test_defaults_depend_on_hierarchy_position() {
        assert_eq!(default_viewable_by(false), PermissionCategory::Members);
        assert_eq!(
            default_viewable_by(true),
            PermissionCategory::ParentGroupMembers
        );
        assert_eq!(default_members_invitable_by(), PermissionCategory::Members);
    }

    #[test]
    fn test_fill_defaults_only_fills_holes() {
        let mut viewable_by = Some(PermissionCategory::Everyone);
        let mut members_invitable_by = None;
        let mut max_size = None;

        fill_defaults(false, &mut viewable_by, &mut members_invitable_by, &mut max_size, 50);

        assert_eq!(viewable_by, Some(PermissionCategory::Everyone));
        assert_eq!(members_invitable_by, Some(PermissionCategory::Members));
        assert_eq!(max_size, Some(50));
    }

    #[test]
    fn test_fill_defaults_is_idempotent() {
        let mut viewable_by = None;
        let mut members_invitable_by = None;
        let mut max_size = None;

        fill_defaults(true, &mut viewable_by, &mut members_invitable_by, &mut max_size, 50);
        let once = (viewable_by, members_invitable_by, max_size);

        fill_defaults(true, &mut viewable_by, &mut members_invitable_by, &mut max_size, 50);
        assert_eq!((viewable_by, members_invitable_by, max_size), once);

        // Subgroups never get a defaulted max_size
        assert_eq!(max_size, None);
    }

    #[test]
    fn test_full_name_and_root_name() {
        let root = mock_group("grp1", None, "usr1", "Assembly");
        let sub = mock_group("grp2", Some("grp1"), "usr1", "Working Group");

        assert_eq!(full_name(&root, None, " - "), "Assembly");
        assert_eq!(full_name(&sub, Some(&root), " - "), "Assembly - Working Group");
        assert_eq!(root_name(&root, None), "Assembly");
        assert_eq!(root_name(&sub, Some(&root)), "Assembly");
    }

    #[test]
    fn test_effective_max_size() {
        let root = mock_group("grp1", None, "usr1", "Root");
        let sub = mock_group("grp2", Some("grp1"), "usr1", "Sub");

        assert_eq!(effective_max_size(&root, None), Some(50));
        assert_eq!(effective_max_size(&sub, Some(&root)), Some(50));
    }

    #[test]
    fn test_can_view_matrix() {
        let outsider = Viewer::default();
        let member = Viewer {
            is_member: true,
            ..Viewer::default()
        };
        let admin = Viewer {
            is_member: true,
            is_admin: true,
            ..Viewer::default()
        };
        let parent_member = Viewer {
            is_parent_group_member: true,
            ..Viewer::default()
        };

        assert!(can_view(PermissionCategory::Everyone, outsider));
        assert!(!can_view(PermissionCategory::Members, outsider));
        assert!(can_view(PermissionCategory::Members, member));
        assert!(!can_view(PermissionCategory::Admins, member));
        assert!(can_view(PermissionCategory::Admins, admin));
        assert!(can_view(PermissionCategory::ParentGroupMembers, parent_member));
        assert!(can_view(PermissionCategory::ParentGroupMembers, member));
        assert!(!can_view(PermissionCategory::ParentGroupMembers, outsider));
    }

    #[test]
    fn test_resolve_admin_email_fallback_chain() {
        let fallback = "contact@agora.example";

        assert_eq!(
            resolve_admin_email(&[], None, fallback),
            "contact@agora.example"
        );
        assert_eq!(
            resolve_admin_email(&[], Some("creator@example.org"), fallback),
            "creator@example.org"
        );
        assert_eq!(
            resolve_admin_email(
                &["first@example.org".to_string(), "second@example.org".to_string()],
                Some("creator@example.org"),
                fallback
            ),
            "first@example.org"
        );
    }
}
