//! Group hierarchy guard.
//!
//! Structural validation run before a group is persisted. The guard runs
//! after default-fill and atomically with the write: a failure blocks the
//! mutation entirely.

use agora_common::{AppError, AppResult};
use agora_db::entities::group;
use validator::ValidateLength;

/// Maximum length of a group name.
pub const MAX_NAME_LEN: u64 = 250;

/// Maximum length of a group description.
pub const MAX_DESCRIPTION_LEN: u64 = 250;

/// Validate a group's structural invariants against its (optional) parent.
///
/// `max_size` is the value after default-fill.
pub fn validate(
    name: &str,
    description: Option<&str>,
    parent: Option<&group::Model>,
    max_size: Option<i32>,
) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::InvalidName("name is required".to_string()));
    }
    if !name.validate_length(Some(1), Some(MAX_NAME_LEN), None) {
        return Err(AppError::InvalidName(format!(
            "name exceeds {MAX_NAME_LEN} characters"
        )));
    }
    if let Some(description) = description {
        if !description.validate_length(None, Some(MAX_DESCRIPTION_LEN), None) {
            return Err(AppError::InvalidDescription(format!(
                "description exceeds {MAX_DESCRIPTION_LEN} characters"
            )));
        }
    }

    match parent {
        Some(parent) => {
            // No grandchildren: a parent may not itself have a parent.
            if parent.parent_id.is_some() {
                return Err(AppError::InvalidHierarchy(format!(
                    "group {} is itself a subgroup and cannot be a parent",
                    parent.id
                )));
            }
            if max_size.is_some() {
                return Err(AppError::SizeLimitMustBeAbsent);
            }
        }
        None => match max_size {
            None => return Err(AppError::MissingSizeLimit),
            Some(size) if size <= 0 => {
                return Err(AppError::Validation(
                    "max_size must be a positive integer".to_string(),
                ));
            }
            Some(_) => {}
        },
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use agora_db::test_utils::mock_group;

    #[test]
    fn test_root_group_with_size_limit_is_valid() {
        assert!(validate("Assembly", None, None, Some(50)).is_ok());
    }

    #[test]
    fn test_subgroup_of_root_is_valid() {
        let root = mock_group("grp1", None, "usr1", "Root");
        assert!(validate("Sub", None, Some(&root), None).is_ok());
    }

    #[test]
    fn test_subgroup_as_parent_is_invalid_hierarchy() {
        let sub = mock_group("grp2", Some("grp1"), "usr1", "Sub");
        let err = validate("Grandchild", None, Some(&sub), None).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_HIERARCHY");
    }

    #[test]
    fn test_root_without_size_limit_is_rejected() {
        let err = validate("Assembly", None, None, None).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_SIZE_LIMIT");
    }

    #[test]
    fn test_subgroup_with_size_limit_is_rejected() {
        let root = mock_group("grp1", None, "usr1", "Root");
        let err = validate("Sub", None, Some(&root), Some(10)).unwrap_err();
        assert_eq!(err.error_code(), "SIZE_LIMIT_MUST_BE_ABSENT");
    }

    #[test]
    fn test_name_length_rules() {
        let err = validate("", None, None, Some(50)).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_NAME");

        let long = "x".repeat(MAX_NAME_LEN as usize + 1);
        let err = validate(&long, None, None, Some(50)).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_NAME");

        let exact = "x".repeat(MAX_NAME_LEN as usize);
        assert!(validate(&exact, None, None, Some(50)).is_ok());
    }

    #[test]
    fn test_description_length_rule() {
        let long = "x".repeat(MAX_DESCRIPTION_LEN as usize + 1);
        let err = validate("Assembly", Some(&long), None, Some(50)).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DESCRIPTION");
    }

    #[test]
    fn test_non_positive_size_limit_is_rejected() {
        let err = validate("Assembly", None, None, Some(0)).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }
}
