//! Error types for agora.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Domain Errors ===
    /// A subgroup was given a parent that itself has a parent.
    #[error("Invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    /// A root group was left without a size limit.
    #[error("Missing size limit: root groups must set max_size")]
    MissingSizeLimit,

    /// A subgroup carried its own size limit.
    #[error("Size limit must be absent: subgroups inherit max_size from their parent")]
    SizeLimitMustBeAbsent,

    /// A permission category string did not parse.
    #[error("Invalid permission category: {0}")]
    InvalidPermissionCategory(String),

    /// Group name failed validation.
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Group description failed validation.
    #[error("Invalid description: {0}")]
    InvalidDescription(String),

    /// A second membership row was created for the same (group, user) pair.
    /// Callers should retry as a lookup followed by a transition.
    #[error("Duplicate membership for user {user_id} in group {group_id}")]
    DuplicateMembership {
        /// Group the membership was created in.
        group_id: String,
        /// User that already holds a membership.
        user_id: String,
    },

    /// A transition was attempted on a membership that does not exist.
    #[error("Membership not found: {0}")]
    MembershipNotFound(String),

    // === Generic Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the stable error code for this error.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidHierarchy(_) => "INVALID_HIERARCHY",
            Self::MissingSizeLimit => "MISSING_SIZE_LIMIT",
            Self::SizeLimitMustBeAbsent => "SIZE_LIMIT_MUST_BE_ABSENT",
            Self::InvalidPermissionCategory(_) => "INVALID_PERMISSION_CATEGORY",
            Self::InvalidName(_) => "INVALID_NAME",
            Self::InvalidDescription(_) => "INVALID_DESCRIPTION",
            Self::DuplicateMembership { .. } => "DUPLICATE_MEMBERSHIP",
            Self::MembershipNotFound(_) => "MEMBERSHIP_NOT_FOUND",
            Self::NotFound(_) => "NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Config(_) | Self::Internal(_)
        )
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            AppError::InvalidHierarchy("x".into()).error_code(),
            "INVALID_HIERARCHY"
        );
        assert_eq!(AppError::MissingSizeLimit.error_code(), "MISSING_SIZE_LIMIT");
        assert_eq!(
            AppError::DuplicateMembership {
                group_id: "g1".into(),
                user_id: "u1".into(),
            }
            .error_code(),
            "DUPLICATE_MEMBERSHIP"
        );
    }

    #[test]
    fn test_server_error_classification() {
        assert!(AppError::Database("down".into()).is_server_error());
        assert!(!AppError::MissingSizeLimit.is_server_error());
        assert!(!AppError::MembershipNotFound("m1".into()).is_server_error());
    }
}
