//! Membership notification seam.
//!
//! Outbound delivery (email, push, ...) belongs to the embedding system;
//! this trait is the best-effort contract the group aggregate fires into.

use agora_common::AppResult;
use agora_db::entities::membership;
use async_trait::async_trait;

/// Dispatcher for membership lifecycle notifications.
///
/// Dispatch is fire-and-forget: a failing notifier must never fail or roll
/// back the mutation it accompanies. Callers log and move on.
#[async_trait]
pub trait MembershipNotifier: Send + Sync {
    /// A user filed a new join request against a group.
    async fn membership_requested(&self, membership: &membership::Model) -> AppResult<()>;
}

/// No-op notifier for embeddings without outbound delivery (and for tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNotifier;

#[async_trait]
impl MembershipNotifier for NoOpNotifier {
    async fn membership_requested(&self, _membership: &membership::Model) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_db::entities::membership::AccessLevel;
    use agora_db::test_utils::mock_membership;

    #[tokio::test]
    async fn test_noop_notifier_always_succeeds() {
        let notifier = NoOpNotifier;
        let membership = mock_membership("mbr1", "grp1", "usr1", AccessLevel::Request);

        assert!(notifier.membership_requested(&membership).await.is_ok());
    }
}
