//! Unread activity engine.
//!
//! A read-only, three-way reconciliation between a membership's group-level
//! view time, per-discussion read logs, and discussion/comment timestamps.
//! The engine holds no state and performs no writes; gathering the facts is
//! the service's job, deciding on them is a pure function's.

use std::collections::HashMap;

use agora_common::{AppResult, IdGenerator};
use agora_db::entities::discussion_reader;
use agora_db::repositories::{
    DiscussionReaderRepository, DiscussionRepository, MembershipRepository,
};
use chrono::{DateTime, Utc};

/// Timestamps of one discussion in the group.
#[derive(Debug, Clone)]
pub struct DiscussionFacts {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_comment_at: Option<DateTime<Utc>>,
}

/// Author and time of one comment on any of the group's discussions.
#[derive(Debug, Clone)]
pub struct CommentFacts {
    pub author_id: String,
    pub created_at: DateTime<Utc>,
}

/// Everything the reconciliation needs, snapshotted from the collaborators.
#[derive(Debug, Clone, Default)]
pub struct GroupActivityFacts {
    /// User whose unread state is being computed.
    pub user_id: String,
    /// The membership's `group_last_viewed_at`; `None` means never viewed.
    pub group_last_viewed_at: Option<DateTime<Utc>>,
    /// Discussions in the group.
    pub discussions: Vec<DiscussionFacts>,
    /// Comments on those discussions since the group was last viewed.
    pub comments: Vec<CommentFacts>,
    /// The user's read log: discussion id -> `last_viewed_at`.
    pub read_logs: HashMap<String, DateTime<Utc>>,
}

/// Whether `at` falls after the user's group-level view time. A user who
/// never viewed the group has everything after.
fn is_after_group_view(at: DateTime<Utc>, last_viewed: Option<DateTime<Utc>>) -> bool {
    last_viewed.is_none_or(|last_viewed| at > last_viewed)
}

/// Discussions created since the last group view that the user has never
/// read-logged at all. A pure set difference.
fn unread_new_discussion_ids(facts: &GroupActivityFacts) -> Vec<&str> {
    facts
        .discussions
        .iter()
        .filter(|d| {
            is_after_group_view(d.created_at, facts.group_last_viewed_at)
                && !facts.read_logs.contains_key(&d.id)
        })
        .map(|d| d.id.as_str())
        .collect()
}

/// The three-way reconciliation.
///
/// `unread_comments` requires BOTH a stale group-level view time (some
/// other-authored comment arrived after it) AND a stale per-discussion read
/// log (some read-logged discussion changed since the user last read it).
/// The double condition is deliberate and preserved as-is.
#[must_use]
pub fn has_unread_activity(facts: &GroupActivityFacts) -> bool {
    let new_comments_since_group_view = facts.comments.iter().any(|c| {
        c.author_id != facts.user_id
            && is_after_group_view(c.created_at, facts.group_last_viewed_at)
    });

    let stale_read_log = facts.discussions.iter().any(|d| {
        match (facts.read_logs.get(&d.id), d.last_comment_at) {
            (Some(read_at), Some(last_comment_at)) => *read_at < last_comment_at,
            _ => false,
        }
    });

    let unread_comments = new_comments_since_group_view && stale_read_log;

    unread_comments || !unread_new_discussion_ids(facts).is_empty()
}

/// Service computing unread activity over collaborator-owned data.
#[derive(Clone)]
pub struct ActivityService {
    membership_repo: MembershipRepository,
    discussion_repo: DiscussionRepository,
    reader_repo: DiscussionReaderRepository,
    id_gen: IdGenerator,
}

impl ActivityService {
    /// Create a new activity service.
    #[must_use]
    pub const fn new(
        membership_repo: MembershipRepository,
        discussion_repo: DiscussionRepository,
        reader_repo: DiscussionReaderRepository,
    ) -> Self {
        Self {
            membership_repo,
            discussion_repo,
            reader_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Whether the user has unseen discussion/comment content in the group.
    ///
    /// A user with no membership has no tracking state and yields `false`;
    /// this query never raises a domain error for that case.
    pub async fn has_unread_activity(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        let Some(membership) = self
            .membership_repo
            .find_by_group_and_user(group_id, user_id)
            .await?
        else {
            return Ok(false);
        };

        let group_last_viewed_at: Option<DateTime<Utc>> =
            membership.group_last_viewed_at.map(Into::into);

        let discussions = self.discussion_repo.find_by_group(group_id).await?;
        let discussion_ids: Vec<String> = discussions.iter().map(|d| d.id.clone()).collect();

        let since = group_last_viewed_at.unwrap_or(DateTime::<Utc>::MIN_UTC);
        let comments = self
            .discussion_repo
            .comments_since(&discussion_ids, since)
            .await?;

        let read_logs: HashMap<String, DateTime<Utc>> = self
            .reader_repo
            .find_for_user(user_id, &discussion_ids)
            .await?
            .into_iter()
            .map(|r: discussion_reader::Model| (r.discussion_id, r.last_viewed_at.into()))
            .collect();

        let facts = GroupActivityFacts {
            user_id: user_id.to_string(),
            group_last_viewed_at,
            discussions: discussions
                .into_iter()
                .map(|d| DiscussionFacts {
                    id: d.id,
                    created_at: d.created_at.into(),
                    last_comment_at: d.last_comment_at.map(Into::into),
                })
                .collect(),
            comments: comments
                .into_iter()
                .map(|c| CommentFacts {
                    author_id: c.author_id,
                    created_at: c.created_at.into(),
                })
                .collect(),
            read_logs,
        };

        Ok(has_unread_activity(&facts))
    }

    /// Record that the user read a discussion at `at`.
    pub async fn mark_discussion_read(
        &self,
        discussion_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<discussion_reader::Model> {
        self.reader_repo
            .mark_read(self.id_gen.generate(), discussion_id, user_id, at)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use maplit::hashmap;

    fn t0() -> DateTime<Utc> {
        Utc::now()
    }

    fn facts_with(
        user_id: &str,
        group_last_viewed_at: Option<DateTime<Utc>>,
    ) -> GroupActivityFacts {
        GroupActivityFacts {
            user_id: user_id.to_string(),
            group_last_viewed_at,
            ..GroupActivityFacts::default()
        }
    }

    #[test]
    fn test_empty_group_has_no_unread_activity() {
        let facts = facts_with("usr1", Some(t0()));
        assert!(!has_unread_activity(&facts));
    }

    #[test]
    fn test_stale_group_view_and_stale_read_log_is_unread() {
        let t0 = t0();
        let mut facts = facts_with("usr1", Some(t0));
        facts.discussions = vec![DiscussionFacts {
            id: "dsc1".to_string(),
            created_at: t0 - TimeDelta::hours(1),
            last_comment_at: Some(t0 + TimeDelta::seconds(1)),
        }];
        facts.comments = vec![CommentFacts {
            author_id: "usr2".to_string(),
            created_at: t0 + TimeDelta::seconds(1),
        }];
        facts.read_logs = hashmap! {
            "dsc1".to_string() => t0 - TimeDelta::seconds(1),
        };

        assert!(has_unread_activity(&facts));
    }

    #[test]
    fn test_fresh_read_log_clears_unread_comments() {
        let t0 = t0();
        let mut facts = facts_with("usr1", Some(t0));
        facts.discussions = vec![DiscussionFacts {
            id: "dsc1".to_string(),
            created_at: t0 - TimeDelta::hours(1),
            last_comment_at: Some(t0 + TimeDelta::seconds(1)),
        }];
        facts.comments = vec![CommentFacts {
            author_id: "usr2".to_string(),
            created_at: t0 + TimeDelta::seconds(1),
        }];
        // Read log is after the last comment: the discussion-level check
        // fails, and with it the whole AND.
        facts.read_logs = hashmap! {
            "dsc1".to_string() => t0 + TimeDelta::seconds(2),
        };

        assert!(!has_unread_activity(&facts));
    }

    #[test]
    fn test_own_comments_do_not_count() {
        let t0 = t0();
        let mut facts = facts_with("usr1", Some(t0));
        facts.discussions = vec![DiscussionFacts {
            id: "dsc1".to_string(),
            created_at: t0 - TimeDelta::hours(1),
            last_comment_at: Some(t0 + TimeDelta::seconds(1)),
        }];
        facts.comments = vec![CommentFacts {
            author_id: "usr1".to_string(),
            created_at: t0 + TimeDelta::seconds(1),
        }];
        facts.read_logs = hashmap! {
            "dsc1".to_string() => t0 - TimeDelta::seconds(1),
        };

        assert!(!has_unread_activity(&facts));
    }

    #[test]
    fn test_new_discussion_without_read_log_is_unread() {
        let t0 = t0();
        let mut facts = facts_with("usr1", Some(t0));
        facts.discussions = vec![DiscussionFacts {
            id: "dsc2".to_string(),
            created_at: t0 + TimeDelta::seconds(5),
            last_comment_at: None,
        }];

        assert!(has_unread_activity(&facts));
    }

    #[test]
    fn test_new_discussion_with_read_log_is_not_new() {
        let t0 = t0();
        let mut facts = facts_with("usr1", Some(t0));
        facts.discussions = vec![DiscussionFacts {
            id: "dsc2".to_string(),
            created_at: t0 + TimeDelta::seconds(5),
            last_comment_at: None,
        }];
        facts.read_logs = hashmap! {
            "dsc2".to_string() => t0 + TimeDelta::seconds(6),
        };

        assert!(!has_unread_activity(&facts));
    }

    #[test]
    fn test_never_viewed_group_sees_everything_as_new() {
        let t0 = t0();
        let mut facts = facts_with("usr1", None);
        facts.discussions = vec![DiscussionFacts {
            id: "dsc1".to_string(),
            created_at: t0 - TimeDelta::days(30),
            last_comment_at: None,
        }];

        assert!(has_unread_activity(&facts));
    }

    #[test]
    fn test_unread_new_discussion_ids_is_a_set_difference() {
        let t0 = t0();
        let mut facts = facts_with("usr1", Some(t0));
        facts.discussions = vec![
            DiscussionFacts {
                id: "dsc1".to_string(),
                created_at: t0 + TimeDelta::seconds(1),
                last_comment_at: None,
            },
            DiscussionFacts {
                id: "dsc2".to_string(),
                created_at: t0 + TimeDelta::seconds(2),
                last_comment_at: None,
            },
            DiscussionFacts {
                id: "dsc3".to_string(),
                created_at: t0 - TimeDelta::seconds(2),
                last_comment_at: None,
            },
        ];
        facts.read_logs = hashmap! {
            "dsc2".to_string() => t0 + TimeDelta::seconds(3),
        };

        assert_eq!(unread_new_discussion_ids(&facts), vec!["dsc1"]);
    }
}
