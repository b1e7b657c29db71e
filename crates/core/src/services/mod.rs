//! Business logic services.

#![allow(missing_docs)]

pub mod activity;
pub mod group;
pub mod hierarchy;
pub mod membership;
pub mod notifier;
pub mod permission;

pub use activity::{
    ActivityService, CommentFacts, DiscussionFacts, GroupActivityFacts, has_unread_activity,
};
pub use group::{
    CreateGroupInput, FULL_NAME_SEPARATOR, GroupResponse, GroupService, UpdateGroupInput,
};
pub use hierarchy::{MAX_DESCRIPTION_LEN, MAX_NAME_LEN};
pub use membership::MembershipService;
pub use notifier::{MembershipNotifier, NoOpNotifier};
pub use permission::Viewer;
