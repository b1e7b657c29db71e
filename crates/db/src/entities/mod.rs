//! Database entities.

#![allow(missing_docs)]

pub mod comment;
pub mod discussion;
pub mod discussion_reader;
pub mod group;
pub mod membership;
pub mod user;

pub use comment::Entity as Comment;
pub use discussion::Entity as Discussion;
pub use discussion_reader::Entity as DiscussionReader;
pub use group::Entity as Group;
pub use membership::Entity as Membership;
pub use user::Entity as User;
