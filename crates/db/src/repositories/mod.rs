//! Database repositories.
//!
//! Explicit query interfaces over the entities; each method has a concrete
//! contract instead of declarative relationship inference.

pub mod discussion;
pub mod discussion_reader;
pub mod group;
pub mod membership;
pub mod user;

pub use discussion::DiscussionRepository;
pub use discussion_reader::DiscussionReaderRepository;
pub use group::GroupRepository;
pub use membership::MembershipRepository;
pub use user::UserRepository;
