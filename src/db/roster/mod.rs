//! Repository for channel membership and the last-seen `user@host` of
//! every nick.

mod queries;

pub use queries::RosterRepository;
