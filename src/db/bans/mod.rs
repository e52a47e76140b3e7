//! Repository for the channel ban and quiet ledger.

mod models;
mod queries;

pub use models::{BanMode, BanRecord, ExpiredBan, ListedBan, PriorBan};
pub use queries::BanRepository;
