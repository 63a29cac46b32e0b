pub mod migrate;
pub mod pg;
pub mod store;
pub mod testutil;

pub use pg::PgStore;
pub use store::{ClaimOutcome, ConflictKind, GuideStore, ItemStore, StoreError};
pub use testutil::MemoryStore;
