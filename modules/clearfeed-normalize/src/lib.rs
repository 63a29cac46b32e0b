//! Normalization-and-deduplication engine for ingested content records.
//!
//! The batch driver pulls bounded pages of unprocessed records and runs
//! each through canonicalization, source resolution, fingerprinting, and
//! the conflict-reacting duplicate resolver. The similarity engine serves
//! the downstream guide near-duplicate check.

pub mod batch;
pub mod canonicalize;
pub mod dedup;
pub mod fingerprint;
pub mod guide_dup;
pub mod registry;
pub mod resolver;
pub mod similarity;

pub use batch::{BatchRunner, BatchStats};
pub use guide_dup::find_duplicate_guides;
pub use registry::SourceRegistry;
