//! `rentradar-dedupe`: cross-source identity resolution for rental listings.
//!
//! Pure engine crate: receives candidate batches already collected from the
//! listing portals, decides which records are new identities and which are
//! duplicates, and forwards each raw record downstream at most once.
//! No CLI; file IO is limited to [`input::load_path`].

pub mod arbiter;
pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod registry;
pub mod report;
pub mod similarity;

pub use arbiter::{choose_preferred, TrustRanking};
pub use batch::dedupe_batch;
pub use config::{DedupeConfig, MatchStrategy, MatchingConfig, RetentionConfig};
pub use engine::{DedupeEngine, SharedEngine};
pub use error::DedupeError;
pub use matcher::{resolve, Matcher};
pub use model::{
    CanonicalKey, CycleOutput, CycleReport, Decision, ListingCandidate, MatchKind, Resolution, Source,
    SourceBatch,
};
pub use normalize::canonical_key;
pub use similarity::SimilarityMetric;
