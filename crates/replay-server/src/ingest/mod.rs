//! Replay ingestion pipeline
//!
//! Creation runs fetch → extract → hash → duplicate check → code allocation →
//! insert. The insert is the only write, so a failure at any step leaves no
//! record behind.

pub mod dedup;
pub mod extractor;
pub mod fetcher;
pub mod orchestrator;
pub mod sequence;

pub use dedup::DuplicateGuard;
pub use extractor::{extract, ExtractError, ExtractedPayload};
pub use fetcher::{ArtifactSource, FetchError, HttpFetcher};
pub use orchestrator::ReplayIngestor;
pub use sequence::SequenceAllocator;
