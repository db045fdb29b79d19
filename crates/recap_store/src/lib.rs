//! # Recap Store
//!
//! This crate provides the durable state for the recap pipeline: a nested
//! JSON-document cache of per-video results (transcripts, summaries, sentiment
//! tables) and a rolling-window tracker that remembers which uploads of a
//! watched source have already been analyzed.
//!
//! Both documents are plain human-readable JSON files, rewritten whole on every
//! commit. Each file is assumed to be owned by a single process at a time; no
//! locking or merge strategy is provided for concurrent writers.

mod dedup;
mod store;

pub use dedup::{AnalysisRecord, DedupTracker, DEFAULT_WINDOW};
pub use store::{write_with_backup, ResultStore, StoreError};
