//! Data layer for chat-timeline.
//!
//! Reads chat exports, normalises every message into its word set,
//! deduplicates across files and windows the result into a [`Timeline`].
//!
//! [`Timeline`]: timeline_core::models::Timeline

pub mod aggregator;
pub mod analysis;
pub mod ingest;
pub mod normalizer;
pub mod reader;
pub mod segmenter;
pub mod width;

pub use timeline_core as core;
