//! Runtime layer for chat-timeline.
//!
//! Runs the data pipeline off the async executor, keeps the timeline cache
//! and exports the word table.

pub mod cache;
pub mod export;
pub mod orchestrator;

pub use timeline_core as core;
pub use timeline_data as data;
