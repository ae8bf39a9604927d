//! Shared types for the chat timeline workspace.
//!
//! Holds the error taxonomy, the message/window/timeline data model, the
//! normalisation config, command-line settings and the time helpers used by
//! every other crate.

pub mod config;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{Result, TimelineError};
