use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the chat timeline pipeline.
///
/// Bot-author, excluded-substring and duplicate-id drops are not errors and
/// never surface here.
#[derive(Error, Debug)]
pub enum TimelineError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The top-level shape of an export file is neither of the known formats.
    #[error("Unrecognised chat export format in {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    /// A single record inside an export could not be interpreted.
    #[error("Malformed record in {path}: {reason}")]
    Record { path: PathBuf, reason: String },

    /// Normalisation produced a token that marks corrupt input.
    #[error(
        "Integrity check failed for message {id}{}: produced tripwire token {token:?}",
        in_file(.path)
    )]
    Integrity {
        path: Option<PathBuf>,
        id: String,
        token: String,
    },

    /// Nothing survived filtering and deduplication, so no window can be anchored.
    #[error("No messages left to aggregate")]
    EmptyInput,

    /// The run was abandoned before it finished.
    #[error("Run cancelled")]
    Cancelled,

    /// A timestamp did not match any recognised format.
    #[error("Invalid timestamp format: {0}")]
    TimestampParse(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn in_file(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}

/// Convenience alias used throughout the timeline crates.
pub type Result<T> = std::result::Result<T, TimelineError>;
