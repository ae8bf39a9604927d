//! On-disk timeline cache.
//!
//! One JSON file holds the last computed [`Timeline`] together with the key
//! of the run that produced it. A later run with the same key reuses the
//! timeline instead of re-reading every export. Anything unexpected on the
//! read side (missing file, stale format, different key) is a cache miss,
//! never an error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use timeline_core::config::TimelineConfig;
use timeline_core::error::Result;
use timeline_core::models::Timeline;

/// Bumped whenever the on-disk layout changes.
const CACHE_FORMAT: u32 = 2;

// ── CacheKey ──────────────────────────────────────────────────────────────────

/// Size and modification time of one input, so an edited export misses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputStamp {
    pub path: PathBuf,
    pub len: u64,
    pub modified_secs: Option<i64>,
}

impl InputStamp {
    fn of(path: &Path) -> Self {
        let meta = std::fs::metadata(path).ok();
        let modified_secs = meta
            .as_ref()
            .and_then(|m| m.modified().ok())
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64);
        Self {
            path: path.to_path_buf(),
            len: meta.map(|m| m.len()).unwrap_or(0),
            modified_secs,
        }
    }
}

/// Identity of one run: the ordered inputs and everything that shapes the
/// output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKey {
    pub inputs: Vec<InputStamp>,
    pub config: TimelineConfig,
    /// [`Segmenter::identity`](timeline_data::segmenter::Segmenter::identity)
    /// of the engine that tokenised the messages.
    pub segmenter: String,
}

impl CacheKey {
    pub fn for_run(files: &[PathBuf], config: &TimelineConfig, segmenter: &str) -> Self {
        Self {
            inputs: files.iter().map(|f| InputStamp::of(f)).collect(),
            config: config.clone(),
            segmenter: segmenter.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    format: u32,
    key: CacheKey,
    timeline: Timeline,
}

// ── TimelineCache ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TimelineCache {
    path: PathBuf,
}

impl TimelineCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached timeline for `key`, or `None` on any kind of miss.
    pub fn load(&self, key: &CacheKey) -> Option<Timeline> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!("no timeline cache at {}: {}", self.path.display(), e);
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("ignoring unreadable cache {}: {}", self.path.display(), e);
                return None;
            }
        };

        if entry.format != CACHE_FORMAT {
            tracing::debug!("cache format {} is outdated", entry.format);
            return None;
        }
        if &entry.key != key {
            tracing::debug!("cache key mismatch; recomputing");
            return None;
        }

        tracing::debug!(windows = entry.timeline.len(), "timeline cache hit");
        Some(entry.timeline)
    }

    /// Replace the cache with `timeline`, written atomically.
    pub fn save(&self, key: &CacheKey, timeline: &Timeline) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let entry = CacheEntry {
            format: CACHE_FORMAT,
            key: key.clone(),
            timeline: timeline.clone(),
        };
        let json = serde_json::to_string(&entry)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
