use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A chat message reduced to its canonical word set.
///
/// Content tokens and emote tokens are kept apart because slang collapsing
/// and the fallback rule only ever look at content tokens. Both sets are
/// fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMessage {
    id: String,
    timestamp: DateTime<Utc>,
    tokens: BTreeSet<String>,
    emotes: BTreeSet<String>,
}

impl NormalizedMessage {
    pub fn new(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        tokens: BTreeSet<String>,
        emotes: BTreeSet<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            tokens,
            emotes,
        }
    }

    /// Source-assigned identity, used for cross-file deduplication.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the message was posted (UTC).
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Union of content tokens and emotes, each word once, in sorted order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.tokens.union(&self.emotes).map(String::as_str)
    }
}

/// One fixed-width bucket of the timeline.
///
/// A message belongs to the window when `start < timestamp <= end` (the very
/// first window also includes its own `start`). `end` is the time label the
/// rendering side plots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub message_count: u64,
    /// Word → number of messages in the window that contain it.
    pub word_counts: BTreeMap<String, u64>,
}

impl TimeWindow {
    /// An empty window closing at `end`.
    pub fn empty(end: DateTime<Utc>, width: TimeDelta) -> Self {
        Self {
            start: end - width,
            end,
            message_count: 0,
            word_counts: BTreeMap::new(),
        }
    }

    /// Count `message` once, and each of its words once.
    pub fn add_message(&mut self, message: &NormalizedMessage) {
        self.message_count += 1;
        for word in message.words() {
            *self.word_counts.entry(word.to_string()).or_insert(0) += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.message_count == 0
    }

    /// Occurrences of `word` in this window, zero when absent.
    pub fn count_of(&self, word: &str) -> u64 {
        self.word_counts.get(word).copied().unwrap_or(0)
    }
}

/// Contiguous, gap-free sequence of windows of equal width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    window_secs: i64,
    windows: Vec<TimeWindow>,
}

impl Timeline {
    /// Wrap already-built windows. Callers guarantee they are contiguous and
    /// ordered.
    pub fn from_windows(width: TimeDelta, windows: Vec<TimeWindow>) -> Self {
        Self {
            window_secs: width.num_seconds(),
            windows,
        }
    }

    /// Width of every window.
    pub fn window(&self) -> TimeDelta {
        TimeDelta::seconds(self.window_secs)
    }

    pub fn windows(&self) -> &[TimeWindow] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// `(label, message_count, word_counts)` triples in time order.
    pub fn points(&self) -> impl Iterator<Item = (DateTime<Utc>, u64, &BTreeMap<String, u64>)> {
        self.windows
            .iter()
            .map(|w| (w.end, w.message_count, &w.word_counts))
    }

    pub fn total_messages(&self) -> u64 {
        self.windows.iter().map(|w| w.message_count).sum()
    }

    /// Closing boundaries of the first and last windows.
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.windows.first()?.end, self.windows.last()?.end))
    }

    /// All windows folded into one word → count table, highest count first.
    /// Ties are ordered by word so the table is stable across runs.
    pub fn word_totals(&self) -> Vec<(String, u64)> {
        let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
        for window in &self.windows {
            for (word, count) in &window.word_counts {
                *totals.entry(word.as_str()).or_insert(0) += count;
            }
        }

        let mut table: Vec<(String, u64)> = totals
            .into_iter()
            .map(|(word, count)| (word.to_string(), count))
            .collect();
        // BTreeMap order is already by word; a stable sort keeps it for ties.
        table.sort_by(|a, b| b.1.cmp(&a.1));
        table
    }
}
