//! Multi-file ingestion: read, filter, normalise in parallel, deduplicate.
//!
//! Files are processed one after another in input order. Inside a file the
//! admitted records are normalised on a rayon pool; results come back in
//! record order. A message whose id was already produced by an *earlier*
//! file is dropped, while repeated ids inside one file are all kept.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use timeline_core::error::{Result, TimelineError};
use timeline_core::models::NormalizedMessage;
use tracing::{debug, info};

use crate::normalizer::Normalizer;
use crate::reader::{read_chat_export, RawMessage, SourceFilter};

/// Counters for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IngestStats {
    pub files: usize,
    pub records_read: usize,
    pub records_filtered: usize,
    pub duplicates_dropped: usize,
    pub messages_kept: usize,
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Kept messages, ordered by timestamp (ties keep ingestion order).
    pub messages: Vec<NormalizedMessage>,
    pub stats: IngestStats,
}

/// Shared stop flag for a run in progress.
///
/// Ingestion checks it before every file and every record and returns
/// [`TimelineError::Cancelled`] once it is set.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// A guard that cancels when dropped, e.g. together with an abandoned future.
    pub fn cancel_on_drop(&self) -> CancelOnDrop {
        CancelOnDrop(self.clone())
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(TimelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug)]
pub struct CancelOnDrop(Cancellation);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

pub struct ChatIngestor {
    normalizer: Arc<Normalizer>,
    filter: SourceFilter,
    pool: rayon::ThreadPool,
    cancel: Cancellation,
}

impl ChatIngestor {
    /// `jobs == 0` sizes the pool to the number of CPUs.
    pub fn new(normalizer: Arc<Normalizer>, filter: SourceFilter, jobs: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .thread_name(|i| format!("normalize-{}", i))
            .build()
            .map_err(|e| TimelineError::Config(format!("worker pool: {}", e)))?;
        Ok(Self {
            normalizer,
            filter,
            pool,
            cancel: Cancellation::new(),
        })
    }

    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Ingest `files` in order. The first failing file aborts the run.
    pub fn ingest(&self, files: &[PathBuf]) -> Result<IngestOutcome> {
        let mut stats = IngestStats::default();
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut messages: Vec<NormalizedMessage> = Vec::new();

        for path in files {
            self.cancel.check()?;
            let batch = self.ingest_file(path, &mut stats)?;

            let before = batch.len();
            let fresh: Vec<NormalizedMessage> = batch
                .into_iter()
                .filter(|m| !seen_ids.contains(m.id()))
                .collect();
            let dropped = before - fresh.len();
            stats.duplicates_dropped += dropped;

            // Registered only after the whole file, so in-file repeats survive.
            seen_ids.extend(fresh.iter().map(|m| m.id().to_string()));

            debug!(
                "File {}: {} kept, {} duplicates of earlier files",
                path.display(),
                fresh.len(),
                dropped
            );
            messages.extend(fresh);
        }

        messages.sort_by_key(|m| m.timestamp());
        stats.files = files.len();
        stats.messages_kept = messages.len();

        debug!(
            "Ingested {} messages from {} files",
            messages.len(),
            files.len()
        );

        Ok(IngestOutcome { messages, stats })
    }

    fn ingest_file(&self, path: &Path, stats: &mut IngestStats) -> Result<Vec<NormalizedMessage>> {
        let export = read_chat_export(path)?;
        info!("{}: {} format", path.display(), export.format.name());

        let admitted: Vec<&RawMessage> = export
            .messages
            .iter()
            .filter(|raw| self.filter.admits(raw))
            .collect();

        let read = export.messages.len();
        let filtered = read - admitted.len();
        stats.records_read += read;
        stats.records_filtered += filtered;

        let normalizer = &self.normalizer;
        let cancel = &self.cancel;
        let batch = self.pool.install(|| {
            admitted
                .par_iter()
                .map(|raw| {
                    cancel.check()?;
                    let fields = raw.fields().map_err(|e| match e {
                        TimelineError::TimestampParse(reason) => TimelineError::Record {
                            path: path.to_path_buf(),
                            reason: format!("message {}: {}", raw.id(), reason),
                        },
                        other => other,
                    })?;
                    normalizer.normalize(&fields).map_err(|e| match e {
                        TimelineError::Integrity { id, token, .. } => TimelineError::Integrity {
                            path: Some(path.to_path_buf()),
                            id,
                            token,
                        },
                        other => other,
                    })
                })
                .collect::<Result<Vec<_>>>()
        })?;

        debug!(
            "File {}: {} read, {} filtered, {} normalized",
            path.display(),
            read,
            filtered,
            batch.len(),
        );

        Ok(batch)
    }
}
