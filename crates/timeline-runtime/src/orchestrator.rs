//! Async run orchestrator.
//!
//! Resolves the inputs, consults the timeline cache and otherwise runs the
//! blocking analysis pipeline on tokio's blocking pool, so the caller's event
//! loop stays free to react to Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;

use timeline_core::config::TimelineConfig;
use timeline_core::error::{Result, TimelineError};
use timeline_core::models::Timeline;
use timeline_data::analysis::{analyze_chat, default_segmenter, AnalysisMetadata};
use timeline_data::ingest::Cancellation;
use timeline_data::reader::expand_inputs;
use timeline_data::segmenter::Segmenter;

use crate::cache::{CacheKey, TimelineCache};

// ── Public types ──────────────────────────────────────────────────────────────

/// What a run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub timeline: Timeline,
    /// `None` when the timeline came from the cache.
    pub metadata: Option<AnalysisMetadata>,
    pub files: Vec<PathBuf>,
}

impl RunOutcome {
    pub fn from_cache(&self) -> bool {
        self.metadata.is_none()
    }
}

// ── TimelineOrchestrator ──────────────────────────────────────────────────────

pub struct TimelineOrchestrator {
    inputs: Vec<PathBuf>,
    config: TimelineConfig,
    jobs: usize,
    cache: Option<TimelineCache>,
    segmenter: Option<Arc<dyn Segmenter>>,
}

impl TimelineOrchestrator {
    /// # Parameters
    /// - `inputs` – export files or directories, in priority order for dedup.
    /// - `config` – validated normalisation and windowing config.
    /// - `jobs`   – normalisation workers (`0` = one per CPU).
    pub fn new(inputs: Vec<PathBuf>, config: TimelineConfig, jobs: usize) -> Self {
        Self {
            inputs,
            config,
            jobs,
            cache: None,
            segmenter: None,
        }
    }

    pub fn with_cache(mut self, cache: Option<TimelineCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Use `segmenter` instead of the built-in lexicon engine.
    pub fn with_segmenter(mut self, segmenter: Arc<dyn Segmenter>) -> Self {
        self.segmenter = Some(segmenter);
        self
    }

    /// Produce the timeline, from the cache when the key matches.
    ///
    /// A failed cache write is logged and does not fail the run. Dropping the
    /// returned future cancels the analysis still running on the blocking pool.
    pub async fn run(self) -> Result<RunOutcome> {
        let cancel = Cancellation::new();
        let _cancel_guard = cancel.cancel_on_drop();

        let segmenter = match self.segmenter {
            Some(segmenter) => segmenter,
            None => default_segmenter(&self.config)?,
        };
        let files = expand_inputs(&self.inputs);
        let key = CacheKey::for_run(&files, &self.config, &segmenter.identity());

        if let Some(cache) = &self.cache {
            let lookup = cache.clone();
            let lookup_key = key.clone();
            let hit = tokio::task::spawn_blocking(move || lookup.load(&lookup_key))
                .await
                .map_err(join_error)?;
            if let Some(timeline) = hit {
                tracing::info!("Using cached timeline from {}", cache.path().display());
                return Ok(RunOutcome {
                    timeline,
                    metadata: None,
                    files,
                });
            }
        }

        let config = self.config;
        let jobs = self.jobs;
        let analysis_files = files.clone();
        let result = tokio::task::spawn_blocking(move || {
            analyze_chat(&analysis_files, &config, segmenter, jobs, &cancel)
        })
        .await
        .map_err(join_error)??;

        if let Some(cache) = self.cache {
            let timeline = result.timeline.clone();
            let saved = tokio::task::spawn_blocking(move || {
                cache.save(&key, &timeline).map(|_| cache)
            })
            .await
            .map_err(join_error)?;
            match saved {
                Ok(cache) => tracing::debug!("timeline cached at {}", cache.path().display()),
                Err(e) => tracing::warn!(error = %e, "failed to write timeline cache"),
            }
        }

        Ok(RunOutcome {
            timeline: result.timeline,
            metadata: Some(result.metadata),
            files,
        })
    }
}

fn join_error(e: tokio::task::JoinError) -> TimelineError {
    TimelineError::Other(anyhow::Error::new(e).context("analysis task failed"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
