//! Main analysis pipeline.
//!
//! Expands the inputs, ingests every file and windows the result, returning
//! an [`AnalysisResult`] ready for rendering and export.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use timeline_core::config::TimelineConfig;
use timeline_core::error::Result;
use timeline_core::models::Timeline;
use tracing::info;

use crate::aggregator::TimelineAggregator;
use crate::ingest::{Cancellation, ChatIngestor, IngestStats};
use crate::normalizer::Normalizer;
use crate::reader::{expand_inputs, SourceFilter};
use crate::segmenter::{LexiconSegmenter, Segmenter};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the timeline.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisMetadata {
    /// RFC 3339 timestamp when this result was generated.
    pub generated_at: String,
    pub ingest: IngestStats,
    pub windows_created: usize,
    pub workers: usize,
    /// Wall-clock seconds spent reading and normalising.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent windowing.
    pub transform_time_seconds: f64,
}

/// The complete output of [`analyze_chat`].
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub timeline: Timeline,
    pub metadata: AnalysisMetadata,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// The built-in segmenter with the config's extra dictionary words.
pub fn default_segmenter(config: &TimelineConfig) -> Result<Arc<dyn Segmenter>> {
    Ok(Arc::new(LexiconSegmenter::with_core_lexicon(&config.lexicon)?))
}

/// Run the full pipeline.
///
/// 1. Expand directories in `inputs` into export files.
/// 2. Read, filter, normalise and deduplicate every file.
/// 3. Window the sorted messages.
///
/// Any fatal error aborts before a timeline exists; there is no partial
/// result. Setting `cancel` stops ingestion at the next record.
pub fn analyze_chat(
    inputs: &[PathBuf],
    config: &TimelineConfig,
    segmenter: Arc<dyn Segmenter>,
    jobs: usize,
    cancel: &Cancellation,
) -> Result<AnalysisResult> {
    config.validate()?;
    let aggregator = TimelineAggregator::from_config(config)?;
    let normalizer = Normalizer::new(config, segmenter)?;
    let ingestor = ChatIngestor::new(
        Arc::new(normalizer),
        SourceFilter::from_config(config),
        jobs,
    )?
    .with_cancellation(cancel.clone());

    // ── Step 1: Load ──────────────────────────────────────────────────────────
    let load_start = std::time::Instant::now();
    let files = expand_inputs(inputs);
    let outcome = ingestor.ingest(&files)?;
    let load_time = load_start.elapsed().as_secs_f64();

    // ── Step 2: Window ────────────────────────────────────────────────────────
    let transform_start = std::time::Instant::now();
    let timeline = aggregator.build(&outcome.messages)?;
    let transform_time = transform_start.elapsed().as_secs_f64();

    info!(
        "Analyzed {} messages from {} files into {} windows",
        outcome.stats.messages_kept,
        outcome.stats.files,
        timeline.len()
    );

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        ingest: outcome.stats,
        windows_created: timeline.len(),
        workers: ingestor.worker_count(),
        load_time_seconds: load_time,
        transform_time_seconds: transform_time,
    };

    Ok(AnalysisResult { timeline, metadata })
}
