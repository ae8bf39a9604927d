//! Plain-text run summary printed after the word table is written.

use std::fmt::Write;

use timeline_core::formatting::{format_count, format_window, percentage};
use timeline_core::time_utils::TimezoneHandler;
use timeline_runtime::orchestrator::RunOutcome;

/// Render the summary block. `top` limits the word list.
pub fn render_summary(outcome: &RunOutcome, tz: &TimezoneHandler, top: usize) -> String {
    let timeline = &outcome.timeline;
    let total = timeline.total_messages();
    let mut out = String::new();

    if let Some((first, last)) = timeline.span() {
        let _ = writeln!(
            out,
            "Windows: {} → {} ({}), {} × {}",
            tz.format_short(first),
            tz.format_short(last),
            tz.tz().name(),
            format_count(timeline.len() as u64),
            format_window(timeline.window()),
        );
    }

    let source = if outcome.from_cache() { ", cached" } else { "" };
    let _ = writeln!(
        out,
        "Messages: {} from {} file(s){}",
        format_count(total),
        outcome.files.len(),
        source
    );

    if let Some(meta) = &outcome.metadata {
        let _ = writeln!(
            out,
            "Records: {} read, {} filtered, {} duplicates ({:.2}s load, {:.2}s windowing)",
            format_count(meta.ingest.records_read as u64),
            format_count(meta.ingest.records_filtered as u64),
            format_count(meta.ingest.duplicates_dropped as u64),
            meta.load_time_seconds,
            meta.transform_time_seconds,
        );
    }

    let words = timeline.word_totals();
    if top > 0 && !words.is_empty() {
        out.push_str("Top words:\n");
        for (rank, (word, count)) in words.iter().take(top).enumerate() {
            let _ = writeln!(
                out,
                "{:>4}. {}  {} ({:.1}%)",
                rank + 1,
                word,
                format_count(*count),
                percentage(*count, total, 1),
            );
        }
    }

    out
}
