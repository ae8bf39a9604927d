//! Word table export: every word of the run with its total count.

use std::io::Write;
use std::path::Path;

use timeline_core::error::Result;
use timeline_core::models::Timeline;

/// Render `word<TAB>count` lines, highest count first.
pub fn render_word_table(timeline: &Timeline) -> String {
    let mut out = String::new();
    for (word, count) in timeline.word_totals() {
        out.push_str(&word);
        out.push('\t');
        out.push_str(&count.to_string());
        out.push('\n');
    }
    out
}

/// Write the word table to `path` atomically. Returns the number of rows.
pub fn write_word_table(timeline: &Timeline, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let table = render_word_table(timeline);
    let tmp = path.with_extension("tab.tmp");
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(table.as_bytes())?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;

    let rows = table.lines().count();
    tracing::debug!("Wrote {} words to {}", rows, path.display());
    Ok(rows)
}
