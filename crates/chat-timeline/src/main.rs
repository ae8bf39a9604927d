mod bootstrap;
mod summary;

use anyhow::{bail, Context, Result};
use timeline_core::formatting::format_window;
use timeline_core::settings::Settings;
use timeline_core::time_utils::TimezoneHandler;
use timeline_runtime::cache::TimelineCache;
use timeline_runtime::export::write_word_table;
use timeline_runtime::orchestrator::TimelineOrchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("chat-timeline v{} starting", env!("CARGO_PKG_VERSION"));

    let config = settings.load_config().context("loading configuration")?;
    tracing::info!(
        "Window: {}, inputs: {}, jobs: {}",
        format_window(config.window()?),
        settings.inputs.len(),
        settings.jobs
    );

    let orchestrator = TimelineOrchestrator::new(settings.inputs.clone(), config, settings.jobs)
        .with_cache(settings.cache_path().map(TimelineCache::new));

    // Nothing is written until the whole timeline exists, so an interrupted
    // run leaves no output behind. Dropping the run future cancels the
    // analysis, which lets the runtime shut down without waiting it out.
    let outcome = tokio::select! {
        result = orchestrator.run() => result.context("building timeline")?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Ctrl+C received; abandoning run");
            bail!("interrupted");
        }
    };

    let rows = write_word_table(&outcome.timeline, &settings.words_out)
        .with_context(|| format!("writing {}", settings.words_out.display()))?;
    tracing::info!("Wrote {} words to {}", rows, settings.words_out.display());

    let tz = TimezoneHandler::new(&settings.timezone);
    print!("{}", summary::render_summary(&outcome, &tz, settings.top));

    Ok(())
}
