use clap::Parser;
use std::path::{Path, PathBuf};

use crate::config::{TimelineConfig, MAX_WINDOW_SECS};
use crate::error::Result;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Per-minute word frequency timeline from exported live-stream chat logs
#[derive(Parser, Debug, Clone)]
#[command(
    name = "chat-timeline",
    about = "Per-minute word frequency timeline from exported live-stream chat logs",
    version
)]
pub struct Settings {
    /// Chat export files (.json or .json.gz) or directories containing them
    #[arg(required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Normalisation config file (default: ~/.chat-timeline/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Window width in seconds (overrides the config file)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_WINDOW_SECS))]
    pub window_secs: Option<u64>,

    /// Normalisation worker threads (0 = one per CPU)
    #[arg(long, default_value = "0")]
    pub jobs: usize,

    /// Timeline cache file (default: ~/.chat-timeline/cache/timeline.json)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Always recompute and do not touch the cache
    #[arg(long)]
    pub no_cache: bool,

    /// Where to write the word → count table
    #[arg(long, default_value = "words.tab")]
    pub words_out: PathBuf,

    /// Timezone for the printed summary (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Number of top words shown in the summary
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse the process arguments and apply `--debug`.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Same as [`Settings::load`] with an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::resolve(Settings::parse_from(args))
    }

    fn resolve(mut settings: Settings) -> Settings {
        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Home directory of the tool: `~/.chat-timeline`.
    pub fn app_dir() -> PathBuf {
        Self::app_dir_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    pub fn app_dir_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".chat-timeline")
    }

    /// Cache file to use, or `None` when caching is disabled.
    pub fn cache_path(&self) -> Option<PathBuf> {
        if self.no_cache {
            return None;
        }
        Some(
            self.cache
                .clone()
                .unwrap_or_else(|| Self::app_dir().join("cache").join("timeline.json")),
        )
    }

    /// Load the config file and layer the command-line overrides on top.
    pub fn load_config(&self) -> Result<TimelineConfig> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(TimelineConfig::config_path);
        let mut config = TimelineConfig::load_from(&path)?;
        if let Some(secs) = self.window_secs {
            config.window_secs = secs;
        }
        config.validate()?;
        Ok(config)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
