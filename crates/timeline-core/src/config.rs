//! Normalisation and windowing configuration.
//!
//! Every list the pipeline consults (stop words, slang patterns, known
//! phrases, exclusions) lives in [`TimelineConfig`], which is loaded once and
//! then handed to the constructors that need it. Nothing reads ambient state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TimelineError};

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Default window width in seconds.
pub const DEFAULT_WINDOW_SECS: u64 = 60;

/// Widest accepted window: one week.
pub const MAX_WINDOW_SECS: u64 = 7 * 24 * 60 * 60;

/// Canonical token that replaces any laughter slang.
pub const DEFAULT_LAUGHTER_TOKEN: &str = "ｗｗｗ";

/// Chat bot whose messages are never counted.
pub const DEFAULT_BOT_AUTHOR: &str = "fossabot";

/// Token that only ever appears when an export is corrupted.
pub const DEFAULT_TRIPWIRE_TOKEN: &str = "rtaClap r";

// ── Lexicon types ─────────────────────────────────────────────────────────────

/// Coarse part of speech, as far as token grouping cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartOfSpeech {
    Noun,
    Verb,
    AuxiliaryVerb,
    Particle,
    Adjective,
    Adverb,
    Interjection,
    Symbol,
    Whitespace,
    Other,
}

impl PartOfSpeech {
    /// Whether a token of this kind opens a new word group.
    pub fn starts_group(self) -> bool {
        matches!(self, PartOfSpeech::Noun | PartOfSpeech::Verb)
    }
}

/// Extra dictionary word for the built-in segmenter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexiconEntry {
    pub surface: String,
    pub pos: PartOfSpeech,
}

/// A slang pattern and the canonical token it stands for.
///
/// A pattern written as `^...$` describes the whole message: when it matches,
/// nothing else in the text is tokenised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    pub pattern: String,
    pub canonical: String,
}

impl PatternRule {
    pub fn new(pattern: impl Into<String>, canonical: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            canonical: canonical.into(),
        }
    }

    pub fn is_anchored(&self) -> bool {
        self.pattern.starts_with('^') && self.pattern.ends_with('$')
    }
}

// ── TimelineConfig ────────────────────────────────────────────────────────────

/// Immutable inputs of the normaliser and the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Width of one timeline window.
    pub window_secs: u64,
    /// Authors whose messages are dropped before normalisation.
    pub excluded_authors: Vec<String>,
    /// Messages containing any of these substrings are dropped.
    pub excluded_terms: Vec<String>,
    /// Substrings erased from the text; also never counted as emotes.
    pub stop_words: Vec<String>,
    /// Known phrases counted as-is whenever they appear.
    pub phrases: Vec<String>,
    /// Slang rules, applied in order.
    pub patterns: Vec<PatternRule>,
    pub laughter_token: String,
    /// Tokens that abort the run when a message produces them.
    pub tripwire_tokens: Vec<String>,
    /// Words added to the segmenter dictionary.
    pub lexicon: Vec<LexiconEntry>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW_SECS,
            excluded_authors: vec![DEFAULT_BOT_AUTHOR.to_string()],
            excluded_terms: Vec::new(),
            stop_words: Vec::new(),
            phrases: Vec::new(),
            patterns: vec![
                PatternRule::new("^[8８]{3,}$", "８８８"),
                PatternRule::new("[?？]{2,}", "？？"),
            ],
            laughter_token: DEFAULT_LAUGHTER_TOKEN.to_string(),
            tripwire_tokens: vec![DEFAULT_TRIPWIRE_TOKEN.to_string()],
            lexicon: Vec::new(),
        }
    }
}

impl TimelineConfig {
    /// Default location: `~/.chat-timeline/config.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".chat-timeline").join("config.json")
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    ///
    /// A file that exists but does not parse or validate is an error; a
    /// silently ignored typo would change every count.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| TimelineError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| TimelineError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.window_secs == 0 {
            return Err(TimelineError::Config(
                "window_secs must be greater than zero".to_string(),
            ));
        }
        if self.window_secs > MAX_WINDOW_SECS {
            return Err(TimelineError::Config(format!(
                "window_secs must be at most {} (one week), got {}",
                MAX_WINDOW_SECS, self.window_secs
            )));
        }
        if self.laughter_token.trim().is_empty() {
            return Err(TimelineError::Config(
                "laughter_token must not be empty".to_string(),
            ));
        }
        for rule in &self.patterns {
            regex::Regex::new(&rule.pattern).map_err(|e| {
                TimelineError::Config(format!("invalid pattern {:?}: {}", rule.pattern, e))
            })?;
        }
        Ok(())
    }

    /// Window width as a duration; fails for widths no timestamp can carry.
    pub fn window(&self) -> Result<chrono::TimeDelta> {
        i64::try_from(self.window_secs)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .ok_or_else(|| {
                TimelineError::Config(format!("window_secs {} is out of range", self.window_secs))
            })
    }
}
