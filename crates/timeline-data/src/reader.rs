//! Chat export discovery, decoding and format-specific field extraction.
//!
//! Two export shapes are understood: the array-of-messages dump written by
//! chat-downloader style tools, and the `{"comments": [...]}` document written
//! by Twitch VOD downloaders. The shape is sniffed from the first
//! non-whitespace byte and every record is mapped onto [`MessageFields`].

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::Value;
use timeline_core::config::TimelineConfig;
use timeline_core::error::{Result, TimelineError};
use timeline_core::time_utils::TimestampProcessor;
use tracing::{debug, warn};

// ── Formats ───────────────────────────────────────────────────────────────────

/// Which export tool produced a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatFormat {
    /// Top-level JSON array of message objects.
    Downloader,
    /// Top-level object holding a `comments` array.
    TwitchVod,
}

impl ChatFormat {
    /// `[` as the first non-whitespace byte means an array export; anything
    /// else is treated as the comments document and validated while parsing.
    pub fn sniff(bytes: &[u8]) -> Self {
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'[') => ChatFormat::Downloader,
            _ => ChatFormat::TwitchVod,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChatFormat::Downloader => "ChatDownloader",
            ChatFormat::TwitchVod => "TwitchVOD",
        }
    }
}

// ── Raw records ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct DownloaderRecord {
    pub message_id: String,
    pub message: String,
    /// Microseconds since the epoch, as a number or a numeric string.
    pub timestamp: Value,
    #[serde(default)]
    pub emotes: Vec<DownloaderEmote>,
    #[serde(default)]
    pub author: DownloaderAuthor,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloaderEmote {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloaderAuthor {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VodRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub created_at: String,
    pub commenter: VodCommenter,
    pub message: VodMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VodCommenter {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VodMessage {
    pub body: String,
    #[serde(default)]
    pub emoticons: Option<Vec<VodEmoticon>>,
}

/// Emote position as character offsets into the message body.
#[derive(Debug, Clone, Deserialize)]
pub struct VodEmoticon {
    pub begin: usize,
    pub end: usize,
}

/// One record of either export format.
#[derive(Debug, Clone)]
pub enum RawMessage {
    Downloader(DownloaderRecord),
    TwitchVod(VodRecord),
}

/// The fields every format yields, in canonical form.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageFields {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub emotes: Vec<String>,
    pub author: Option<String>,
}

impl RawMessage {
    pub fn id(&self) -> &str {
        match self {
            RawMessage::Downloader(r) => &r.message_id,
            RawMessage::TwitchVod(r) => &r.id,
        }
    }

    pub fn author(&self) -> Option<&str> {
        match self {
            RawMessage::Downloader(r) => r.author.name.as_deref(),
            RawMessage::TwitchVod(r) => Some(&r.commenter.name),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            RawMessage::Downloader(r) => &r.message,
            RawMessage::TwitchVod(r) => &r.message.body,
        }
    }

    /// Emote strings as they appear in the text. Empty names are dropped.
    pub fn emotes(&self) -> Vec<String> {
        let emotes: Vec<String> = match self {
            RawMessage::Downloader(r) => r.emotes.iter().map(|e| e.name.clone()).collect(),
            RawMessage::TwitchVod(r) => r
                .message
                .emoticons
                .iter()
                .flatten()
                .map(|e| slice_chars(&r.message.body, e.begin, e.end))
                .collect(),
        };
        emotes.into_iter().filter(|e| !e.is_empty()).collect()
    }

    /// Posting time in UTC. Array exports carry whole-second precision only.
    pub fn timestamp(&self) -> Result<DateTime<Utc>> {
        match self {
            RawMessage::Downloader(r) => TimestampProcessor::from_epoch_micros(&r.timestamp),
            RawMessage::TwitchVod(r) => TimestampProcessor::parse_iso(&r.created_at),
        }
    }

    pub fn fields(&self) -> Result<MessageFields> {
        Ok(MessageFields {
            id: self.id().to_string(),
            timestamp: self.timestamp()?,
            text: self.text().to_string(),
            emotes: self.emotes(),
            author: self.author().map(str::to_string),
        })
    }
}

/// `text[begin..end]` in characters, clamped to the text and trimmed.
fn slice_chars(text: &str, begin: usize, end: usize) -> String {
    text.chars()
        .skip(begin)
        .take(end.saturating_sub(begin))
        .collect::<String>()
        .trim()
        .to_string()
}

// ── SourceFilter ──────────────────────────────────────────────────────────────

/// Drops bot traffic and messages with excluded substrings before they are
/// normalised. A drop is not an error.
#[derive(Debug, Clone, Default)]
pub struct SourceFilter {
    excluded_authors: Vec<String>,
    excluded_terms: Vec<String>,
}

impl SourceFilter {
    pub fn new(excluded_authors: Vec<String>, excluded_terms: Vec<String>) -> Self {
        Self {
            excluded_authors,
            excluded_terms,
        }
    }

    pub fn from_config(config: &TimelineConfig) -> Self {
        Self::new(config.excluded_authors.clone(), config.excluded_terms.clone())
    }

    pub fn admits(&self, raw: &RawMessage) -> bool {
        if let Some(author) = raw.author() {
            if self.excluded_authors.iter().any(|a| a == author) {
                return false;
            }
        }
        let text = raw.text();
        !self
            .excluded_terms
            .iter()
            .any(|term| !term.is_empty() && text.contains(term.as_str()))
    }
}

// ── File access ───────────────────────────────────────────────────────────────

/// A decoded export file.
#[derive(Debug, Clone)]
pub struct ChatExport {
    pub format: ChatFormat,
    pub messages: Vec<RawMessage>,
}

/// Expand directories into the chat exports below them.
///
/// Files pass through untouched, directories contribute their `.json` and
/// `.json.gz` files sorted by path, and the input order is preserved.
pub fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }

        let mut found: Vec<PathBuf> = walkdir::WalkDir::new(input)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && is_chat_export(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        found.sort();

        if found.is_empty() {
            warn!("No chat exports found in {}", input.display());
        }
        files.extend(found);
    }
    files
}

fn is_chat_export(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    name.ends_with(".json") || name.ends_with(".json.gz")
}

/// Open an export, transparently decompressing `.gz` files.
pub fn open_chat_file(path: &Path) -> Result<Box<dyn Read>> {
    let file = std::fs::File::open(path).map_err(|source| TimelineError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let gzipped = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);
    if gzipped {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Read and decode one export file.
pub fn read_chat_export(path: &Path) -> Result<ChatExport> {
    let mut bytes = Vec::new();
    open_chat_file(path)?
        .read_to_end(&mut bytes)
        .map_err(|source| TimelineError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
    parse_chat_export(&bytes, path)
}

/// Decode export bytes. `path` is only used for error context.
pub fn parse_chat_export(bytes: &[u8], path: &Path) -> Result<ChatExport> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let format = ChatFormat::sniff(bytes);

    let messages = match format {
        ChatFormat::Downloader => serde_json::from_slice::<Vec<DownloaderRecord>>(bytes)
            .map_err(|e| record_error(path, e))?
            .into_iter()
            .map(RawMessage::Downloader)
            .collect::<Vec<_>>(),
        ChatFormat::TwitchVod => {
            let mut document: Value =
                serde_json::from_slice(bytes).map_err(|e| TimelineError::Format {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            let comments = match document.get_mut("comments") {
                Some(comments) if comments.is_array() => comments.take(),
                Some(_) => {
                    return Err(TimelineError::Format {
                        path: path.to_path_buf(),
                        reason: "\"comments\" is not an array".to_string(),
                    })
                }
                None => {
                    return Err(TimelineError::Format {
                        path: path.to_path_buf(),
                        reason: "neither a message array nor an object with \"comments\""
                            .to_string(),
                    })
                }
            };
            serde_json::from_value::<Vec<VodRecord>>(comments)
                .map_err(|e| record_error(path, e))?
                .into_iter()
                .map(RawMessage::TwitchVod)
                .collect::<Vec<_>>()
        }
    };

    debug!(
        "Decoded {} {} records from {}",
        messages.len(),
        format.name(),
        path.display()
    );

    Ok(ChatExport { format, messages })
}

fn record_error(path: &Path, e: serde_json::Error) -> TimelineError {
    TimelineError::Record {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn downloader_export() -> String {
        serde_json::json!([
            {
                "message_id": "d1",
                "message": "Kappa こんにちは",
                "timestamp": 1_723_291_200_500_000i64,
                "emotes": [{"id": "25", "name": "Kappa"}],
                "author": {"name": "viewer", "id": "1"}
            },
            {
                "message_id": "d2",
                "message": "!uptime",
                "timestamp": "1723291260000000",
                "author": {"id": "2"}
            }
        ])
        .to_string()
    }

    fn vod_export() -> String {
        serde_json::json!({
            "video": {"id": "123"},
            "comments": [
                {
                    "_id": "v1",
                    "created_at": "2024-08-10T12:00:00.2Z",
                    "commenter": {"name": "viewer", "display_name": "Viewer"},
                    "message": {
                        "body": "草 PogChamp ｗｗ",
                        "emoticons": [{"_id": "88", "begin": 2, "end": 11}]
                    }
                },
                {
                    "_id": "v2",
                    "created_at": "2024-08-10T21:01:10+09:00",
                    "commenter": {"name": "fossabot"},
                    "message": {"body": "Follow the channel!", "emoticons": null}
                }
            ]
        })
        .to_string()
    }

    fn parse(json: &str) -> Result<ChatExport> {
        parse_chat_export(json.as_bytes(), Path::new("test.json"))
    }

    // ── sniff ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_sniff_skips_leading_whitespace() {
        assert_eq!(ChatFormat::sniff(b"  \n\t[{}]"), ChatFormat::Downloader);
        assert_eq!(ChatFormat::sniff(b"\n{\"comments\": []}"), ChatFormat::TwitchVod);
        assert_eq!(ChatFormat::sniff(b""), ChatFormat::TwitchVod);
    }

    // ── parse_chat_export ─────────────────────────────────────────────────────

    #[test]
    fn test_parse_downloader_fields() {
        let export = parse(&downloader_export()).unwrap();
        assert_eq!(export.format, ChatFormat::Downloader);
        assert_eq!(export.messages.len(), 2);

        let fields = export.messages[0].fields().unwrap();
        assert_eq!(fields.id, "d1");
        assert_eq!(fields.text, "Kappa こんにちは");
        assert_eq!(fields.emotes, vec!["Kappa".to_string()]);
        assert_eq!(fields.author.as_deref(), Some("viewer"));
        // Sub-second part of the microsecond epoch is dropped.
        assert_eq!(fields.timestamp, Utc.timestamp_opt(1_723_291_200, 0).unwrap());

        let second = export.messages[1].fields().unwrap();
        assert!(second.author.is_none());
        assert!(second.emotes.is_empty());
        assert_eq!(second.timestamp.timestamp(), 1_723_291_260);
    }

    #[test]
    fn test_parse_vod_fields() {
        let export = parse(&vod_export()).unwrap();
        assert_eq!(export.format, ChatFormat::TwitchVod);
        assert_eq!(export.messages.len(), 2);

        let fields = export.messages[0].fields().unwrap();
        assert_eq!(fields.id, "v1");
        // Offsets count characters, and the slice is trimmed.
        assert_eq!(fields.emotes, vec!["PogChamp".to_string()]);
        assert_eq!(
            fields.timestamp,
            Utc.with_ymd_and_hms(2024, 8, 10, 12, 0, 0).unwrap()
                + chrono::TimeDelta::milliseconds(200)
        );

        let second = export.messages[1].fields().unwrap();
        assert!(second.emotes.is_empty());
        assert_eq!(
            second.timestamp,
            Utc.with_ymd_and_hms(2024, 8, 10, 12, 1, 10).unwrap()
        );
    }

    #[test]
    fn test_vod_emote_offsets_are_clamped() {
        let json = serde_json::json!({
            "comments": [{
                "_id": "v1",
                "created_at": "2024-08-10T12:00:00Z",
                "commenter": {"name": "a"},
                "message": {"body": "hi Kappa", "emoticons": [{"begin": 3, "end": 40}, {"begin": 5, "end": 5}]}
            }]
        })
        .to_string();
        let export = parse(&json).unwrap();
        assert_eq!(export.messages[0].emotes(), vec!["Kappa".to_string()]);
    }

    #[test]
    fn test_parse_bom_prefixed_file() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice(downloader_export().as_bytes());
        let export = parse_chat_export(&bytes, Path::new("bom.json")).unwrap();
        assert_eq!(export.format, ChatFormat::Downloader);
    }

    #[test]
    fn test_object_without_comments_is_format_error() {
        let err = parse(r#"{"video": {"id": "1"}}"#).unwrap_err();
        assert!(matches!(err, TimelineError::Format { .. }), "{err}");
    }

    #[test]
    fn test_comments_not_array_is_format_error() {
        let err = parse(r#"{"comments": {"a": 1}}"#).unwrap_err();
        assert!(matches!(err, TimelineError::Format { .. }));
    }

    #[test]
    fn test_scalar_document_is_format_error() {
        assert!(matches!(
            parse("42").unwrap_err(),
            TimelineError::Format { .. }
        ));
    }

    #[test]
    fn test_record_missing_field_is_record_error() {
        let err = parse(r#"[{"message": "no id", "timestamp": 1}]"#).unwrap_err();
        assert!(matches!(err, TimelineError::Record { .. }), "{err}");
    }

    #[test]
    fn test_bad_timestamp_surfaces_on_fields() {
        let json = r#"[{"message_id": "x", "message": "hi", "timestamp": "later"}]"#;
        let export = parse(json).unwrap();
        assert!(matches!(
            export.messages[0].fields(),
            Err(TimelineError::TimestampParse(_))
        ));
    }

    // ── SourceFilter ──────────────────────────────────────────────────────────

    #[test]
    fn test_filter_drops_bot_and_excluded_terms() {
        let filter = SourceFilter::new(vec!["fossabot".to_string()], vec!["!uptime".to_string()]);
        let downloader = parse(&downloader_export()).unwrap();
        let vod = parse(&vod_export()).unwrap();

        assert!(filter.admits(&downloader.messages[0]));
        assert!(!filter.admits(&downloader.messages[1]), "excluded term");
        assert!(filter.admits(&vod.messages[0]));
        assert!(!filter.admits(&vod.messages[1]), "bot author");
    }

    #[test]
    fn test_filter_from_default_config_keeps_anonymous_authors() {
        let filter = SourceFilter::from_config(&TimelineConfig::default());
        let downloader = parse(&downloader_export()).unwrap();
        assert!(filter.admits(&downloader.messages[1]));
    }

    // ── File access ───────────────────────────────────────────────────────────

    #[test]
    fn test_read_plain_and_gzipped_exports() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("day1.json");
        std::fs::write(&plain, downloader_export()).unwrap();

        let gz = dir.path().join("day2.json.gz");
        let mut encoder = GzEncoder::new(std::fs::File::create(&gz).unwrap(), Compression::default());
        encoder.write_all(vod_export().as_bytes()).unwrap();
        encoder.finish().unwrap();

        assert_eq!(read_chat_export(&plain).unwrap().format, ChatFormat::Downloader);
        let decoded = read_chat_export(&gz).unwrap();
        assert_eq!(decoded.format, ChatFormat::TwitchVod);
        assert_eq!(decoded.messages.len(), 2);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_chat_export(Path::new("/tmp/does-not-exist-chat-timeline.json")).unwrap_err();
        assert!(matches!(err, TimelineError::FileRead { .. }));
    }

    #[test]
    fn test_expand_inputs_walks_directories_sorted() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("vods");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("b.json"), "[]").unwrap();
        std::fs::write(sub.join("a.json.gz"), "").unwrap();
        std::fs::write(sub.join("notes.txt"), "").unwrap();
        let single = dir.path().join("first.json");
        std::fs::write(&single, "[]").unwrap();

        let files = expand_inputs(&[single.clone(), sub.clone()]);
        assert_eq!(files, vec![single, sub.join("a.json.gz"), sub.join("b.json")]);
    }
}
