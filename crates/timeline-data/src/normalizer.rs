//! Message text → canonical word set.
//!
//! The text is stripped stage by stage (emotes, stop words, URLs, slang
//! patterns, known phrases), width-folded, segmented, and the noun/verb groups
//! that remain become tokens. Laughter slang is collapsed to one canonical
//! token and a message with visible but unparsed text keeps that text as its
//! only token.

use std::collections::BTreeSet;
use std::sync::Arc;

use regex::Regex;
use timeline_core::config::{PartOfSpeech, TimelineConfig};
use timeline_core::error::{Result, TimelineError};
use timeline_core::models::NormalizedMessage;

use crate::reader::MessageFields;
use crate::segmenter::{Morpheme, Segmenter};
use crate::width::fold_halfwidth_kana;

const URL_PATTERN: &str = r"https?://[\w/:%#$&?()~.=+\-]+";

struct CompiledRule {
    regex: Regex,
    canonical: String,
    anchored: bool,
}

/// Stateless once built; one instance is shared by every worker.
pub struct Normalizer {
    stop_words: Vec<String>,
    url: Regex,
    rules: Vec<CompiledRule>,
    phrases: Vec<String>,
    laughter_token: String,
    tripwire_tokens: Vec<String>,
    segmenter: Arc<dyn Segmenter>,
}

impl Normalizer {
    pub fn new(config: &TimelineConfig, segmenter: Arc<dyn Segmenter>) -> Result<Self> {
        let rules = config
            .patterns
            .iter()
            .map(|rule| {
                let regex = Regex::new(&rule.pattern).map_err(|e| {
                    TimelineError::Config(format!("invalid pattern {:?}: {}", rule.pattern, e))
                })?;
                Ok(CompiledRule {
                    regex,
                    canonical: rule.canonical.clone(),
                    anchored: rule.is_anchored(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let url = Regex::new(URL_PATTERN)
            .map_err(|e| TimelineError::Config(format!("invalid url pattern: {}", e)))?;

        Ok(Self {
            stop_words: config
                .stop_words
                .iter()
                .filter(|w| !w.is_empty())
                .cloned()
                .collect(),
            url,
            rules,
            phrases: config
                .phrases
                .iter()
                .filter(|p| !p.is_empty())
                .cloned()
                .collect(),
            laughter_token: config.laughter_token.clone(),
            tripwire_tokens: config.tripwire_tokens.clone(),
            segmenter,
        })
    }

    /// Normalise one message.
    ///
    /// Fails with [`TimelineError::Integrity`] when the tokens contain a
    /// tripwire marker.
    pub fn normalize(&self, fields: &MessageFields) -> Result<NormalizedMessage> {
        let emotes: BTreeSet<String> = fields
            .emotes
            .iter()
            .filter(|e| !self.stop_words.contains(e))
            .cloned()
            .collect();

        let mut text = fields.text.clone();
        // Longest first so a short emote never splits a longer one.
        let mut spans: Vec<&String> = fields.emotes.iter().collect();
        spans.sort_by_key(|e| std::cmp::Reverse(e.len()));
        for emote in spans {
            text = text.replace(emote.as_str(), "");
        }

        let tokens = self.extract_tokens(text);

        if let Some(token) = self
            .tripwire_tokens
            .iter()
            .find(|t| tokens.contains(t.as_str()))
        {
            return Err(TimelineError::Integrity {
                path: None,
                id: fields.id.clone(),
                token: token.clone(),
            });
        }

        Ok(NormalizedMessage::new(
            fields.id.clone(),
            fields.timestamp,
            tokens,
            emotes,
        ))
    }

    /// Everything after emote removal: returns the content tokens.
    fn extract_tokens(&self, mut text: String) -> BTreeSet<String> {
        let mut tokens = BTreeSet::new();

        for stop in &self.stop_words {
            text = text.replace(stop.as_str(), "");
        }

        text = self.url.replace_all(&text, "").into_owned();

        for rule in &self.rules {
            if !rule.regex.find_iter(&text).any(|m| !m.as_str().is_empty()) {
                continue;
            }
            tokens.insert(rule.canonical.clone());
            if rule.anchored {
                text.clear();
            } else {
                text = rule.regex.replace_all(&text, "").into_owned();
            }
        }

        for phrase in &self.phrases {
            if text.contains(phrase.as_str()) {
                tokens.insert(phrase.clone());
                text = text.replace(phrase.as_str(), "");
            }
        }

        let text = fold_halfwidth_kana(&text);

        tokens.extend(group_morphemes(&self.segmenter.segment(&text)));

        if tokens.iter().any(|t| is_laughter(t)) {
            tokens.retain(|t| !is_laughter(t));
            tokens.insert(self.laughter_token.clone());
        }

        let leftover = text.trim();
        if tokens.is_empty() && !leftover.is_empty() {
            tokens.insert(leftover.to_string());
        }

        tokens
    }
}

/// Join each noun/verb with the auxiliary verbs that directly follow it.
///
/// Any other morpheme closes the open group; a noun or verb also opens the
/// next one.
fn group_morphemes(morphemes: &[Morpheme]) -> Vec<String> {
    let mut groups = Vec::new();
    let mut current: Option<String> = None;

    for morpheme in morphemes {
        if let (Some(group), PartOfSpeech::AuxiliaryVerb) = (current.as_mut(), morpheme.pos) {
            group.push_str(&morpheme.surface);
            continue;
        }
        if let Some(group) = current.take() {
            groups.push(group);
        }
        if morpheme.pos.starts_group() {
            current = Some(morpheme.surface.clone());
        }
    }

    groups.extend(current);
    groups
}

/// `w` in any width or case marks laughter slang (`ｗｗｗ`, `wwww`, `草ｗ`).
fn is_laughter(token: &str) -> bool {
    token
        .chars()
        .any(|c| matches!(c, 'w' | 'W' | 'ｗ' | 'Ｗ'))
}
