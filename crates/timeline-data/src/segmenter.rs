//! Morphological segmentation.
//!
//! [`Segmenter`] is the seam between the normaliser and whatever engine splits
//! text into morphemes. The engine is built once, never mutated afterwards,
//! and shared by every normalisation worker behind an `Arc`.
//!
//! [`LexiconSegmenter`] is the built-in engine: longest dictionary match at
//! each position, with unknown characters grouped by script.

use std::collections::HashMap;

use timeline_core::config::{LexiconEntry, PartOfSpeech};
use timeline_core::error::{Result, TimelineError};

/// Bundled core dictionary (`surface<TAB>pos` per line, `#` comments).
const CORE_LEXICON: &str = include_str!("lexicon.tsv");

/// One unit of segmented text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Morpheme {
    pub surface: String,
    pub pos: PartOfSpeech,
}

impl Morpheme {
    pub fn new(surface: impl Into<String>, pos: PartOfSpeech) -> Self {
        Self {
            surface: surface.into(),
            pos,
        }
    }
}

/// Splits text into morphemes. Implementations must be safe to call from
/// many threads at once.
pub trait Segmenter: Send + Sync {
    fn segment(&self, text: &str) -> Vec<Morpheme>;

    /// Stable name of the engine and its dictionary. Timelines cached under
    /// one identity are never reused under another.
    fn identity(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// Particles that close a kanji noun instead of inflecting it.
const NOUN_PARTICLES: &[&str] = &[
    "が", "を", "に", "へ", "と", "の", "は", "も", "で", "や", "から", "まで", "より", "て",
    "よ", "ね", "な", "わ", "ぞ", "さ", "けど", "けれど", "だけ", "ながら",
];

// ── Script classes ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Kanji,
    Hiragana,
    Katakana,
    Alnum,
    Whitespace,
    Symbol,
}

impl CharClass {
    fn of(c: char) -> Self {
        match c {
            c if c.is_whitespace() => CharClass::Whitespace,
            '\u{3005}' | '\u{3006}' | '\u{3400}'..='\u{4DBF}' | '\u{4E00}'..='\u{9FFF}'
            | '\u{F900}'..='\u{FAFF}' => CharClass::Kanji,
            '\u{3041}'..='\u{309F}' => CharClass::Hiragana,
            '\u{30A0}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' => CharClass::Katakana,
            c if c.is_ascii_alphanumeric() => CharClass::Alnum,
            '\u{FF10}'..='\u{FF19}' | '\u{FF21}'..='\u{FF3A}' | '\u{FF41}'..='\u{FF5A}' => {
                CharClass::Alnum
            }
            _ => CharClass::Symbol,
        }
    }

    /// Part of speech assigned to a run of unknown characters.
    fn unknown_pos(self) -> PartOfSpeech {
        match self {
            CharClass::Kanji | CharClass::Katakana | CharClass::Alnum => PartOfSpeech::Noun,
            CharClass::Hiragana => PartOfSpeech::Other,
            CharClass::Whitespace => PartOfSpeech::Whitespace,
            CharClass::Symbol => PartOfSpeech::Symbol,
        }
    }
}

// ── LexiconSegmenter ──────────────────────────────────────────────────────────

/// Dictionary-driven longest-match segmenter.
#[derive(Debug, Clone)]
pub struct LexiconSegmenter {
    entries: HashMap<String, PartOfSpeech>,
    /// Longest dictionary surface, in characters.
    max_chars: usize,
}

impl LexiconSegmenter {
    /// An engine with no dictionary at all; every run is classified by script.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            max_chars: 0,
        }
    }

    /// The bundled core dictionary plus `extra` entries, which win on conflict.
    pub fn with_core_lexicon(extra: &[LexiconEntry]) -> Result<Self> {
        let mut segmenter = Self::empty();
        for (line_no, line) in CORE_LEXICON.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (surface, pos) = parse_lexicon_line(line).ok_or_else(|| {
                TimelineError::Config(format!("core lexicon line {}: {:?}", line_no + 1, line))
            })?;
            segmenter.insert(surface, pos);
        }
        for entry in extra {
            segmenter.insert(&entry.surface, entry.pos);
        }
        Ok(segmenter)
    }

    pub fn insert(&mut self, surface: &str, pos: PartOfSpeech) {
        if surface.is_empty() {
            return;
        }
        self.max_chars = self.max_chars.max(surface.chars().count());
        self.entries.insert(surface.to_string(), pos);
    }

    /// Longest dictionary word starting at char index `i`, as
    /// `(end byte offset, chars consumed, pos)`.
    fn longest_match(
        &self,
        text: &str,
        offsets: &[usize],
        i: usize,
    ) -> Option<(usize, usize, PartOfSpeech)> {
        let remaining = offsets.len() - 1 - i;
        let longest = self.max_chars.min(remaining);
        (1..=longest).rev().find_map(|len| {
            let end = offsets[i + len];
            self.entries
                .get(&text[offsets[i]..end])
                .map(|pos| (end, len, *pos))
        })
    }

    /// Number of hiragana chars from `start` that inflect the kanji stem
    /// just before them (`走|っ|た`, `食|べる`).
    ///
    /// The scan stops at the first dictionary word, except that a leading
    /// particle outside [`NOUN_PARTICLES`] (`行|か|ない`) is read as
    /// okurigana. A leading verb or auxiliary always stops it.
    fn okurigana_len(&self, text: &str, offsets: &[usize], start: usize) -> usize {
        let mut taken = 0;
        while start + taken + 1 < offsets.len() {
            let at = start + taken;
            let is_kana = text[offsets[at]..]
                .chars()
                .next()
                .is_some_and(|c| CharClass::of(c) == CharClass::Hiragana);
            if !is_kana {
                break;
            }
            if let Some((end, _, pos)) = self.longest_match(text, offsets, at) {
                let inflects = taken == 0
                    && pos == PartOfSpeech::Particle
                    && !NOUN_PARTICLES.contains(&&text[offsets[at]..end]);
                if !inflects {
                    break;
                }
            }
            taken += 1;
        }
        taken
    }
}

fn parse_lexicon_line(line: &str) -> Option<(&str, PartOfSpeech)> {
    let (surface, pos) = line.split_once('\t')?;
    let pos = match pos.trim() {
        "noun" => PartOfSpeech::Noun,
        "verb" => PartOfSpeech::Verb,
        "auxiliary_verb" => PartOfSpeech::AuxiliaryVerb,
        "particle" => PartOfSpeech::Particle,
        "adjective" => PartOfSpeech::Adjective,
        "adverb" => PartOfSpeech::Adverb,
        "interjection" => PartOfSpeech::Interjection,
        _ => return None,
    };
    Some((surface, pos))
}

impl Segmenter for LexiconSegmenter {
    fn identity(&self) -> String {
        format!(
            "lexicon-{}/{}-entries",
            env!("CARGO_PKG_VERSION"),
            self.entries.len()
        )
    }

    fn segment(&self, text: &str) -> Vec<Morpheme> {
        // Byte offset of every char boundary, including the end of the text.
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();

        let mut morphemes: Vec<Morpheme> = Vec::new();
        // Class of the unknown run the last morpheme belongs to, if any.
        let mut open_run: Option<CharClass> = None;
        let mut i = 0;

        while i + 1 < offsets.len() {
            if let Some((end, len, pos)) = self.longest_match(text, &offsets, i) {
                morphemes.push(Morpheme::new(&text[offsets[i]..end], pos));
                open_run = None;
                i += len;
                continue;
            }

            let surface = &text[offsets[i]..offsets[i + 1]];
            let class = surface.chars().next().map(CharClass::of).unwrap_or(CharClass::Symbol);
            match (open_run, morphemes.last_mut()) {
                (Some(run), Some(last)) if run == class => last.surface.push_str(surface),
                _ => {
                    morphemes.push(Morpheme::new(surface, class.unknown_pos()));
                    open_run = Some(class);
                }
            }
            i += 1;

            if class == CharClass::Kanji {
                let taken = self.okurigana_len(text, &offsets, i);
                if taken > 0 {
                    if let Some(last) = morphemes.last_mut() {
                        last.surface.push_str(&text[offsets[i]..offsets[i + taken]]);
                        last.pos = PartOfSpeech::Verb;
                    }
                    open_run = None;
                    i += taken;
                }
            }
        }

        morphemes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surfaces(morphemes: &[Morpheme]) -> Vec<(&str, PartOfSpeech)> {
        morphemes.iter().map(|m| (m.surface.as_str(), m.pos)).collect()
    }

    #[test]
    fn test_core_lexicon_loads() {
        let segmenter = LexiconSegmenter::with_core_lexicon(&[]).unwrap();
        assert!(segmenter.entries.len() > 50);
    }

    #[test]
    fn test_unknown_runs_grouped_by_script() {
        let segmenter = LexiconSegmenter::empty();
        let out = segmenter.segment("世界記録 ナイス GG2!!");
        assert_eq!(
            surfaces(&out),
            vec![
                ("世界記録", PartOfSpeech::Noun),
                (" ", PartOfSpeech::Whitespace),
                ("ナイス", PartOfSpeech::Noun),
                (" ", PartOfSpeech::Whitespace),
                ("GG2", PartOfSpeech::Noun),
                ("!!", PartOfSpeech::Symbol),
            ]
        );
    }

    #[test]
    fn test_dictionary_words_split_runs() {
        let segmenter = LexiconSegmenter::with_core_lexicon(&[]).unwrap();
        let out = segmenter.segment("記録がきた");
        assert_eq!(
            surfaces(&out),
            vec![
                ("記録", PartOfSpeech::Noun),
                ("が", PartOfSpeech::Particle),
                ("きた", PartOfSpeech::Verb),
            ]
        );
    }

    #[test]
    fn test_longest_match_wins() {
        let mut segmenter = LexiconSegmenter::empty();
        segmenter.insert("られ", PartOfSpeech::AuxiliaryVerb);
        segmenter.insert("られる", PartOfSpeech::AuxiliaryVerb);
        let out = segmenter.segment("られる");
        assert_eq!(surfaces(&out), vec![("られる", PartOfSpeech::AuxiliaryVerb)]);
    }

    #[test]
    fn test_extra_entries_override_core() {
        let extra = [LexiconEntry {
            surface: "きた".to_string(),
            pos: PartOfSpeech::Noun,
        }];
        let segmenter = LexiconSegmenter::with_core_lexicon(&extra).unwrap();
        assert_eq!(
            surfaces(&segmenter.segment("きた")),
            vec![("きた", PartOfSpeech::Noun)]
        );
    }

    #[test]
    fn test_unknown_hiragana_is_other() {
        let segmenter = LexiconSegmenter::empty();
        assert_eq!(
            surfaces(&segmenter.segment("ぴえ")),
            vec![("ぴえ", PartOfSpeech::Other)]
        );
    }

    // ── okurigana ─────────────────────────────────────────────────────────────

    #[test]
    fn test_kanji_stem_takes_okurigana() {
        let segmenter = LexiconSegmenter::with_core_lexicon(&[]).unwrap();
        assert_eq!(
            surfaces(&segmenter.segment("走った")),
            vec![("走っ", PartOfSpeech::Verb), ("た", PartOfSpeech::AuxiliaryVerb)]
        );
        assert_eq!(
            surfaces(&segmenter.segment("食べる")),
            vec![("食べる", PartOfSpeech::Verb)]
        );
    }

    #[test]
    fn test_negative_stem_keeps_its_vowel() {
        let segmenter = LexiconSegmenter::with_core_lexicon(&[]).unwrap();
        assert_eq!(
            surfaces(&segmenter.segment("行かない")),
            vec![("行か", PartOfSpeech::Verb), ("ない", PartOfSpeech::AuxiliaryVerb)]
        );
    }

    #[test]
    fn test_progressive_auxiliary_after_kanji() {
        let segmenter = LexiconSegmenter::with_core_lexicon(&[]).unwrap();
        assert_eq!(
            surfaces(&segmenter.segment("見てる")),
            vec![("見", PartOfSpeech::Noun), ("てる", PartOfSpeech::AuxiliaryVerb)]
        );
    }

    #[test]
    fn test_case_particle_still_closes_noun() {
        let segmenter = LexiconSegmenter::with_core_lexicon(&[]).unwrap();
        assert_eq!(
            surfaces(&segmenter.segment("記録の更新した")),
            vec![
                ("記録", PartOfSpeech::Noun),
                ("の", PartOfSpeech::Particle),
                ("更新", PartOfSpeech::Noun),
                ("した", PartOfSpeech::Verb),
            ]
        );
    }

    #[test]
    fn test_without_dictionary_kanji_absorbs_trailing_kana() {
        let segmenter = LexiconSegmenter::empty();
        assert_eq!(
            surfaces(&segmenter.segment("勝った!")),
            vec![("勝った", PartOfSpeech::Verb), ("!", PartOfSpeech::Symbol)]
        );
    }

    // ── identity ──────────────────────────────────────────────────────────────

    #[test]
    fn test_identity_tracks_dictionary() {
        let core = LexiconSegmenter::with_core_lexicon(&[]).unwrap();
        let extra = [LexiconEntry {
            surface: "ぴえん".to_string(),
            pos: PartOfSpeech::Interjection,
        }];
        let extended = LexiconSegmenter::with_core_lexicon(&extra).unwrap();
        assert_ne!(core.identity(), extended.identity());
        assert_eq!(core.identity(), LexiconSegmenter::with_core_lexicon(&[]).unwrap().identity());
    }

    #[test]
    fn test_empty_text() {
        assert!(LexiconSegmenter::empty().segment("").is_empty());
    }

    #[test]
    fn test_fullwidth_latin_is_one_noun() {
        let segmenter = LexiconSegmenter::empty();
        assert_eq!(
            surfaces(&segmenter.segment("ｗｗｗ")),
            vec![("ｗｗｗ", PartOfSpeech::Noun)]
        );
    }
}
