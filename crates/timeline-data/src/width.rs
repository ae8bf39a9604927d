//! Half-width to full-width katakana folding.
//!
//! The segmenter dictionary only knows full-width kana, so `ｶﾞﾝﾊﾞﾚ` has to
//! become `ガンバレ` first. Only the half-width katakana block is touched;
//! ASCII and full-width text pass through unchanged.

use unicode_normalization::UnicodeNormalization;

const HALFWIDTH_KANA: std::ops::RangeInclusive<char> = '\u{FF61}'..='\u{FF9F}';

fn is_halfwidth_kana(c: char) -> bool {
    HALFWIDTH_KANA.contains(&c)
}

/// Fold every run of half-width katakana (including voiced marks) to its
/// composed full-width form.
pub fn fold_halfwidth_kana(text: &str) -> String {
    if !text.chars().any(is_halfwidth_kana) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut run = String::new();
    for c in text.chars() {
        if is_halfwidth_kana(c) {
            run.push(c);
            continue;
        }
        if !run.is_empty() {
            out.extend(run.nfkc());
            run.clear();
        }
        out.push(c);
    }
    if !run.is_empty() {
        out.extend(run.nfkc());
    }
    out
}
