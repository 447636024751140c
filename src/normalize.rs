//! OCR text cleanup: page markers, soft hyphens, line-wrap hyphenation,
//! dash canonicalization, and whitespace collapsing.
//!
//! Steps run in a fixed order because later ones assume earlier artifacts are
//! gone (de-hyphenation must see the raw line breaks page markers would
//! otherwise interrupt). The whole pass is total and idempotent.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static PAGE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^\s*---\s*Sayfa\s*\d+\s*---\s*$").unwrap());

static PAGE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^\s*(sayfa\s*)?\d+\s*$").unwrap());

static HYPHEN_WRAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w)-\n(\w)").unwrap());

static SPACED_HYPHEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+-\s+").unwrap());

static SPACED_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+—\s+").unwrap());

static TRAILING_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+\n").unwrap());

static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

static INLINE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());

/// Normalizes a raw OCR document for parsing. Empty input yields an empty
/// string; no failure mode.
pub fn clean_text(raw: &str) -> String {
    // Compose first so decomposed diacritics compare equal everywhere below.
    let t: String = raw.nfc().collect();
    let t = PAGE_MARKER.replace_all(&t, "");
    let t = PAGE_NUMBER.replace_all(&t, "");
    let t = t.replace('\u{00ad}', "");
    // 'za-\nyıf' -> 'zayıf', only between word characters
    let t = HYPHEN_WRAP.replace_all(&t, "$1$2");
    // En-dash becomes the separator dash, minus sign a plain hyphen.
    let t = t.replace('–', "—").replace('−', "-");
    let t = SPACED_HYPHEN.replace_all(&t, " — ");
    let t = SPACED_DASH.replace_all(&t, " — ");
    let t = TRAILING_WS.replace_all(&t, "\n");
    let t = BLANK_RUNS.replace_all(&t, "\n\n");
    let t = INLINE_WS.replace_all(&t, " ");
    t.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_page_markers() {
        let text = "kelime — anlam\n--- Sayfa 12 ---\ndevam";
        let cleaned = clean_text(text);
        assert!(!cleaned.contains("Sayfa"));
        assert!(cleaned.contains("kelime — anlam"));
        assert!(cleaned.contains("devam"));
    }

    #[test]
    fn removes_bare_page_numbers() {
        let cleaned = clean_text("madde — tanım\n42\nsayfa 7\nson");
        assert!(!cleaned.contains("42"));
        assert!(!cleaned.contains("sayfa 7"));
    }

    #[test]
    fn strips_soft_hyphens() {
        assert_eq!(clean_text("za\u{00ad}yıf"), "zayıf");
    }

    #[test]
    fn joins_hyphen_wrapped_words() {
        assert_eq!(clean_text("za-\nyıf"), "zayıf");
    }

    #[test]
    fn hyphen_wrap_needs_letters_on_both_sides() {
        let cleaned = clean_text("bir -\niki");
        assert!(cleaned.contains("bir — iki"));
    }

    #[test]
    fn canonicalizes_dashes() {
        // en-dash becomes the separator, minus sign a plain hyphen
        assert_eq!(clean_text("kelime – anlam"), "kelime — anlam");
        assert_eq!(clean_text("a−b"), "a-b");
    }

    #[test]
    fn collapses_inline_whitespace_and_blank_lines() {
        let cleaned = clean_text("a  \t b\n\n\n\nc");
        assert_eq!(cleaned, "a b\n\nc");
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("   \n \n"), "");
    }

    #[test]
    fn composes_decomposed_diacritics() {
        // 'a' + combining circumflex composes to 'â'
        let decomposed = "a\u{0302}mme";
        assert_eq!(clean_text(decomposed), "âmme");
    }

    #[test]
    fn idempotent() {
        let noisy = "--- Sayfa 3 ---\nza-\nyıf  – güçsüz\n\n\n12\nson  söz";
        let once = clean_text(noisy);
        assert_eq!(clean_text(&once), once);
    }
}
