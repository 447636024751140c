//! Turkish alphabet helpers: case mapping, bucket classification, normalized
//! lookup keys, collation keys, and the part-of-speech heuristic.

use crate::config::OVERFLOW_BUCKET;
use crate::models::Pos;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;

/// The 29-letter Turkish alphabet (no Q, W, X), in collation order.
pub const TR_ALPHABET: [&str; 29] = [
    "A", "B", "C", "Ç", "D", "E", "F", "G", "Ğ", "H", "I", "İ", "J", "K", "L",
    "M", "N", "O", "Ö", "P", "R", "S", "Ş", "T", "U", "Ü", "V", "Y", "Z",
];

static ALPHA_INDEX: Lazy<FxHashMap<char, usize>> = Lazy::new(|| {
    TR_ALPHABET
        .iter()
        .enumerate()
        .filter_map(|(i, l)| l.chars().next().map(|c| (c, i)))
        .collect()
});

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zçğıiöşüâîû]+").unwrap());

fn is_tr_letter(c: char) -> bool {
    c.is_ascii_alphabetic()
        || matches!(
            c,
            'Ç' | 'Ğ' | 'İ' | 'Ö' | 'Ş' | 'Ü' | 'Â' | 'Î' | 'Û'
                | 'ç' | 'ğ' | 'ı' | 'ö' | 'ş' | 'ü' | 'â' | 'î' | 'û'
        )
}

fn upper_char(c: char) -> char {
    match c {
        'i' => 'İ',
        'ı' => 'I',
        'ş' => 'Ş',
        'ğ' => 'Ğ',
        'ç' => 'Ç',
        'ö' => 'Ö',
        'ü' => 'Ü',
        'â' => 'Â',
        'î' => 'Î',
        'û' => 'Û',
        _ => c.to_ascii_uppercase(),
    }
}

fn lower_char(c: char) -> char {
    match c {
        'I' => 'ı',
        'İ' => 'i',
        _ => c.to_lowercase().next().unwrap_or(c),
    }
}

/// Turkish-aware uppercasing (dotted/dotless i and circumflexed vowels included).
pub fn tr_upper(s: &str) -> String {
    s.chars().map(upper_char).collect()
}

/// Turkish-aware lowercasing (I maps to dotless ı, İ to dotted i).
pub fn tr_lower(s: &str) -> String {
    s.chars().map(lower_char).collect()
}

/// Case- and diacritic-canonical lookup key for a term.
///
/// Circumflexed vowels fold to their plain letters, dotted/dotless i pairs are
/// resolved the Turkish way, whitespace runs collapse, and the result is
/// lowercased. Two surface forms of the same word yield the same key.
pub fn normalized_key(term: &str) -> String {
    let folded: String = term
        .trim()
        .chars()
        .map(|c| match c {
            'Â' => 'A',
            'â' => 'a',
            'Î' => 'İ',
            'î' => 'i',
            'Û' => 'U',
            'û' => 'u',
            'I' => 'ı',
            'İ' => 'i',
            _ => c,
        })
        .map(lower_char)
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Alphabet bucket for a term, determined by its first letter after stripping
/// leading non-letter junk. Circumflexed vowels route to their plain-letter
/// bucket (Â→A, Î→İ, Û→U). Total: anything unclassifiable lands in `#`.
pub fn bucket(term: &str) -> &'static str {
    let t = term.trim().trim_start_matches(|c: char| !is_tr_letter(c));
    let first = match t.chars().next() {
        Some(c) => c,
        None => return OVERFLOW_BUCKET,
    };
    let routed = match first {
        'Â' | 'â' => 'A',
        'Î' | 'î' => 'İ',
        'Û' | 'û' => 'U',
        c => upper_char(c),
    };
    match ALPHA_INDEX.get(&routed) {
        Some(&i) => TR_ALPHABET[i],
        None => OVERFLOW_BUCKET,
    }
}

/// Collation key respecting Turkish alphabet order; characters outside the
/// alphabet sort after every letter by code point.
pub fn sort_key(word: &str) -> Vec<u32> {
    tr_upper(word)
        .chars()
        .map(|c| match ALPHA_INDEX.get(&c) {
            Some(&i) => i as u32,
            None => 100 + c as u32,
        })
        .collect()
}

/// Guesses the part of speech from a definition: Turkish infinitives end in
/// -mak/-mek, so a definition whose last word does is a verb.
pub fn guess_pos(definition: &str) -> Pos {
    let lowered = tr_lower(definition.trim());
    if let Some(last) = WORD_RE.find_iter(&lowered).last() {
        let w = last.as_str();
        if w.ends_with("mak") || w.ends_with("mek") {
            return Pos::Verb;
        }
    }
    Pos::Noun
}
