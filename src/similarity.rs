//! Interchangeable definition-similarity scoring: token overlap, Jaccard,
//! and TF-IDF cosine over run-wide document frequencies, plus a plain-string
//! sequence ratio used by the correction pass.

use crate::turkish;
use clap::ValueEnum;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zçğıiöşüâîû0-9]+").unwrap());

/// Scoring strategy selected by run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// |A∩B| / |A| where A is the new definition; intentionally asymmetric
    Overlap,
    /// |A∩B| / |A∪B|
    Jaccard,
    /// Cosine over binary-tf, run-wide-idf weighted vectors
    Tfidf,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Overlap => "overlap",
            Strategy::Jaccard => "jaccard",
            Strategy::Tfidf => "tfidf",
        }
    }
}

/// Splits a definition into its set of lowercased letter/digit runs.
pub fn tokenize(text: &str) -> FxHashSet<String> {
    let lowered = turkish::tr_lower(text);
    TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Run-wide document frequencies, accumulated once over every existing
/// record before any scoring happens. Immutable during scoring.
#[derive(Debug, Default)]
pub struct DocFrequency {
    df: FxHashMap<String, u32>,
    doc_count: u32,
}

impl DocFrequency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one document's token set. Empty token sets are not documents.
    pub fn add_document(&mut self, tokens: &FxHashSet<String>) {
        if tokens.is_empty() {
            return;
        }
        self.doc_count += 1;
        for t in tokens {
            *self.df.entry(t.clone()).or_insert(0) += 1;
        }
    }

    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    /// idf = ln((N+1)/(df+1)) + 1
    pub fn idf(&self, token: &str) -> f64 {
        let df = self.df.get(token).copied().unwrap_or(0);
        ((self.doc_count as f64 + 1.0) / (df as f64 + 1.0)).ln() + 1.0
    }
}

/// |A∩B| / |A|; 0 when the new definition has no tokens.
pub fn overlap(new_tokens: &FxHashSet<String>, old_tokens: &FxHashSet<String>) -> f64 {
    if new_tokens.is_empty() {
        return 0.0;
    }
    let inter = new_tokens.intersection(old_tokens).count();
    inter as f64 / new_tokens.len() as f64
}

/// |A∩B| / |A∪B|; 0 when the union is empty.
pub fn jaccard(a: &FxHashSet<String>, b: &FxHashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    inter as f64 / union as f64
}

/// Cosine similarity of the two token sets under binary tf and run-wide idf,
/// restricted to the union vocabulary. 0 when either side is empty or no
/// documents were counted.
pub fn tfidf_cosine(a: &FxHashSet<String>, b: &FxHashSet<String>, df: &DocFrequency) -> f64 {
    if a.is_empty() || b.is_empty() || df.doc_count() == 0 {
        return 0.0;
    }

    let mut num = 0.0;
    let mut sum_a = 0.0;
    let mut sum_b = 0.0;

    for t in a.union(b) {
        let idf = df.idf(t);
        let wa = if a.contains(t) { idf } else { 0.0 };
        let wb = if b.contains(t) { idf } else { 0.0 };
        num += wa * wb;
        sum_a += wa * wa;
        sum_b += wb * wb;
    }

    let denom = sum_a.sqrt() * sum_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    num / denom
}

/// Scores a new definition's token set against an existing one under the
/// configured strategy.
pub fn score(
    strategy: Strategy,
    new_tokens: &FxHashSet<String>,
    old_tokens: &FxHashSet<String>,
    df: &DocFrequency,
) -> f64 {
    match strategy {
        Strategy::Overlap => overlap(new_tokens, old_tokens),
        Strategy::Jaccard => jaccard(new_tokens, old_tokens),
        Strategy::Tfidf => tfidf_cosine(new_tokens, old_tokens, df),
    }
}

/// Whole-string similarity in [0,1]: the fraction of matching characters
/// under a longest-matching-blocks alignment (Ratcliff/Obershelp). 1.0 when
/// both strings are empty, 0.0 when exactly one is.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a = turkish::tr_lower(a.trim());
    let b = turkish::tr_lower(b.trim());
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let av: Vec<char> = a.chars().collect();
    let bv: Vec<char> = b.chars().collect();
    let matched = matching_total(&av, &bv);
    2.0 * matched as f64 / (av.len() + bv.len()) as f64
}

/// Earliest longest common block between the two slices: (start_a, start_b, len).
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0usize, 0usize, 0usize);
    let mut run_lens: FxHashMap<usize, usize> = FxHashMap::default();

    for (i, &ca) in a.iter().enumerate() {
        let mut next_runs: FxHashMap<usize, usize> = FxHashMap::default();
        for (j, &cb) in b.iter().enumerate() {
            if ca == cb {
                let k = if j > 0 {
                    run_lens.get(&(j - 1)).copied().unwrap_or(0) + 1
                } else {
                    1
                };
                next_runs.insert(j, k);
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            }
        }
        run_lens = next_runs;
    }
    best
}

fn matching_total(a: &[char], b: &[char]) -> usize {
    let (i, j, k) = longest_match(a, b);
    if k == 0 {
        return 0;
    }
    k + matching_total(&a[..i], &b[..j]) + matching_total(&a[i + k..], &b[j + k..])
}
