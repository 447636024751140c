//! Correction run: repairs OCR-mangled terms in an existing bucket file by
//! matching its rows back against a freshly parsed text source.
//!
//! Legacy sheets often hold only the last word of a multi-word term (the
//! prefix words were lost to line wrapping), so rows are matched two ways:
//! by exact normalized term, then by the term being the last token of a
//! parsed entry's term. Candidates are ranked by whole-string sequence ratio
//! of the definitions.

use crate::config::{CONTAINMENT_BONUS, CORRECT_THRESHOLD, OVERFLOW_BUCKET, OVERFLOW_FILE_STEM};
use crate::dataset::Sheet;
use crate::models::Entry;
use crate::normalize;
use crate::parser::EntryParser;
use crate::similarity::sequence_ratio;
use crate::turkish;
use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

static TERM_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-zÇĞİIÖŞÜÂÎÛçğıiöşüâîû]+").unwrap());

#[derive(Debug, Clone)]
pub struct CorrectConfig {
    /// Raw OCR text covering the same letter as the dataset file
    pub text_path: PathBuf,
    /// Single-bucket dataset CSV to correct
    pub dataset_path: PathBuf,
    /// Corrected dataset CSV
    pub out_path: PathBuf,
    /// Corrections report CSV
    pub report_path: PathBuf,
}

/// One applied correction, reported for audit.
#[derive(Debug, Clone, Serialize)]
pub struct CorrectionRecord {
    pub row: u32,
    pub reason: &'static str,
    pub similarity: f64,
    pub old_term: String,
    pub new_term: String,
    pub old_def: String,
    pub new_def: String,
}

#[derive(Debug, Default)]
pub struct CorrectSummary {
    pub rows: usize,
    pub corrected: usize,
    pub parsed_entries: usize,
    pub skipped_rows: usize,
}

/// Bucket implied by the dataset file name (`A.csv` → A, `Diger.csv` → `#`).
fn bucket_of_file(path: &Path) -> Result<&'static str> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    if stem == OVERFLOW_FILE_STEM {
        return Ok(OVERFLOW_BUCKET);
    }
    let b = turkish::bucket(stem);
    if b == OVERFLOW_BUCKET {
        bail!("Cannot infer alphabet bucket from file name: {}", path.display());
    }
    Ok(b)
}

fn last_token_key(term: &str) -> Option<String> {
    TERM_WORD
        .find_iter(term)
        .last()
        .map(|m| turkish::normalized_key(m.as_str()))
}

fn containment(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let a = turkish::tr_lower(a);
    let b = turkish::tr_lower(b);
    a.contains(&b) || b.contains(&a)
}

/// Picks the best source entry for one dataset row, if any.
fn find_candidate<'a>(
    old_term: &str,
    old_def: &str,
    entries: &'a [Entry],
    last_map: &FxHashMap<String, Vec<usize>>,
) -> Option<(&'a Entry, &'static str)> {
    let key = turkish::normalized_key(old_term);

    let direct: Vec<&Entry> = entries
        .iter()
        .filter(|e| turkish::normalized_key(&e.term) == key)
        .collect();
    if !direct.is_empty() {
        let best = direct
            .into_iter()
            .max_by(|a, b| {
                sequence_ratio(old_def, &a.definition)
                    .total_cmp(&sequence_ratio(old_def, &b.definition))
            })?;
        return Some((best, "exact_term_match"));
    }

    let cands = last_map.get(&key)?;
    let best = cands
        .iter()
        .map(|&i| &entries[i])
        .max_by(|a, b| {
            let score = |e: &Entry| {
                let mut s = sequence_ratio(old_def, &e.definition);
                if containment(old_def, &e.definition) {
                    s += CONTAINMENT_BONUS;
                }
                s
            };
            score(a).total_cmp(&score(b))
        })?;
    Some((best, "last_token_match"))
}

/// Corrects the dataset file against the text source and writes both the
/// corrected file and the report.
pub fn run_correction(config: &CorrectConfig) -> Result<CorrectSummary> {
    let bucket = bucket_of_file(&config.dataset_path)?;

    let raw = fs::read_to_string(&config.text_path)
        .with_context(|| format!("Failed to read text source: {}", config.text_path.display()))?;
    if raw.trim().is_empty() {
        bail!("Text source is empty: {}", config.text_path.display());
    }
    let text = normalize::clean_text(&raw);

    let entries: Vec<Entry> = EntryParser::new(&text)
        .filter(|e| turkish::bucket(&e.term) == bucket)
        .collect();

    let mut last_map: FxHashMap<String, Vec<usize>> = FxHashMap::default();
    for (i, entry) in entries.iter().enumerate() {
        if let Some(last) = last_token_key(&entry.term) {
            last_map.entry(last).or_default().push(i);
        }
    }

    let mut sheet = Sheet::load(&config.dataset_path, bucket)?;
    let mut report = Vec::new();

    let row_ids: Vec<u32> = sheet.rows().map(|(id, _, _)| id).collect();
    for row_id in row_ids {
        let (old_term, old_def) = match sheet.get(row_id) {
            Some(row) => (row.term.clone(), row.definition.clone()),
            None => continue,
        };
        let key = turkish::normalized_key(&old_term);

        let Some((candidate, reason)) = find_candidate(&old_term, &old_def, &entries, &last_map)
        else {
            continue;
        };

        let sim = sequence_ratio(&old_def, &candidate.definition);
        let ok = sim >= CORRECT_THRESHOLD || containment(&old_def, &candidate.definition);
        if !ok {
            continue;
        }
        let term_changed = turkish::normalized_key(&candidate.term) != key;
        // An exact-term match can still upgrade a truncated definition;
        // anything else without a term change is not a correction.
        if !term_changed && candidate.definition.len() <= old_def.len() {
            continue;
        }

        if let Some(row) = sheet.get_mut(row_id) {
            row.term = candidate.term.clone();
            // Never shorten a definition the sheet already had.
            if candidate.definition.len() >= old_def.len() {
                row.definition = candidate.definition.clone();
            }
            row.pos = turkish::guess_pos(&row.definition).as_str().to_string();
            report.push(CorrectionRecord {
                row: row_id,
                reason,
                similarity: (sim * 1000.0).round() / 1000.0,
                old_term,
                new_term: row.term.clone(),
                old_def,
                new_def: row.definition.clone(),
            });
        }
    }

    sheet.save(&config.out_path)?;

    let mut writer = csv::Writer::from_path(&config.report_path).with_context(|| {
        format!("Failed to create report: {}", config.report_path.display())
    })?;
    for record in &report {
        writer.serialize(record)?;
    }
    writer.flush()?;

    let summary = CorrectSummary {
        rows: sheet.len(),
        corrected: report.len(),
        parsed_entries: entries.len(),
        skipped_rows: sheet.skipped_rows,
    };
    info!(
        rows = summary.rows,
        corrected = summary.corrected,
        "Correction complete"
    );
    Ok(summary)
}
