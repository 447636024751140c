//! Reconciliation engine: maps each newly extracted entry onto zero, one, or
//! many existing dataset rows via normalized-key lookup, disambiguates with
//! the configured similarity strategy, and flags the dataset accordingly.
//!
//! The run is strictly sequential: every existing record is indexed (and
//! counted into the run-wide document-frequency table) before any new entry
//! is scored. Side effects are additive only: existing rows are flag-updated,
//! never edited or deleted; new rows are only appended.

use crate::config::{FLAG_ABSENT, FLAG_PRESENT, OVERFLOW_BUCKET};
use crate::dataset::Dataset;
use crate::models::{MatchOutcome, OutcomeRecord, ScoredCandidate};
use crate::similarity::{self, DocFrequency, Strategy};
use crate::turkish;
use anyhow::{bail, Context, Result};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

/// Run configuration, fully resolved before the core starts.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Directory of the existing dataset
    pub old_dir: PathBuf,
    /// Directory of the newly extracted dataset
    pub new_dir: PathBuf,
    /// Directory the updated dataset and reports are written to
    pub out_dir: PathBuf,
    pub strategy: Strategy,
    /// Similarity acceptance threshold in [0, 1]
    pub threshold: f64,
    /// Optional single-letter scope for the run
    pub bucket: Option<String>,
}

/// Per-bucket outcome counts. Every new entry lands in exactly one of
/// matched, added, or ambiguous, so the three sum to total.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BucketCounts {
    pub total: u64,
    pub matched: u64,
    pub added: u64,
    pub ambiguous: u64,
}

/// One line of the change/audit report.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeRecord {
    pub bucket: String,
    pub term: String,
    pub mode: &'static str,
    pub row: u32,
    pub score: f64,
    pub candidate_count: usize,
    pub new_definition: String,
    pub old_definition: String,
}

/// One candidate line of the ambiguous-match advisory report. Column names
/// follow the legacy report this replaces.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmbiguousRecord {
    pub sheet: String,
    pub word: String,
    pub old_row: u32,
    pub score: f64,
    pub chosen: u8,
    pub candidate_count: usize,
    pub new_definition: String,
    pub old_definition: String,
    pub method: &'static str,
}

/// Structured result of a reconciliation run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Counts per bucket, in alphabet order
    pub buckets: Vec<(String, BucketCounts)>,
    /// Existing rows skipped for a missing term cell
    pub skipped_rows: usize,
    /// New entries whose key normalized to nothing
    pub skipped_entries: usize,
    pub ambiguous_accepted: u64,
    pub ambiguous_rejected: u64,
    /// Rows stamped absent by the finalization pass
    pub absent_rows: u64,
    pub changes: Vec<ChangeRecord>,
    pub ambiguous: Vec<AmbiguousRecord>,
    pub outcomes: Vec<OutcomeRecord>,
}

impl RunSummary {
    pub fn totals(&self) -> BucketCounts {
        let mut t = BucketCounts::default();
        for (_, c) in &self.buckets {
            t.total += c.total;
            t.matched += c.matched;
            t.added += c.added;
            t.ambiguous += c.ambiguous;
        }
        t
    }
}

struct CandidateRecord {
    row_id: u32,
    tokens: rustc_hash::FxHashSet<String>,
}

type KeyIndex = FxHashMap<String, Vec<CandidateRecord>>;

/// The reconciliation state machine, operating on an in-memory dataset.
pub struct Reconciler {
    strategy: Strategy,
    threshold: f64,
    df: DocFrequency,
    indexes: FxHashMap<String, KeyIndex>,
}

impl Reconciler {
    /// Builds the per-bucket key indexes and the run-wide document-frequency
    /// table in one pre-pass over the existing dataset. Scoring never starts
    /// against a partially built index.
    pub fn new(strategy: Strategy, threshold: f64, existing: &Dataset) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            bail!("similarity threshold must be within [0, 1], got {}", threshold);
        }

        let mut df = DocFrequency::new();
        let mut indexes: FxHashMap<String, KeyIndex> = FxHashMap::default();

        for sheet in existing.sheets() {
            let index = indexes.entry(sheet.name.clone()).or_default();
            for (row_id, term, definition) in sheet.rows() {
                let key = turkish::normalized_key(term);
                if key.is_empty() {
                    continue;
                }
                let tokens = similarity::tokenize(definition);
                df.add_document(&tokens);
                index
                    .entry(key)
                    .or_default()
                    .push(CandidateRecord { row_id, tokens });
            }
        }

        info!(
            buckets = indexes.len(),
            documents = df.doc_count(),
            "Existing-record index built"
        );

        Ok(Self {
            strategy,
            threshold,
            df,
            indexes,
        })
    }

    /// Reconciles one new entry against its target bucket. Exactly one
    /// outcome per call; the dataset is only ever flag-updated or appended.
    pub fn reconcile(
        &mut self,
        dataset: &mut Dataset,
        target: &str,
        term: &str,
        definition: &str,
    ) -> MatchOutcome {
        let key = turkish::normalized_key(term);
        let strategy = self.strategy;
        let df = &self.df;
        let index = self.indexes.entry(target.to_string()).or_default();
        let sheet = dataset.sheet_mut(target);

        let append = |sheet: &mut crate::dataset::Sheet| {
            let pos = turkish::guess_pos(definition);
            sheet.append(term, definition, Some(pos), Some(FLAG_PRESENT))
        };

        match index.get_mut(&key) {
            None => {
                let row_id = append(sheet);
                index.insert(
                    key,
                    vec![CandidateRecord {
                        row_id,
                        tokens: similarity::tokenize(definition),
                    }],
                );
                MatchOutcome::NoMatch {
                    appended_row: row_id,
                }
            }
            Some(cands) if cands.len() == 1 => {
                // Key equality is trusted when there is only one candidate.
                let row_id = cands[0].row_id;
                sheet.set_flag(row_id, FLAG_PRESENT);
                MatchOutcome::Single { row_id }
            }
            Some(cands) => {
                let new_tokens = similarity::tokenize(definition);
                let mut scored = Vec::with_capacity(cands.len());
                let mut best_idx = None;
                let mut best_score = 0.0;

                if !new_tokens.is_empty() {
                    for (i, cand) in cands.iter().enumerate() {
                        let score = similarity::score(strategy, &new_tokens, &cand.tokens, df);
                        // Strictly greater, so the first of tied candidates wins.
                        if score > best_score {
                            best_score = score;
                            best_idx = Some(i);
                        }
                        scored.push((cand.row_id, score));
                    }
                }

                if let Some(best) = best_idx {
                    if best_score >= self.threshold {
                        let best_row = cands[best].row_id;
                        let candidates = scored
                            .into_iter()
                            .map(|(row_id, score)| ScoredCandidate {
                                row_id,
                                score,
                                chosen: row_id == best_row,
                            })
                            .collect();
                        // Advisory only: no flag is set, no row appended.
                        return MatchOutcome::AmbiguousAccepted {
                            best_row,
                            candidates,
                        };
                    }
                }

                let row_id = append(sheet);
                cands.push(CandidateRecord {
                    row_id,
                    tokens: new_tokens,
                });
                MatchOutcome::AmbiguousRejected {
                    candidates: scored
                        .into_iter()
                        .map(|(row_id, score)| ScoredCandidate {
                            row_id,
                            score,
                            chosen: false,
                        })
                        .collect(),
                    appended_row: row_id,
                }
            }
        }
    }
}

/// Circumflexed first letters route to their plain-letter bucket; everything
/// else stays in the bucket its source sheet put it in.
pub fn route_bucket(term: &str, source: &str) -> String {
    match term.trim().chars().next() {
        Some('Â') | Some('â') => "A".to_string(),
        Some('Î') | Some('î') => "İ".to_string(),
        Some('Û') | Some('û') => "U".to_string(),
        _ => source.to_string(),
    }
}

fn definition_of(dataset: &Dataset, bucket: &str, row_id: u32) -> String {
    dataset
        .sheet(bucket)
        .and_then(|s| s.get(row_id))
        .map(|r| r.definition.clone())
        .unwrap_or_default()
}

fn round3(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

/// Runs a full reconciliation: load both datasets, reconcile every new entry,
/// finalize flags, and write the updated dataset plus reports to `out_dir`.
pub fn run_reconciliation(config: &ReconcileConfig) -> Result<RunSummary> {
    let restrict = match &config.bucket {
        Some(letter) => {
            let b = turkish::bucket(letter);
            if b == OVERFLOW_BUCKET {
                bail!("'{}' is not a letter of the Turkish alphabet", letter);
            }
            Some(b)
        }
        None => None,
    };

    let mut old = match restrict {
        Some(b) => Dataset::load_bucket(&config.old_dir, b)?,
        None => Dataset::load(&config.old_dir)?,
    };
    let new = Dataset::load(&config.new_dir)?;

    // Collect new entries up front so the whole corpus is known before any
    // scoring; the entry order is the buckets' alphabet order.
    let new_entries: Vec<(String, String, String)> = new
        .sheets()
        .flat_map(|sheet| {
            sheet
                .rows()
                .map(|(_, term, def)| (sheet.name.clone(), term.to_string(), def.to_string()))
        })
        .collect();

    info!(
        strategy = config.strategy.as_str(),
        threshold = config.threshold,
        entries = new_entries.len(),
        "Starting reconciliation"
    );

    let mut reconciler = Reconciler::new(config.strategy, config.threshold, &old)?;

    let mut counts: FxHashMap<String, BucketCounts> = FxHashMap::default();
    let mut summary = RunSummary {
        skipped_rows: old.skipped_rows() + new.skipped_rows(),
        ..RunSummary::default()
    };

    for (source, term, definition) in &new_entries {
        let key = turkish::normalized_key(term);
        if key.is_empty() {
            summary.skipped_entries += 1;
            continue;
        }
        let target = route_bucket(term, source);
        if let Some(b) = restrict {
            if target != b {
                debug!(term = %term, bucket = %target, "Out of scope for this run");
                continue;
            }
        }

        let entry_counts = counts.entry(target.clone()).or_default();
        entry_counts.total += 1;

        let outcome = reconciler.reconcile(&mut old, &target, term, definition);
        match &outcome {
            MatchOutcome::Single { row_id } => {
                entry_counts.matched += 1;
                summary.changes.push(ChangeRecord {
                    bucket: target.clone(),
                    term: term.clone(),
                    mode: "single",
                    row: *row_id,
                    score: 1.0,
                    candidate_count: 1,
                    new_definition: definition.clone(),
                    old_definition: definition_of(&old, &target, *row_id),
                });
            }
            MatchOutcome::NoMatch { appended_row } => {
                entry_counts.added += 1;
                summary.changes.push(ChangeRecord {
                    bucket: target.clone(),
                    term: term.clone(),
                    mode: "added",
                    row: *appended_row,
                    score: 0.0,
                    candidate_count: 0,
                    new_definition: definition.clone(),
                    old_definition: String::new(),
                });
            }
            MatchOutcome::AmbiguousAccepted {
                best_row: _,
                candidates,
            } => {
                entry_counts.ambiguous += 1;
                summary.ambiguous_accepted += 1;
                for cand in candidates {
                    summary.ambiguous.push(AmbiguousRecord {
                        sheet: target.clone(),
                        word: term.clone(),
                        old_row: cand.row_id,
                        score: round3(cand.score),
                        chosen: u8::from(cand.chosen),
                        candidate_count: candidates.len(),
                        new_definition: definition.clone(),
                        old_definition: definition_of(&old, &target, cand.row_id),
                        method: config.strategy.as_str(),
                    });
                }
            }
            MatchOutcome::AmbiguousRejected {
                candidates,
                appended_row,
            } => {
                entry_counts.added += 1;
                summary.ambiguous_rejected += 1;
                summary.changes.push(ChangeRecord {
                    bucket: target.clone(),
                    term: term.clone(),
                    mode: "ambiguous_rejected",
                    row: *appended_row,
                    score: round3(
                        candidates
                            .iter()
                            .map(|c| c.score)
                            .fold(0.0, f64::max),
                    ),
                    candidate_count: candidates.len(),
                    new_definition: definition.clone(),
                    old_definition: String::new(),
                });
            }
        }
        summary.outcomes.push(OutcomeRecord {
            bucket: target,
            term: term.clone(),
            outcome,
        });
    }

    // Finalization: any row never touched during the run is explicitly absent.
    for sheet in old.sheets_mut() {
        summary.absent_rows += sheet.fill_missing_flags(FLAG_ABSENT) as u64;
    }

    old.save(&config.out_dir)?;
    write_report(&config.out_dir.join("changes.csv"), &summary.changes)?;
    if !summary.ambiguous.is_empty() {
        write_report(&config.out_dir.join("ambiguous.csv"), &summary.ambiguous)?;
    }

    let mut buckets: Vec<(String, BucketCounts)> = counts.into_iter().collect();
    buckets.sort_by_key(|(b, _)| turkish::sort_key(b));
    summary.buckets = buckets;

    let totals = summary.totals();
    info!(
        total = totals.total,
        matched = totals.matched,
        added = totals.added,
        ambiguous = totals.ambiguous,
        absent = summary.absent_rows,
        "Reconciliation complete"
    );

    Ok(summary)
}

fn write_report<T: Serialize>(path: &std::path::Path, records: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create report: {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset_with(bucket: &str, rows: &[(&str, &str)]) -> Dataset {
        let mut dataset = Dataset::new();
        let sheet = dataset.sheet_mut(bucket);
        for (term, def) in rows {
            sheet.append(term, def, None, None);
        }
        dataset
    }

    #[test]
    fn rejects_threshold_out_of_range() {
        let ds = Dataset::new();
        assert!(Reconciler::new(Strategy::Jaccard, 1.5, &ds).is_err());
        assert!(Reconciler::new(Strategy::Jaccard, -0.1, &ds).is_err());
        assert!(Reconciler::new(Strategy::Jaccard, 0.0, &ds).is_ok());
        assert!(Reconciler::new(Strategy::Jaccard, 1.0, &ds).is_ok());
    }

    #[test]
    fn single_candidate_flags_row_without_similarity_check() {
        let mut ds = dataset_with("Ö", &[("örnek", "bir şey")]);
        let mut rec = Reconciler::new(Strategy::Jaccard, 0.5, &ds).unwrap();

        // Definition is completely different; key equality alone decides.
        let outcome = rec.reconcile(&mut ds, "Ö", "örnek", "deneme");
        assert_eq!(outcome, MatchOutcome::Single { row_id: 2 });

        let sheet = ds.sheet("Ö").unwrap();
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.get(2).unwrap().flag, Some(FLAG_PRESENT));
    }

    #[test]
    fn no_candidate_appends_new_row() {
        let mut ds = dataset_with("Y", &[]);
        let mut rec = Reconciler::new(Strategy::Jaccard, 0.5, &ds).unwrap();

        let outcome = rec.reconcile(&mut ds, "Y", "yeni", "daha önce olmayan");
        assert_eq!(outcome, MatchOutcome::NoMatch { appended_row: 2 });

        let sheet = ds.sheet("Y").unwrap();
        assert_eq!(sheet.len(), 1);
        let row = sheet.get(2).unwrap();
        assert_eq!(row.term, "yeni");
        assert_eq!(row.flag, Some(FLAG_PRESENT));
        assert_eq!(row.pos, "NOUN");
    }

    #[test]
    fn ambiguous_above_threshold_is_advisory_only() {
        let mut ds = dataset_with(
            "H",
            &[("hüküm", "hukuki işlem"), ("hüküm", "hukuki karar")],
        );
        let mut rec = Reconciler::new(Strategy::Jaccard, 0.5, &ds).unwrap();

        let outcome = rec.reconcile(&mut ds, "H", "hüküm", "hukuki işlem türü");
        match outcome {
            MatchOutcome::AmbiguousAccepted {
                best_row,
                candidates,
            } => {
                assert_eq!(best_row, 2);
                assert_eq!(candidates.len(), 2);
                assert!(candidates[0].chosen);
                assert!(!candidates[1].chosen);
                // Jaccard({hukuki, işlem, türü}, {hukuki, işlem}) = 2/3
                assert!((candidates[0].score - 2.0 / 3.0).abs() < 1e-9);
                // Jaccard against {hukuki, karar} = 1/4
                assert!((candidates[1].score - 0.25).abs() < 1e-9);
            }
            other => panic!("expected AmbiguousAccepted, got {:?}", other),
        }

        // No dataset mutation at all.
        let sheet = ds.sheet("H").unwrap();
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.get(2).unwrap().flag, None);
        assert_eq!(sheet.get(3).unwrap().flag, None);
    }

    #[test]
    fn ambiguous_below_threshold_appends_new_row() {
        let mut ds = dataset_with(
            "H",
            &[("hüküm", "hukuki işlem"), ("hüküm", "hukuki karar")],
        );
        let mut rec = Reconciler::new(Strategy::Jaccard, 0.5, &ds).unwrap();

        let outcome = rec.reconcile(&mut ds, "H", "hüküm", "tamamen ilgisiz metin");
        match outcome {
            MatchOutcome::AmbiguousRejected {
                candidates,
                appended_row,
            } => {
                assert_eq!(appended_row, 4);
                assert_eq!(candidates.len(), 2);
                assert!(candidates.iter().all(|c| c.score == 0.0 && !c.chosen));
            }
            other => panic!("expected AmbiguousRejected, got {:?}", other),
        }
        assert_eq!(ds.sheet("H").unwrap().len(), 3);
    }

    #[test]
    fn empty_new_definition_with_many_candidates_is_rejected() {
        let mut ds = dataset_with("H", &[("hüküm", "karar"), ("hüküm", "yargı")]);
        let mut rec = Reconciler::new(Strategy::Jaccard, 0.0, &ds).unwrap();

        // Tokenizes to nothing; even threshold 0 cannot accept it.
        let outcome = rec.reconcile(&mut ds, "H", "hüküm", "—");
        assert!(matches!(outcome, MatchOutcome::AmbiguousRejected { .. }));
    }

    #[test]
    fn appended_rows_join_the_index_within_a_run() {
        let mut ds = dataset_with("Y", &[]);
        let mut rec = Reconciler::new(Strategy::Jaccard, 0.5, &ds).unwrap();

        let first = rec.reconcile(&mut ds, "Y", "yeni", "taze");
        assert!(matches!(first, MatchOutcome::NoMatch { .. }));
        // The same key again now finds the appended row as its sole candidate.
        let second = rec.reconcile(&mut ds, "Y", "Yeni", "taze");
        assert_eq!(second, MatchOutcome::Single { row_id: 2 });
    }

    #[test]
    fn key_lookup_folds_case_and_circumflex() {
        let mut ds = dataset_with("A", &[("adem", "yokluk")]);
        let mut rec = Reconciler::new(Strategy::Jaccard, 0.5, &ds).unwrap();

        let outcome = rec.reconcile(&mut ds, "A", "ÂDEM", "yokluk hali");
        assert_eq!(outcome, MatchOutcome::Single { row_id: 2 });
    }

    #[test]
    fn first_of_tied_candidates_wins() {
        let mut ds = dataset_with("B", &[("borç", "para yükümü"), ("borç", "para yükümü")]);
        let mut rec = Reconciler::new(Strategy::Jaccard, 0.5, &ds).unwrap();

        let outcome = rec.reconcile(&mut ds, "B", "borç", "para yükümü");
        match outcome {
            MatchOutcome::AmbiguousAccepted { best_row, .. } => assert_eq!(best_row, 2),
            other => panic!("expected AmbiguousAccepted, got {:?}", other),
        }
    }

    #[test]
    fn route_bucket_circumflex_reroutes() {
        assert_eq!(route_bucket("âmme", "Â"), "A");
        assert_eq!(route_bucket("Îfa", "X"), "İ");
        assert_eq!(route_bucket("ûdeme", "U"), "U");
        assert_eq!(route_bucket("adalet", "A"), "A");
        assert_eq!(route_bucket("", "B"), "B");
    }

    #[test]
    fn tfidf_strategy_uses_run_wide_frequencies() {
        let mut ds = dataset_with(
            "C",
            &[
                ("ceza", "hukuk yaptırım"),
                ("ceza", "hukuk müeyyide"),
                ("cebir", "hukuk zor"),
            ],
        );
        let mut rec = Reconciler::new(Strategy::Tfidf, 0.3, &ds).unwrap();

        // "yaptırım" is rarer than "hukuk", so the first candidate wins.
        let outcome = rec.reconcile(&mut ds, "C", "ceza", "yaptırım uygulaması");
        match outcome {
            MatchOutcome::AmbiguousAccepted { best_row, .. } => assert_eq!(best_row, 2),
            other => panic!("expected AmbiguousAccepted, got {:?}", other),
        }
    }

    #[test]
    fn conservation_over_a_mixed_run() {
        // K = 3 existing rows, M = 4 new entries
        let mut ds = dataset_with(
            "D",
            &[
                ("dava", "yargı istemi"),
                ("delil", "kanıt"),
                ("delil", "ispat aracı"),
            ],
        );
        let existing = ds.sheet("D").unwrap().len();
        let mut rec = Reconciler::new(Strategy::Jaccard, 0.5, &ds).unwrap();

        let entries = [
            ("dava", "yargı istemi"),          // single
            ("delil", "kanıt gösterme"),       // ambiguous, accepted
            ("delil", "alakasız bir tanım"),   // ambiguous, rejected -> appended
            ("dernek", "kişi topluluğu"),      // no match -> appended
        ];
        let mut matched = 0;
        let mut added = 0;
        let mut ambiguous = 0;
        for (term, def) in entries {
            match rec.reconcile(&mut ds, "D", term, def) {
                MatchOutcome::Single { .. } => matched += 1,
                MatchOutcome::AmbiguousAccepted { .. } => ambiguous += 1,
                MatchOutcome::AmbiguousRejected { .. } | MatchOutcome::NoMatch { .. } => added += 1,
            }
        }
        assert_eq!(matched + added + ambiguous, entries.len());

        let sheet = ds.sheet_mut("D");
        assert_eq!(sheet.len(), existing + added);

        let flagged = sheet.rows().count() - sheet.fill_missing_flags(FLAG_ABSENT);
        // matched rows plus appended rows carry flags; the rest were stamped absent
        assert_eq!(flagged, matched + added);
    }
}
