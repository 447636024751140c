//! Sozluk: OCR dictionary extraction and reconciliation pipeline
//!
//! This crate turns the noisy text OCR produces from a scanned dictionary
//! into a structured term/definition dataset, and reconciles freshly
//! extracted entries against a pre-existing dictionary dataset:
//!
//! 1. **Extraction Pass** -- Normalize the raw text (page markers, soft
//!    hyphens, hyphenated line wraps, dash variants), parse it into
//!    (term, definition) entries with multi-line term prefix merging, and
//!    write one CSV per alphabet letter
//! 2. **Reconciliation Pass** -- Index the existing dataset by normalized
//!    key, route each new entry to its bucket, and classify it as a single
//!    match, an ambiguous match (advisory only), or a net-new row; flag the
//!    dataset and emit change/ambiguity reports
//! 3. **Correction Pass** (optional) -- Repair OCR-mangled terms in an
//!    existing bucket file by matching rows back against the text source
//!
//! # Architecture
//!
//! The pipeline is synchronous and strictly sequential: normalization
//! completes before parsing, and the existing-record index (with its
//! run-wide document-frequency table) is fully built before any new entry is
//! scored. Parsing-level noise is dropped and counted, never fatal;
//! unreadable inputs and invalid configuration abort before any mutation.
//!
//! # Key Modules
//!
//! - [`normalize`] -- OCR text cleanup, idempotent and total
//! - [`parser`] -- Three-state line parser producing a lazy entry sequence
//! - [`turkish`] -- Alphabet buckets, normalized keys, collation, POS
//! - [`similarity`] -- Overlap / Jaccard / TF-IDF cosine scoring, sequence ratio
//! - [`dataset`] -- Per-bucket CSV sheets behind a narrow row/flag interface
//! - [`reconcile`] -- The matching engine and its run driver
//! - [`extract`] -- Text file to dataset directory
//! - [`correct`] -- Dataset repair against a text source
//! - [`models`] -- Core data types (Entry, MatchOutcome, Pos)
//! - [`config`] -- Constants for parsing and reconciliation
//!
//! # Example Usage
//!
//! ```bash
//! # Extract OCR text into a per-letter dataset
//! sozluk extract -i cikti.txt -o yeni/
//!
//! # Reconcile it against the master dictionary
//! sozluk reconcile --old sozluk/ --new yeni/ --out guncel/ --strategy jaccard
//!
//! # Repair one letter's sheet against its text source
//! sozluk correct -t ciktiafull.txt -d sozluk/A.csv -o A_duzeltilmis.csv
//! ```

pub mod config;
pub mod correct;
pub mod dataset;
pub mod extract;
pub mod models;
pub mod normalize;
pub mod parser;
pub mod reconcile;
pub mod similarity;
pub mod turkish;
