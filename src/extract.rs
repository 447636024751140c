//! Extraction run: raw OCR text file in, per-letter CSV dataset out.

use crate::config::{OVERFLOW_BUCKET, PROGRESS_INTERVAL};
use crate::dataset::Dataset;
use crate::normalize;
use crate::parser::EntryParser;
use crate::turkish;
use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Path to the raw OCR text file
    pub input: PathBuf,
    /// Output directory for the extracted dataset
    pub out_dir: PathBuf,
    /// Optional single-letter restriction
    pub bucket: Option<String>,
}

#[derive(Debug, Default)]
pub struct ExtractSummary {
    pub entries: u64,
    /// Entries left out by the single-letter restriction
    pub filtered_out: u64,
    pub skipped_lines: usize,
    /// Entry counts per bucket, in alphabet order
    pub buckets: Vec<(String, u64)>,
}

/// Reads, normalizes, and parses the input document, buckets each entry by
/// its first letter, sorts every bucket in Turkish order, and writes the
/// dataset directory.
pub fn run_extraction(config: &ExtractConfig) -> Result<ExtractSummary> {
    let raw = fs::read_to_string(&config.input)
        .with_context(|| format!("Failed to read input document: {}", config.input.display()))?;
    if raw.trim().is_empty() {
        bail!("Input document is empty: {}", config.input.display());
    }

    let restrict = match &config.bucket {
        Some(letter) => {
            let b = turkish::bucket(letter);
            if b == OVERFLOW_BUCKET {
                bail!("'{}' is not a letter of the Turkish alphabet", letter);
            }
            info!(letter = %letter, bucket = b, "Restricting extraction to one bucket");
            Some(b)
        }
        None => None,
    };

    let text = normalize::clean_text(&raw);

    let mut dataset = Dataset::new();
    let mut summary = ExtractSummary::default();
    let pb = ProgressBar::new_spinner();

    let mut parser = EntryParser::new(&text);
    for entry in parser.by_ref() {
        let bucket = turkish::bucket(&entry.term);
        if let Some(b) = restrict {
            if bucket != b {
                summary.filtered_out += 1;
                continue;
            }
        }
        let pos = turkish::guess_pos(&entry.definition);
        dataset
            .sheet_mut(bucket)
            .append(&entry.term, &entry.definition, Some(pos), None);
        summary.entries += 1;
        if summary.entries % PROGRESS_INTERVAL == 0 {
            pb.tick();
        }
    }
    summary.skipped_lines = parser.skipped_lines();
    pb.finish_and_clear();

    for sheet in dataset.sheets_mut() {
        sheet.sort_turkish();
    }
    dataset.save(&config.out_dir)?;

    summary.buckets = dataset
        .sheets()
        .filter(|s| !s.is_empty())
        .map(|s| (s.name.clone(), s.len() as u64))
        .collect();

    info!(
        entries = summary.entries,
        skipped = summary.skipped_lines,
        buckets = summary.buckets.len(),
        "Extraction complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_input(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("cikti.txt");
        let mut f = fs::File::create(&path).unwrap();
        write!(f, "{}", content).unwrap();
        path
    }

    #[test]
    fn extracts_and_buckets_entries() {
        let dir = TempDir::new().unwrap();
        let input = write_input(
            &dir,
            "--- Sayfa 1 ---\nadalet — hakka uygunluk\nceza — yaptırım\nâmme — kamu\n",
        );
        let out = dir.path().join("out");
        let summary = run_extraction(&ExtractConfig {
            input,
            out_dir: out.clone(),
            bucket: None,
        })
        .unwrap();

        assert_eq!(summary.entries, 3);
        let dataset = Dataset::load(&out).unwrap();
        // âmme routes into the A bucket alongside adalet
        assert_eq!(dataset.sheet("A").unwrap().len(), 2);
        assert_eq!(dataset.sheet("C").unwrap().len(), 1);
    }

    #[test]
    fn bucket_restriction_filters_entries() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "adalet — hakka uygunluk\nceza — yaptırım\n");
        let out = dir.path().join("out");
        let summary = run_extraction(&ExtractConfig {
            input,
            out_dir: out.clone(),
            bucket: Some("a".to_string()),
        })
        .unwrap();

        assert_eq!(summary.entries, 1);
        assert_eq!(summary.filtered_out, 1);
        let dataset = Dataset::load(&out).unwrap();
        assert!(dataset.sheet("C").is_none());
    }

    #[test]
    fn invalid_restriction_letter_is_fatal() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "adalet — hakka uygunluk\n");
        let result = run_extraction(&ExtractConfig {
            input,
            out_dir: dir.path().join("out"),
            bucket: Some("q".to_string()),
        });
        assert!(result.is_err());
    }

    #[test]
    fn empty_document_is_fatal() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "  \n ");
        let result = run_extraction(&ExtractConfig {
            input,
            out_dir: dir.path().join("out"),
            bucket: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn missing_document_is_fatal() {
        let dir = TempDir::new().unwrap();
        let result = run_extraction(&ExtractConfig {
            input: dir.path().join("yok.txt"),
            out_dir: dir.path().join("out"),
            bucket: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn buckets_are_sorted_in_turkish_order() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "cümle — söz dizisi\nceza — yaptırım\ncebir — zor kullanma\n");
        let out = dir.path().join("out");
        run_extraction(&ExtractConfig {
            input,
            out_dir: out.clone(),
            bucket: None,
        })
        .unwrap();

        let dataset = Dataset::load(&out).unwrap();
        let terms: Vec<String> = dataset
            .sheet("C")
            .unwrap()
            .rows()
            .map(|(_, t, _)| t.to_string())
            .collect();
        assert_eq!(terms, vec!["cebir", "ceza", "cümle"]);
    }
}
