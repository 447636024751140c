//! Tabular dataset adapter: a dictionary dataset is a directory with one CSV
//! file per alphabet bucket (`A.csv` … `Z.csv`, overflow `Diger.csv`).
//!
//! Columns are resolved by header role, never by position: the legacy files
//! this replaces carry Turkish headers (`KELİME`, `ANLAM`) alongside English
//! ones (`WORD`, `DEFINITION`), so each role accepts its known synonyms. The
//! in-memory sheet exposes only the narrow interface the reconciliation
//! engine needs: iterate rows, append a row, set a row's flag.

use crate::config::{OVERFLOW_BUCKET, OVERFLOW_FILE_STEM};
use crate::models::Pos;
use crate::turkish;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use rustc_hash::FxHashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Canonical column order written on save.
pub const HEADERS: [&str; 6] = ["R", "KELİME", "ID", "POS", "DEFINITION", "EXAMPLE SENTENCE"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Flag,
    Term,
    Id,
    Pos,
    Definition,
    Example,
}

/// Maps a header cell to its column role, accepting known synonyms.
fn role_of(header: &str) -> Option<Column> {
    match turkish::tr_lower(header.trim()).as_str() {
        "r" => Some(Column::Flag),
        "kelime" | "kelıme" | "word" => Some(Column::Term),
        "id" => Some(Column::Id),
        "pos" => Some(Column::Pos),
        "definition" | "defınıtıon" | "anlam" => Some(Column::Definition),
        "example sentence" | "example" | "örnek" => Some(Column::Example),
        _ => None,
    }
}

/// One dataset row. `flag` is `None` until a reconciliation run touches it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub flag: Option<u8>,
    pub term: String,
    pub id: String,
    pub pos: String,
    pub definition: String,
    pub example: String,
}

/// An in-memory bucket sheet with stable row identifiers. Row ids mirror CSV
/// line numbers: the header is line 1, the first data row is 2.
#[derive(Debug, Default)]
pub struct Sheet {
    pub name: String,
    rows: Vec<Row>,
    /// Rows skipped on load for missing their term cell.
    pub skipped_rows: usize,
}

const FIRST_ROW_ID: u32 = 2;

impl Sheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn load(path: &Path, name: &str) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open dataset file: {}", path.display()))?;
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_reader(BufReader::new(file));

        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read headers from: {}", path.display()))?
            .clone();

        let mut columns: FxHashMap<Column, usize> = FxHashMap::default();
        for (i, h) in headers.iter().enumerate() {
            if let Some(role) = role_of(h) {
                columns.entry(role).or_insert(i);
            }
        }
        // Headerless legacy exports: first column is the term, second the
        // definition.
        if !columns.contains_key(&Column::Term) {
            warn!(file = %path.display(), "No term header found, assuming first two columns");
            columns.insert(Column::Term, 0);
            columns.entry(Column::Definition).or_insert(1);
        }

        let cell = |record: &csv::StringRecord, role: Column| -> String {
            columns
                .get(&role)
                .and_then(|&i| record.get(i))
                .unwrap_or("")
                .trim()
                .to_string()
        };

        let mut sheet = Sheet::new(name);
        for record in reader.records() {
            let record =
                record.with_context(|| format!("Malformed CSV row in: {}", path.display()))?;
            let term = cell(&record, Column::Term);
            if term.is_empty() {
                if record.iter().any(|c| !c.trim().is_empty()) {
                    sheet.skipped_rows += 1;
                    debug!(file = %path.display(), "Skipping row with no term cell");
                }
                continue;
            }
            let flag = cell(&record, Column::Flag).parse::<u8>().ok();
            sheet.rows.push(Row {
                flag,
                term,
                id: cell(&record, Column::Id),
                pos: cell(&record, Column::Pos),
                definition: cell(&record, Column::Definition),
                example: cell(&record, Column::Example),
            });
        }
        Ok(sheet)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create dataset file: {}", path.display()))?;
        let mut writer = WriterBuilder::new().from_writer(BufWriter::new(file));
        writer.write_record(HEADERS)?;
        for row in &self.rows {
            let flag = row.flag.map(|f| f.to_string()).unwrap_or_default();
            writer.write_record([
                flag.as_str(),
                row.term.as_str(),
                row.id.as_str(),
                row.pos.as_str(),
                row.definition.as_str(),
                row.example.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Iterates `(row_id, term, definition)` over all rows.
    pub fn rows(&self) -> impl Iterator<Item = (u32, &str, &str)> + '_ {
        self.rows.iter().enumerate().map(|(i, r)| {
            (
                FIRST_ROW_ID + i as u32,
                r.term.as_str(),
                r.definition.as_str(),
            )
        })
    }

    pub fn get(&self, row_id: u32) -> Option<&Row> {
        self.rows.get(row_id.checked_sub(FIRST_ROW_ID)? as usize)
    }

    pub fn get_mut(&mut self, row_id: u32) -> Option<&mut Row> {
        self.rows.get_mut(row_id.checked_sub(FIRST_ROW_ID)? as usize)
    }

    /// Appends a new row and returns its id.
    pub fn append(&mut self, term: &str, definition: &str, pos: Option<Pos>, flag: Option<u8>) -> u32 {
        self.rows.push(Row {
            flag,
            term: term.to_string(),
            id: String::new(),
            pos: pos.map(|p| p.as_str().to_string()).unwrap_or_default(),
            definition: definition.to_string(),
            example: String::new(),
        });
        FIRST_ROW_ID + (self.rows.len() - 1) as u32
    }

    pub fn set_flag(&mut self, row_id: u32, flag: u8) {
        match self.get_mut(row_id) {
            Some(row) => row.flag = Some(flag),
            None => debug!(sheet = %self.name, row_id, "set_flag on unknown row"),
        }
    }

    /// Stamps `flag` on every row whose flag was never set.
    pub fn fill_missing_flags(&mut self, flag: u8) -> usize {
        let mut filled = 0;
        for row in &mut self.rows {
            if row.flag.is_none() {
                row.flag = Some(flag);
                filled += 1;
            }
        }
        filled
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Stable sort by Turkish collation of the term.
    pub fn sort_turkish(&mut self) {
        self.rows.sort_by_cached_key(|r| turkish::sort_key(&r.term));
    }
}

/// File stem for a bucket name (`#` maps to `Diger`).
pub fn bucket_file_stem(bucket: &str) -> &str {
    if bucket == OVERFLOW_BUCKET {
        OVERFLOW_FILE_STEM
    } else {
        bucket
    }
}

fn bucket_path(dir: &Path, bucket: &str) -> PathBuf {
    dir.join(format!("{}.csv", bucket_file_stem(bucket)))
}

/// All bucket names in alphabet order, overflow last.
pub fn bucket_order() -> impl Iterator<Item = &'static str> {
    turkish::TR_ALPHABET
        .iter()
        .copied()
        .chain(std::iter::once(OVERFLOW_BUCKET))
}

/// A dictionary dataset: one sheet per alphabet bucket, loaded from and
/// saved to a directory of CSV files.
#[derive(Debug, Default)]
pub struct Dataset {
    sheets: FxHashMap<String, Sheet>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every bucket file present in `dir`. Missing bucket files are
    /// simply absent sheets.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            anyhow::bail!("Dataset directory not found: {}", dir.display());
        }
        let mut dataset = Dataset::new();
        for bucket in bucket_order() {
            let path = bucket_path(dir, bucket);
            if path.exists() {
                let sheet = Sheet::load(&path, bucket)?;
                dataset.sheets.insert(bucket.to_string(), sheet);
            }
        }
        Ok(dataset)
    }

    /// Loads a single bucket from `dir`; a missing file yields an empty sheet
    /// so a scoped run can still append into it.
    pub fn load_bucket(dir: &Path, bucket: &str) -> Result<Self> {
        if !dir.is_dir() {
            anyhow::bail!("Dataset directory not found: {}", dir.display());
        }
        let mut dataset = Dataset::new();
        let path = bucket_path(dir, bucket);
        let sheet = if path.exists() {
            Sheet::load(&path, bucket)?
        } else {
            Sheet::new(bucket)
        };
        dataset.sheets.insert(bucket.to_string(), sheet);
        Ok(dataset)
    }

    /// Writes every non-empty sheet to `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create dataset directory: {}", dir.display()))?;
        for bucket in bucket_order() {
            if let Some(sheet) = self.sheets.get(bucket) {
                if !sheet.is_empty() {
                    sheet.save(&bucket_path(dir, bucket))?;
                }
            }
        }
        Ok(())
    }

    pub fn sheet(&self, bucket: &str) -> Option<&Sheet> {
        self.sheets.get(bucket)
    }

    /// The sheet for a bucket, created empty if absent.
    pub fn sheet_mut(&mut self, bucket: &str) -> &mut Sheet {
        self.sheets
            .entry(bucket.to_string())
            .or_insert_with(|| Sheet::new(bucket))
    }

    /// Sheets in alphabet order.
    pub fn sheets(&self) -> impl Iterator<Item = &Sheet> {
        bucket_order().filter_map(|b| self.sheets.get(b))
    }

    pub fn sheets_mut(&mut self) -> impl Iterator<Item = &mut Sheet> {
        // Order does not matter for mutation passes.
        self.sheets.values_mut()
    }

    /// Total rows skipped on load across all sheets.
    pub fn skipped_rows(&self) -> usize {
        self.sheets.values().map(|s| s.skipped_rows).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(dir: &Path, name: &str, content: &str) {
        let mut f = File::create(dir.join(name)).unwrap();
        write!(f, "{}", content).unwrap();
    }

    #[test]
    fn load_resolves_turkish_headers() {
        let dir = TempDir::new().unwrap();
        write_csv(
            dir.path(),
            "A.csv",
            "KELİME,ANLAM,R\nadalet,hakka uygunluk,\n",
        );
        let sheet = Sheet::load(&dir.path().join("A.csv"), "A").unwrap();
        assert_eq!(sheet.len(), 1);
        let (row_id, term, def) = sheet.rows().next().unwrap();
        assert_eq!(row_id, 2);
        assert_eq!(term, "adalet");
        assert_eq!(def, "hakka uygunluk");
    }

    #[test]
    fn load_resolves_english_headers_in_any_order() {
        let dir = TempDir::new().unwrap();
        write_csv(
            dir.path(),
            "B.csv",
            "DEFINITION,WORD,R,POS\naklanma,beraat,1,NOUN\n",
        );
        let sheet = Sheet::load(&dir.path().join("B.csv"), "B").unwrap();
        let row = sheet.get(2).unwrap();
        assert_eq!(row.term, "beraat");
        assert_eq!(row.definition, "aklanma");
        assert_eq!(row.flag, Some(1));
        assert_eq!(row.pos, "NOUN");
    }

    #[test]
    fn load_skips_rows_without_term() {
        let dir = TempDir::new().unwrap();
        write_csv(
            dir.path(),
            "C.csv",
            "KELİME,DEFINITION\nceza,yaptırım\n,kayıp tanım\n",
        );
        let sheet = Sheet::load(&dir.path().join("C.csv"), "C").unwrap();
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.skipped_rows, 1);
    }

    #[test]
    fn headerless_file_falls_back_to_first_columns() {
        let dir = TempDir::new().unwrap();
        // First line is consumed as a header; its cells match no known role.
        write_csv(dir.path(), "D.csv", "dava,yargı önüne getirme\ndelil,kanıt\n");
        let sheet = Sheet::load(&dir.path().join("D.csv"), "D").unwrap();
        assert_eq!(sheet.len(), 1);
        let row = sheet.get(2).unwrap();
        assert_eq!(row.term, "delil");
        assert_eq!(row.definition, "kanıt");
    }

    #[test]
    fn append_and_set_flag() {
        let mut sheet = Sheet::new("A");
        let id = sheet.append("adalet", "hakka uygunluk", Some(Pos::Noun), None);
        assert_eq!(id, 2);
        assert_eq!(sheet.get(id).unwrap().flag, None);
        sheet.set_flag(id, 1);
        assert_eq!(sheet.get(id).unwrap().flag, Some(1));
        // unknown row id is a no-op
        sheet.set_flag(99, 1);
    }

    #[test]
    fn fill_missing_flags_leaves_touched_rows() {
        let mut sheet = Sheet::new("A");
        let a = sheet.append("a", "x", None, None);
        let b = sheet.append("b", "y", None, None);
        sheet.set_flag(a, 1);
        let filled = sheet.fill_missing_flags(0);
        assert_eq!(filled, 1);
        assert_eq!(sheet.get(a).unwrap().flag, Some(1));
        assert_eq!(sheet.get(b).unwrap().flag, Some(0));
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut dataset = Dataset::new();
        let sheet = dataset.sheet_mut("A");
        sheet.append("adalet", "hakka uygunluk", Some(Pos::Noun), Some(1));
        sheet.append("avukat", "savunman", None, None);
        dataset.save(dir.path()).unwrap();

        let reloaded = Dataset::load(dir.path()).unwrap();
        let sheet = reloaded.sheet("A").unwrap();
        assert_eq!(sheet.len(), 2);
        let row = sheet.get(2).unwrap();
        assert_eq!(row.term, "adalet");
        assert_eq!(row.pos, "NOUN");
        assert_eq!(row.flag, Some(1));
        assert_eq!(sheet.get(3).unwrap().flag, None);
    }

    #[test]
    fn overflow_bucket_uses_diger_stem() {
        let dir = TempDir::new().unwrap();
        let mut dataset = Dataset::new();
        dataset
            .sheet_mut(OVERFLOW_BUCKET)
            .append("123", "sayı", None, None);
        dataset.save(dir.path()).unwrap();
        assert!(dir.path().join("Diger.csv").exists());

        let reloaded = Dataset::load(dir.path()).unwrap();
        assert_eq!(reloaded.sheet(OVERFLOW_BUCKET).unwrap().len(), 1);
    }

    #[test]
    fn load_missing_directory_fails() {
        assert!(Dataset::load(Path::new("/nonexistent/sozluk")).is_err());
    }

    #[test]
    fn sort_turkish_orders_rows() {
        let mut sheet = Sheet::new("C");
        sheet.append("çare", "deva", None, None);
        sheet.append("ceza", "yaptırım", None, None);
        sheet.sort_turkish();
        let terms: Vec<_> = sheet.rows().map(|(_, t, _)| t.to_string()).collect();
        assert_eq!(terms, vec!["ceza", "çare"]);
    }
}
