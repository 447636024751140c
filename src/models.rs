use serde::Serialize;

/// A parsed dictionary entry: one term and its definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub term: String,
    pub definition: String,
}

/// Part of speech stamped on appended or corrected rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pos {
    Noun,
    Verb,
}

impl Pos {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pos::Noun => "NOUN",
            Pos::Verb => "VERB",
        }
    }
}

/// One existing-row candidate with its similarity score against a new entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub row_id: u32,
    pub score: f64,
    pub chosen: bool,
}

/// How a single new entry landed against the existing dataset.
/// Exactly one variant per new entry per run.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// One candidate shared the key; its row was flagged present.
    Single { row_id: u32 },
    /// Several candidates, best score at or above threshold. Advisory only:
    /// nothing in the dataset was touched.
    AmbiguousAccepted {
        best_row: u32,
        candidates: Vec<ScoredCandidate>,
    },
    /// Several candidates but none scored well enough; appended as new.
    AmbiguousRejected {
        candidates: Vec<ScoredCandidate>,
        appended_row: u32,
    },
    /// No candidate shared the key; appended as new.
    NoMatch { appended_row: u32 },
}

/// A new entry together with its routed bucket and outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeRecord {
    pub bucket: String,
    pub term: String,
    pub outcome: MatchOutcome,
}
