//! Line-oriented entry parser: turns normalized dictionary text into a lazy
//! sequence of (term, definition) entries.
//!
//! OCR output interleaves three kinds of lines: head lines (`term — first
//! chunk of definition`), continuation lines belonging to the open
//! definition, and bare term fragments printed above a head line when a long
//! term wrapped in the source column. The parser models this as an explicit
//! three-state machine so each transition can be tested in isolation:
//!
//! - `Idle` -- nothing open, nothing buffered
//! - `Backlog` -- term-fragment lines seen before any head; they are merged
//!   in front of the next head's term
//! - `Open` -- a term is open and collecting definition fragments

use crate::config::{PREFIX_MAX_LEN, TERM_MAX_LEN};
use crate::models::Entry;
use once_cell::sync::Lazy;
use regex::Regex;

static HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?P<term>[^\n:—]{{1,{}}}?)\s(?:—|:)\s(?P<def>.*)$",
        TERM_MAX_LEN
    ))
    .unwrap()
});

// A "term" consisting purely of punctuation is a separator artifact, not a head.
static PUNCT_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\wÇĞİIÖŞÜÂÎÛçğıiöşüâîû]+$").unwrap());

static NON_TERM_CHAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-zÇĞİIÖŞÜÂÎÛçğıiöşüâîû\s]").unwrap());

static HAS_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-zÇĞİIÖŞÜÂÎÛçğıiöşüâîû]").unwrap());

static WS_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([,.;:!?])").unwrap());

/// Parser state between lines. `Backlog` and `Open` are mutually exclusive:
/// opening a head consumes the backlog, and fragments seen while open are
/// definition continuations, never backlog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserState {
    Idle,
    Backlog(Vec<String>),
    Open {
        term: String,
        fragments: Vec<String>,
    },
}

/// Result of feeding one line to the state machine.
#[derive(Debug, PartialEq, Eq)]
pub struct Transition {
    pub state: ParserState,
    /// Entry closed by this line, before per-entry cleanup.
    pub closed: Option<(String, Vec<String>)>,
    /// Lines discarded as noise by this transition.
    pub dropped: usize,
}

fn transition(state: ParserState, closed: Option<(String, Vec<String>)>, dropped: usize) -> Transition {
    Transition {
        state,
        closed,
        dropped,
    }
}

/// True for a line that looks like a bare term fragment: no separator, short,
/// Turkish letters and whitespace only.
fn looks_like_term_line(line: &str) -> bool {
    if line.is_empty() {
        return false;
    }
    if line.contains('—') || line.contains(':') {
        return false;
    }
    if line.chars().count() > PREFIX_MAX_LEN {
        return false;
    }
    if NON_TERM_CHAR.is_match(line) {
        return false;
    }
    HAS_LETTER.is_match(line)
}

/// Pure per-line transition of the parser state machine.
pub fn step(state: ParserState, line: &str) -> Transition {
    if line.is_empty() {
        // A blank line inside an open definition marks a paragraph break;
        // never two in a row. Elsewhere it changes nothing.
        if let ParserState::Open { term, mut fragments } = state {
            if !fragments.is_empty() && fragments.last().map(String::as_str) != Some("") {
                fragments.push(String::new());
            }
            return transition(ParserState::Open { term, fragments }, None, 0);
        }
        return transition(state, None, 0);
    }

    if let Some(caps) = HEAD.captures(line) {
        let term_part = caps["term"].trim();
        if !PUNCT_ONLY.is_match(term_part) {
            let term_core = WS_RUN.replace_all(term_part, " ").into_owned();
            let def_seed = caps["def"].trim().to_string();
            return match state {
                ParserState::Open { term, fragments } => transition(
                    ParserState::Open {
                        term: term_core,
                        fragments: vec![def_seed],
                    },
                    Some((term, fragments)),
                    0,
                ),
                ParserState::Backlog(buf) => {
                    let prefix = buf
                        .iter()
                        .map(|l| l.trim())
                        .filter(|l| !l.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ");
                    let full_term = format!("{} {}", prefix, term_core).trim().to_string();
                    transition(
                        ParserState::Open {
                            term: full_term,
                            fragments: vec![def_seed],
                        },
                        None,
                        0,
                    )
                }
                ParserState::Idle => transition(
                    ParserState::Open {
                        term: term_core,
                        fragments: vec![def_seed],
                    },
                    None,
                    0,
                ),
            };
        }
    }

    match state {
        ParserState::Open { term, mut fragments } => {
            fragments.push(line.to_string());
            transition(ParserState::Open { term, fragments }, None, 0)
        }
        ParserState::Backlog(mut buf) => {
            if looks_like_term_line(line) {
                buf.push(line.to_string());
                transition(ParserState::Backlog(buf), None, 0)
            } else {
                // The buffered lines were noise after all, not a term prefix.
                let dropped = buf.len() + 1;
                transition(ParserState::Idle, None, dropped)
            }
        }
        ParserState::Idle => {
            if looks_like_term_line(line) {
                transition(ParserState::Backlog(vec![line.to_string()]), None, 0)
            } else {
                transition(ParserState::Idle, None, 1)
            }
        }
    }
}

/// Joins buffered fragments and applies per-entry cleanup. Returns `None`
/// when cleanup leaves an empty term or definition.
fn finish(term: String, fragments: Vec<String>) -> Option<Entry> {
    let joined = fragments
        .iter()
        .filter(|p| !p.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");

    let term = WS_RUN.replace_all(&term, " ");
    let term = term
        .trim_matches(|c: char| matches!(c, ' ' | '\t' | '-' | '–' | '—' | ':' | '.' | ';' | ','))
        .to_string();

    let definition = WS_RUN.replace_all(&joined, " ");
    let definition = SPACE_BEFORE_PUNCT
        .replace_all(&definition, "$1")
        .trim()
        .to_string();

    if term.is_empty() || definition.is_empty() {
        return None;
    }
    Some(Entry { term, definition })
}

/// Lazy entry iterator over normalized text. Not restartable; a fresh parse
/// re-scans from the start.
pub struct EntryParser<'a> {
    lines: std::str::Lines<'a>,
    state: ParserState,
    skipped: usize,
    finished: bool,
}

impl<'a> EntryParser<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            state: ParserState::Idle,
            skipped: 0,
            finished: false,
        }
    }

    /// Lines and malformed entries discarded so far. Final once the iterator
    /// is exhausted.
    pub fn skipped_lines(&self) -> usize {
        self.skipped
    }
}

impl Iterator for EntryParser<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        loop {
            match self.lines.next() {
                Some(raw) => {
                    let state = std::mem::replace(&mut self.state, ParserState::Idle);
                    let t = step(state, raw.trim());
                    self.state = t.state;
                    self.skipped += t.dropped;
                    if let Some((term, fragments)) = t.closed {
                        match finish(term, fragments) {
                            Some(entry) => return Some(entry),
                            None => self.skipped += 1,
                        }
                    }
                }
                None => {
                    if self.finished {
                        return None;
                    }
                    self.finished = true;
                    let state = std::mem::replace(&mut self.state, ParserState::Idle);
                    if let ParserState::Open { term, fragments } = state {
                        match finish(term, fragments) {
                            Some(entry) => return Some(entry),
                            None => self.skipped += 1,
                        }
                    }
                    return None;
                }
            }
        }
    }
}

/// Eager convenience wrapper around [`EntryParser`]. Returns the entries and
/// the skip count.
pub fn parse_entries(text: &str) -> (Vec<Entry>, usize) {
    let mut parser = EntryParser::new(text);
    let entries: Vec<Entry> = parser.by_ref().collect();
    (entries, parser.skipped_lines())
}
