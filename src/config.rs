/// Maximum length of the term portion of a head line
pub const TERM_MAX_LEN: usize = 200;

/// Maximum length of a bare term-fragment line buffered ahead of a head
pub const PREFIX_MAX_LEN: usize = 80;

/// Default similarity acceptance threshold for reconciliation
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Acceptance threshold for the correction pass
pub const CORRECT_THRESHOLD: f64 = 0.55;

/// Score bonus when one definition contains the other (correction pass)
pub const CONTAINMENT_BONUS: f64 = 0.1;

/// Flag value for rows confirmed present or newly appended
pub const FLAG_PRESENT: u8 = 1;

/// Flag value stamped on rows never touched during a reconciliation run
pub const FLAG_ABSENT: u8 = 0;

/// Bucket name for terms that do not start with a Turkish letter
pub const OVERFLOW_BUCKET: &str = "#";

/// File stem used for the overflow bucket ('#' is not filename-friendly)
pub const OVERFLOW_FILE_STEM: &str = "Diger";

/// Progress update interval (tick every N entries)
pub const PROGRESS_INTERVAL: u64 = 1000;
