//! Line-oriented row parsing with per-row outcomes.
//!
//! Import files are line-per-record CSV without a header row. Comment and
//! blank lines are skipped silently; every remaining line produces a
//! [`RowOutcome`] carrying either the parsed item or the error that
//! rejected it. A malformed row never aborts the stream.

use std::collections::HashMap;
use std::hash::Hash;
use std::io::{self, BufRead};

use thiserror::Error;

/// Line prefixes treated as comments.
pub const COMMENT_MARKERS: [&str; 5] = ["#", "'", ";", "//", "--"];

const UTF8_BOM: &str = "\u{feff}";

/// Why a data row was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    /// The line did not split into enough fields.
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    /// A field failed validation or conversion.
    #[error("invalid {field}: {message}")]
    Field {
        field: &'static str,
        message: String,
    },

    /// The row names a parent reference no earlier row introduced.
    #[error("unknown parent reference '{0}'")]
    UnknownParent(String),

    /// The row would re-parent a group underneath its own subtree.
    #[error("re-parenting '{child}' under '{parent}' would create a cycle")]
    CycleDetected { child: String, parent: String },

    /// The line could not be split as CSV at all.
    #[error("malformed line: {0}")]
    Malformed(String),
}

/// Outcome of one data row: the item it produced, or the error that
/// rejected it. Comment and blank lines are not counted or reported.
#[derive(Debug, Clone)]
pub struct RowOutcome<T> {
    /// 1-based data row number.
    pub row: usize,
    /// The raw line as read from the input.
    pub line: String,
    pub result: Result<T, RowError>,
}

impl<T> RowOutcome<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Turns one CSV record into a domain item.
///
/// Handlers may accumulate state across rows; the group tree builder uses
/// this to resolve each row's parent against rows already seen.
pub trait RowHandler {
    type Item;

    fn handle(&mut self, record: &csv::StringRecord) -> Result<Self::Item, RowError>;
}

/// Parse an input stream row by row, never halting on individual bad rows.
///
/// Returns one [`RowOutcome`] per data row, in file order. Only an I/O
/// failure on the underlying reader is fatal.
pub fn parse_rows<R, H>(reader: R, handler: &mut H) -> io::Result<Vec<RowOutcome<H::Item>>>
where
    R: BufRead,
    H: RowHandler,
{
    let mut outcomes = Vec::new();
    let mut row = 0;

    for (index, line) in reader.lines().enumerate() {
        let mut line = line?;
        if index == 0 {
            if let Some(stripped) = line.strip_prefix(UTF8_BOM) {
                line = stripped.to_string();
            }
        }
        if is_comment_or_blank(&line) {
            continue;
        }
        row += 1;
        let result = split_fields(&line).and_then(|record| handler.handle(&record));
        outcomes.push(RowOutcome { row, line, result });
    }

    Ok(outcomes)
}

fn is_comment_or_blank(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || COMMENT_MARKERS.iter().any(|m| trimmed.starts_with(m))
}

/// Split one line into CSV fields, honoring quoting.
fn split_fields(line: &str) -> Result<csv::StringRecord, RowError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    match reader.records().next() {
        Some(Ok(record)) => Ok(record),
        Some(Err(e)) => Err(RowError::Malformed(e.to_string())),
        None => Err(RowError::Malformed("empty record".to_string())),
    }
}

/// Build a key → item map with first-occurrence-wins semantics.
///
/// The first item producing a given key stays in the primary map; every
/// later item with the same key is appended to the non-unique side table
/// under that key. Items whose key function returns `None` (no usable
/// key) are excluded from both maps.
pub fn create_dictionary<K, T, F>(
    items: impl IntoIterator<Item = T>,
    key: F,
) -> (HashMap<K, T>, HashMap<K, Vec<T>>)
where
    K: Eq + Hash + Clone,
    F: Fn(&T) -> Option<K>,
{
    let mut primary = HashMap::new();
    let mut non_unique: HashMap<K, Vec<T>> = HashMap::new();

    for item in items {
        let Some(k) = key(&item) else { continue };
        if primary.contains_key(&k) {
            non_unique.entry(k).or_default().push(item);
        } else {
            primary.insert(k, item);
        }
    }

    (primary, non_unique)
}
