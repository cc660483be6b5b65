//! Error types for USFM rendering.
use thiserror::Error;

/// Errors raised while resolving a scripture reference.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferenceError {
  #[error("Empty reference")]
  Empty,

  #[error("Unknown book '{0}'")]
  UnknownBook(String),

  #[error("Malformed reference '{text}': {reason}")]
  Malformed { text: String, reason: String },

  #[error("Reference '{0}' has no book and no context to borrow one from")]
  NoBook(String),

  #[error("No section of {version} contains {reference}")]
  NoSection { version: String, reference: String },
}

/// Errors raised while loading or validating a word substitution table.
#[derive(Debug, Error)]
pub enum TableError {
  #[error("Failed to parse {table} table: {source}")]
  Parse {
    table:  String,
    #[source]
    source: serde_json::Error,
  },

  #[error("{table} table: duplicate old form '{form}'")]
  Duplicate { table: String, form: String },

  #[error("{table} table: mismatched {edge} space between '{old}' and '{new}'")]
  SpaceMismatch {
    table: String,
    edge:  &'static str,
    old:   String,
    new:   String,
  },

  #[error(
    "{table} table: mismatched trailing character between '{old}' and '{new}'"
  )]
  PunctuationMismatch {
    table: String,
    old:   String,
    new:   String,
  },

  #[error("{table} table: doubled space in '{form}'")]
  DoubleSpace { table: String, form: String },

  #[error("{table} table: replacement '{new}' re-triggers '{old}'")]
  Recursive {
    table: String,
    old:   String,
    new:   String,
  },

  #[error("{table} table: empty entry")]
  EmptyEntry { table: String },
}

/// Errors raised by the marker-stream converter and its post-passes.
#[derive(Debug, Error)]
pub enum UsfmError {
  /// Input that was never expected. Someone needs to look at the source
  /// data or extend the converter.
  #[error("Unhandled case at {location}: marker '{marker}': {detail}")]
  UnhandledCase {
    location: String,
    marker:   String,
    detail:   String,
  },

  #[error("Invalid context {context:?} for {location}")]
  InvalidContext {
    location: String,
    context:  Vec<String>,
  },

  #[error("Integrity violation at {location}: {detail}")]
  IntegrityViolation { location: String, detail: String },

  #[error("Unclosed '{delimiter}' note at {location} near '{snippet}'")]
  UnclosedNote {
    location:  String,
    delimiter: &'static str,
    snippet:   String,
  },

  #[error("Scanning {kind} at {location} exceeded the limit of {limit}")]
  NoteScanLimit {
    location: String,
    kind:     &'static str,
    limit:    usize,
  },

  #[error(
    "Unbalanced '\\{style}' at {location}: {opened} opened, {closed} closed"
  )]
  UnbalancedCharacterStyle {
    location: String,
    style:    &'static str,
    opened:   usize,
    closed:   usize,
  },

  #[error("Left-over backslash at {location} in '{snippet}'")]
  LeftoverBackslash { location: String, snippet: String },

  #[error("Malformed html at {location}: {detail}")]
  Html { location: String, detail: String },

  #[error("Reference error at {location}: {source}")]
  Reference {
    location: String,
    #[source]
    source:   ReferenceError,
  },

  #[error(transparent)]
  Table(#[from] TableError),

  #[error("Data error: {0}")]
  Data(String),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

/// Result type for USFM rendering.
pub type UsfmResult<T> = Result<T, UsfmError>;

/// Up to `max` characters of `text`, for error messages.
#[must_use]
pub(crate) fn snippet(text: &str, max: usize) -> String {
  match text.char_indices().nth(max) {
    Some((ix, _)) => format!("{}…", &text[..ix]),
    None => text.to_string(),
  }
}
