//! Marker-stream to html conversion.
//!
//! [`Renderer::convert`] walks the entries of one rendering unit in order,
//! keeping the open-block flags in a `RenderState`, then hands the
//! assembled html to the notes pass and checks the result.
//!
//! - [`character`]: inline character styles inside one text field
//! - `convert`: the per-marker dispatch and end-of-stream handling
//! - `state`: open blocks (paragraph, section, lists, table, ...)
//! - `verse`: chapter and verse number anchors
pub mod character;
mod convert;
mod state;
mod verse;

use std::collections::HashMap;

pub use character::convert_character_formatting;
use serde::{Deserialize, Serialize};

use crate::{
  collaborators::Lookups,
  error::UsfmResult,
  types::{BookCode, MarkerEntry, NoteCounters, RenderedUnit, Segment},
};

/// Title length used when a version has no override.
pub const DEFAULT_NOTE_TITLE_LIMIT: usize = 11_500;

/// Notes of one kind allowed in a unit when nothing more specific is set.
pub const DEFAULT_NOTE_SCAN_LIMIT: usize = 5_000;

/// Knobs for [`Renderer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
  /// Versions whose unknown markers and stray backslashes only warn.
  pub tolerated_versions: Vec<String>,

  /// Maximum characters in a note caller's `title`.
  pub note_title_limit: usize,

  /// Per-version overrides of `note_title_limit`.
  pub note_title_limits: HashMap<String, usize>,

  /// Maximum notes of one kind in one unit.
  pub note_scan_limit: usize,

  /// Per-version overrides of `note_scan_limit`.
  pub version_note_scan_limits: HashMap<String, usize>,

  /// Per-book overrides, taking precedence over the version ones.
  pub book_note_scan_limits: HashMap<BookCode, usize>,

  /// Turn tag-balance problems into errors instead of log lines.
  pub strict_html: bool,
}

impl Default for RenderOptions {
  fn default() -> Self {
    Self {
      tolerated_versions:       vec!["ULT".to_string(), "UST".to_string()],
      note_title_limit:         DEFAULT_NOTE_TITLE_LIMIT,
      note_title_limits:        HashMap::from([("NET".to_string(), 18_000)]),
      note_scan_limit:          DEFAULT_NOTE_SCAN_LIMIT,
      version_note_scan_limits: HashMap::from([("NET".to_string(), 15_000)]),
      book_note_scan_limits:    HashMap::new(),
      strict_html:              false,
    }
  }
}

impl RenderOptions {
  /// Whether `version` is one of the known-imperfect legacy feeds.
  #[must_use]
  pub fn is_tolerated(&self, version: &str) -> bool {
    self.tolerated_versions.iter().any(|v| v == version)
  }

  #[must_use]
  pub fn title_limit(&self, version: &str) -> usize {
    self
      .note_title_limits
      .get(version)
      .copied()
      .unwrap_or(self.note_title_limit)
  }

  #[must_use]
  pub fn scan_limit(&self, version: &str, book: &BookCode) -> usize {
    self
      .book_note_scan_limits
      .get(book)
      .or_else(|| self.version_note_scan_limits.get(version))
      .copied()
      .unwrap_or(self.note_scan_limit)
  }
}

/// Converts marker entries to html.
///
/// Holds only read-only state, so one renderer can be shared across
/// threads and reused for every unit of a run.
///
/// # Examples
///
/// ```
/// use obd_usfm::{
///   BookTable,
///   Lookups,
///   MarkerEntry,
///   NoteCounters,
///   RefTuple,
///   RenderOptions,
///   Renderer,
///   SectionIndex,
///   Segment,
///   SegmentKind,
/// };
///
/// let table = BookTable::load().unwrap();
/// let sections = SectionIndex::default();
/// let renderer =
///   Renderer::new(Lookups::new(&table, &sections), RenderOptions::default());
///
/// let segment = Segment::new(
///   SegmentKind::Chapter,
///   "BSB",
///   RefTuple::chapter("GEN".parse().unwrap(), 1),
/// );
/// let entries = [
///   MarkerEntry::with_text("c", "1"),
///   MarkerEntry::new("p"),
///   MarkerEntry::with_text("v", "1"),
///   MarkerEntry::with_text("v~", "In the beginning"),
///   MarkerEntry::new("¬p"),
/// ];
/// let mut counters = NoteCounters::default();
/// let unit = renderer.convert(&segment, &entries, &mut counters).unwrap();
/// assert!(unit.html.contains("id=\"C1V1\""));
/// ```
#[derive(Debug, Clone)]
pub struct Renderer<'a> {
  lookups: Lookups<'a>,
  options: RenderOptions,
}

impl<'a> Renderer<'a> {
  #[must_use]
  pub const fn new(lookups: Lookups<'a>, options: RenderOptions) -> Self {
    Self { lookups, options }
  }

  #[must_use]
  pub const fn options(&self) -> &RenderOptions {
    &self.options
  }

  #[must_use]
  pub const fn lookups(&self) -> Lookups<'a> {
    self.lookups
  }

  /// Renders one unit.
  ///
  /// Footnote and cross-reference numbers continue from `counters`, so a
  /// page made of several units keeps one running sequence.
  ///
  /// # Errors
  ///
  /// Returns [`UsfmError`](crate::UsfmError) for unknown markers outside
  /// tolerated versions, an invalid context list, structural violations in
  /// whole-book units, note extraction failures, left-over backslashes
  /// and, with `strict_html`, unbalanced html.
  pub fn convert(
    &self,
    segment: &Segment,
    entries: &[MarkerEntry],
    counters: &mut NoteCounters,
  ) -> UsfmResult<RenderedUnit> {
    convert::Conversion::new(self, segment).run(entries, counters)
  }
}
