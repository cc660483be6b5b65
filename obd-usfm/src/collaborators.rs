//! Read-only lookup services the converter consults.
//!
//! The converter only sees the traits. [`BookTable`] and [`SectionIndex`]
//! are the stock implementations: both are built once, before any fan-out,
//! and shared by reference afterwards.
use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::{
  error::{UsfmError, UsfmResult},
  types::BookCode,
};

const BOOKS_JSON: &str = include_str!("../data/books.json");
const VERSION_ABBREVIATIONS_JSON: &str =
  include_str!("../data/version_abbreviations.json");

/// Chapter and verse counts for each book.
pub trait Versification: Send + Sync {
  fn is_single_chapter_book(&self, book: &BookCode) -> bool;

  fn max_chapters(&self, book: &BookCode) -> Option<u32>;

  /// Number of verses in a chapter, when known.
  fn num_verses(&self, book: &BookCode, chapter: u32) -> Option<u32>;
}

/// Resolves free-text book names and abbreviations to book codes.
pub trait BookLookup: Send + Sync {
  fn book_abbreviation_to_code(
    &self,
    version: &str,
    text: &str,
  ) -> Option<BookCode>;
}

/// Finds the synthetic section index containing a verse.
pub trait SectionLookup: Send + Sync {
  fn find_section_number(
    &self,
    version: &str,
    book: &BookCode,
    chapter: u32,
    verse: u32,
  ) -> Option<usize>;
}

/// The read-only services one conversion consults, bundled for passing
/// around.
#[derive(Clone, Copy)]
pub struct Lookups<'a> {
  pub versification: &'a dyn Versification,
  pub books:         &'a dyn BookLookup,
  pub sections:      &'a dyn SectionLookup,
}

impl<'a> Lookups<'a> {
  #[must_use]
  pub fn new(table: &'a BookTable, sections: &'a dyn SectionLookup) -> Self {
    Self {
      versification: table,
      books: table,
      sections,
    }
  }
}

impl std::fmt::Debug for Lookups<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Lookups").finish_non_exhaustive()
  }
}

/// Normalises a book name for table lookup.
///
/// Lowercases, drops spaces and periods, and turns a separated Roman
/// numeral prefix into a digit so `I Sam.`, `1 Sam` and `1Sam` agree.
#[must_use]
pub fn normalise_abbreviation(text: &str) -> String {
  let text = text.trim();
  let mut rest = text;
  let mut prefix = "";
  for (roman, digit) in [("III", "3"), ("II", "2"), ("I", "1")] {
    if let Some(after) = text.strip_prefix(roman) {
      if after.starts_with([' ', '.']) {
        prefix = digit;
        rest = after;
        break;
      }
    }
  }
  let mut normalised = String::with_capacity(text.len());
  normalised.push_str(prefix);
  normalised.extend(
    rest
      .chars()
      .filter(|c| !c.is_whitespace() && *c != '.')
      .flat_map(char::to_lowercase),
  );
  normalised
}

#[derive(Debug, Deserialize)]
struct BookRecord {
  code:     BookCode,
  chapters: u32,
  names:    Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BooksFile {
  books: Vec<BookRecord>,
}

#[derive(Debug, Clone)]
struct BookInfo {
  code:      BookCode,
  chapters:  u32,
  /// Normalised full name, used for prefix matching.
  full_name: String,
}

/// Book names, per-version abbreviations and versification counts.
#[derive(Debug, Clone, Default)]
pub struct BookTable {
  books:       Vec<BookInfo>,
  common:      HashMap<String, BookCode>,
  per_version: HashMap<String, HashMap<String, BookCode>>,
  verses:      HashMap<BookCode, Vec<u32>>,
}

impl BookTable {
  /// Loads the embedded book list and version abbreviation tables.
  ///
  /// # Errors
  ///
  /// Returns an error if the embedded data does not parse.
  pub fn load() -> UsfmResult<Self> {
    let books: BooksFile = serde_json::from_str(BOOKS_JSON)?;
    let versions: IndexMap<String, IndexMap<String, BookCode>> =
      serde_json::from_str(VERSION_ABBREVIATIONS_JSON)?;

    let mut table = Self::default();
    for record in books.books {
      for name in &record.names {
        table
          .common
          .insert(normalise_abbreviation(name), record.code.clone());
      }
      table
        .common
        .insert(record.code.as_str().to_lowercase(), record.code.clone());
      let full_name = record
        .names
        .first()
        .map(|name| normalise_abbreviation(name))
        .unwrap_or_default();
      table.books.push(BookInfo {
        code: record.code,
        chapters: record.chapters,
        full_name,
      });
    }
    for (version, abbreviations) in versions {
      let entries = abbreviations
        .into_iter()
        .map(|(form, code)| (normalise_abbreviation(&form), code))
        .collect();
      table.per_version.insert(version, entries);
    }
    log::debug!(
      "Loaded {} books and {} version abbreviation tables",
      table.books.len(),
      table.per_version.len()
    );
    Ok(table)
  }

  /// Adds verse counts from JSON shaped as `{"GEN": [31, 25, ...], ...}`.
  ///
  /// # Errors
  ///
  /// Returns an error if the JSON does not parse or names an unknown book.
  pub fn load_verse_counts(&mut self, json: &str) -> UsfmResult<()> {
    let counts: IndexMap<BookCode, Vec<u32>> = serde_json::from_str(json)?;
    for (book, verses) in counts {
      let Some(info) = self.books.iter().find(|info| info.code == book) else {
        return Err(UsfmError::Data(format!(
          "Verse counts given for unknown book {book}"
        )));
      };
      if usize::try_from(info.chapters).ok() != Some(verses.len()) {
        log::warn!(
          "Verse counts for {book} cover {} chapters but the book has {}",
          verses.len(),
          info.chapters
        );
      }
      self.verses.insert(book, verses);
    }
    Ok(())
  }

  /// All book codes in canonical order.
  pub fn codes(&self) -> impl Iterator<Item = &BookCode> {
    self.books.iter().map(|info| &info.code)
  }

  fn info(&self, book: &BookCode) -> Option<&BookInfo> {
    self.books.iter().find(|info| &info.code == book)
  }

  /// Unique book whose full name starts with `normalised`.
  fn prefix_match(&self, normalised: &str) -> Option<BookCode> {
    if normalised.chars().count() < 3 {
      return None;
    }
    let mut candidates = self
      .books
      .iter()
      .filter(|info| info.full_name.starts_with(normalised));
    match (candidates.next(), candidates.next()) {
      (Some(info), None) => Some(info.code.clone()),
      _ => None,
    }
  }
}

impl Versification for BookTable {
  fn is_single_chapter_book(&self, book: &BookCode) -> bool {
    self.info(book).is_some_and(|info| info.chapters == 1)
  }

  fn max_chapters(&self, book: &BookCode) -> Option<u32> {
    self.info(book).map(|info| info.chapters)
  }

  fn num_verses(&self, book: &BookCode, chapter: u32) -> Option<u32> {
    let index = usize::try_from(chapter.checked_sub(1)?).ok()?;
    self.verses.get(book)?.get(index).copied()
  }
}

impl BookLookup for BookTable {
  fn book_abbreviation_to_code(
    &self,
    version: &str,
    text: &str,
  ) -> Option<BookCode> {
    let normalised = normalise_abbreviation(text);
    if normalised.is_empty() {
      return None;
    }
    self
      .per_version
      .get(version)
      .and_then(|table| table.get(&normalised))
      .or_else(|| self.common.get(&normalised))
      .cloned()
      .or_else(|| self.prefix_match(&normalised))
  }
}

/// Inclusive verse span covered by one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "[u32; 4]")]
pub struct SectionSpan {
  pub start: (u32, u32),
  pub end:   (u32, u32),
}

impl From<[u32; 4]> for SectionSpan {
  fn from([start_c, start_v, end_c, end_v]: [u32; 4]) -> Self {
    Self {
      start: (start_c, start_v),
      end:   (end_c, end_v),
    }
  }
}

impl SectionSpan {
  #[must_use]
  pub fn contains(&self, chapter: u32, verse: u32) -> bool {
    (self.start..=self.end).contains(&(chapter, verse))
  }
}

/// Per-version, per-book list of section spans in reading order.
///
/// Loaded from JSON shaped as
/// `{"OET-RV": {"GEN": [[1, 1, 1, 31], [2, 1, 2, 3]]}}`.
#[derive(Debug, Clone, Default)]
pub struct SectionIndex {
  sections: HashMap<String, HashMap<BookCode, Vec<SectionSpan>>>,
}

impl SectionIndex {
  /// # Errors
  ///
  /// Returns an error if the JSON does not parse.
  pub fn from_json(json: &str) -> UsfmResult<Self> {
    let sections = serde_json::from_str(json)?;
    Ok(Self { sections })
  }

  /// Appends a section to the end of a book's list.
  pub fn push(&mut self, version: &str, book: BookCode, span: SectionSpan) {
    self
      .sections
      .entry(version.to_string())
      .or_default()
      .entry(book)
      .or_default()
      .push(span);
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.sections.is_empty()
  }
}

impl SectionLookup for SectionIndex {
  fn find_section_number(
    &self,
    version: &str,
    book: &BookCode,
    chapter: u32,
    verse: u32,
  ) -> Option<usize> {
    self
      .sections
      .get(version)?
      .get(book)?
      .iter()
      .position(|span| span.contains(chapter, verse))
  }
}
