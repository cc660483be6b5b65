//! Scripture reference resolution.
//!
//! Free-text references such as `Gen 25:9-10` or `1 Sam 16:1–1 Ki 2:11` are
//! parsed into a [`ReferenceRange`] and turned into links whose target page
//! depends on the [`LinkMode`] of the unit being rendered.
//!
//! - [`parse`]: the reference grammar and book/chapter/verse resolution
//! - [`liven`]: wrapping references in structured fields and prose in links
pub mod liven;
pub mod parse;

use std::fmt;

pub use liven::{
  LivenContext,
  liven_intro_outline_refs,
  liven_prose,
  liven_xref_field,
};
pub use parse::{ParseContext, parse_reference};

use crate::{
  collaborators::SectionLookup,
  error::ReferenceError,
  types::{BookCode, SegmentKind},
  utils::{is_oet_family, root_prefix},
};

/// A resolved position. `verse` is absent for whole-chapter references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseRef {
  pub book:    BookCode,
  pub chapter: u32,
  pub verse:   Option<u32>,
}

impl VerseRef {
  #[must_use]
  pub const fn new(book: BookCode, chapter: u32, verse: Option<u32>) -> Self {
    Self {
      book,
      chapter,
      verse,
    }
  }

  /// Anchor id on book, chapter and section pages.
  #[must_use]
  pub fn anchor(&self) -> String {
    match self.verse {
      Some(verse) => format!("C{}V{verse}", self.chapter),
      None => format!("C{}", self.chapter),
    }
  }
}

impl fmt::Display for VerseRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.verse {
      Some(verse) => write!(f, "{} {}:{verse}", self.book, self.chapter),
      None => write!(f, "{} {}", self.book, self.chapter),
    }
  }
}

/// A single position or a range of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRange {
  pub start: VerseRef,
  pub end:   Option<VerseRef>,
}

impl ReferenceRange {
  #[must_use]
  pub const fn single(start: VerseRef) -> Self {
    Self { start, end: None }
  }

  /// The last position covered, which is the start for single references.
  #[must_use]
  pub fn last(&self) -> &VerseRef {
    self.end.as_ref().unwrap_or(&self.start)
  }
}

impl fmt::Display for ReferenceRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.start)?;
    let Some(end) = &self.end else {
      return Ok(());
    };
    if end.book != self.start.book {
      return write!(f, "–{end}");
    }
    match (end.chapter == self.start.chapter, end.verse) {
      (true, Some(verse)) => write!(f, "-{verse}"),
      (false, Some(verse)) => write!(f, "–{}:{verse}", end.chapter),
      (_, None) => write!(f, "–{}", end.chapter),
    }
  }
}

/// Which kind of page a reference link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
  /// Whole-book page, `{version}/byDoc/{BBB}.htm`.
  Book,
  /// Single-chapter page, `{version}/byC/{BBB}_C{c}.htm`.
  Chapter,
  /// Parallel-verse page, `par/{BBB}/C{c}V{v}.htm`.
  Verse,
  /// Section page, `{version}/bySec/{BBB}_S{n}.htm`.
  Section,
}

impl LinkMode {
  /// Link mode for references rendered inside a unit of `kind`.
  #[must_use]
  pub fn for_segment(kind: SegmentKind, version: &str) -> Self {
    match kind {
      SegmentKind::Book => Self::Book,
      SegmentKind::Section if is_oet_family(version) => Self::Section,
      SegmentKind::Section
      | SegmentKind::Chapter
      | SegmentKind::RelatedPassage
      | SegmentKind::TopicalPassage => Self::Chapter,
      SegmentKind::ParallelVerse | SegmentKind::InterlinearVerse => Self::Verse,
    }
  }
}

/// Builds the href for `target` on a page `level` directories deep.
///
/// # Errors
///
/// Returns [`ReferenceError::NoSection`] in section mode when no section
/// contains the target.
pub fn reference_href(
  target: &VerseRef,
  mode: LinkMode,
  version: &str,
  level: usize,
  sections: &dyn SectionLookup,
) -> Result<String, ReferenceError> {
  let prefix = root_prefix(level);
  let book = &target.book;
  let chapter = target.chapter;
  let anchor = target.anchor();
  let href = match mode {
    LinkMode::Book => format!("{prefix}{version}/byDoc/{book}.htm#{anchor}"),
    LinkMode::Chapter => {
      format!("{prefix}{version}/byC/{book}_C{chapter}.htm#{anchor}")
    },
    LinkMode::Verse => {
      let verse = target.verse.unwrap_or(1);
      format!("{prefix}par/{book}/C{chapter}V{verse}.htm#Top")
    },
    LinkMode::Section => {
      let verse = target.verse.unwrap_or(1);
      let section = sections
        .find_section_number(version, book, chapter, verse)
        .ok_or_else(|| ReferenceError::NoSection {
          version:   version.to_string(),
          reference: target.to_string(),
        })?;
      format!("{prefix}{version}/bySec/{book}_S{section}.htm#{anchor}")
    },
  };
  Ok(href)
}
