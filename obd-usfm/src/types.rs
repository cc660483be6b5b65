//! Types shared across the renderer, reference resolver and post-processors.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A side annotation attached to a marker entry by the upstream parser.
///
/// SR-GNT word entries carry `ww` extras such as
/// `Ἀρχὴ|lemma="ἀρχή" x-strong="G07460" x-morph="Gr,N,....NFS"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Extra {
  #[serde(rename = "type")]
  pub kind: String,
  pub text: String,
}

/// One tokenised USFM marker with its text and extras.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarkerEntry {
  pub marker: String,
  #[serde(default)]
  pub text:   Option<String>,
  #[serde(default)]
  pub extras: Vec<Extra>,
}

impl MarkerEntry {
  /// Creates an entry without text.
  #[must_use]
  pub fn new(marker: &str) -> Self {
    Self {
      marker: marker.to_string(),
      text:   None,
      extras: Vec::new(),
    }
  }

  /// Creates an entry carrying text.
  #[must_use]
  pub fn with_text(marker: &str, text: &str) -> Self {
    Self {
      marker: marker.to_string(),
      text:   Some(text.to_string()),
      extras: Vec::new(),
    }
  }

  /// Attaches an extra, builder style.
  #[must_use]
  pub fn extra(mut self, kind: &str, text: &str) -> Self {
    self.extras.push(Extra {
      kind: kind.to_string(),
      text: text.to_string(),
    });
    self
  }

  /// Text of the entry, treating an empty string as absent.
  #[must_use]
  pub fn text(&self) -> Option<&str> {
    self.text.as_deref().filter(|text| !text.is_empty())
  }
}

/// Granularity of the unit being rendered.
///
/// Decides which context markers are legal, how strictly integrity
/// violations are treated and how verse numbers are linked.
#[derive(
  Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default,
)]
#[serde(rename_all = "camelCase")]
pub enum SegmentKind {
  Book,
  #[default]
  Chapter,
  Section,
  ParallelVerse,
  InterlinearVerse,
  RelatedPassage,
  TopicalPassage,
}

impl SegmentKind {
  /// Whether the unit is a single verse (parallel or interlinear pages).
  #[must_use]
  pub const fn is_single_verse(self) -> bool {
    matches!(self, Self::ParallelVerse | Self::InterlinearVerse)
  }

  /// Whether the unit is a passage extracted for a related/topical page.
  #[must_use]
  pub const fn is_passage(self) -> bool {
    matches!(self, Self::RelatedPassage | Self::TopicalPassage)
  }

  /// Integrity violations raise only at whole-book granularity.
  #[must_use]
  pub const fn is_strict(self) -> bool {
    matches!(self, Self::Book)
  }

  #[must_use]
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Book => "book",
      Self::Chapter => "chapter",
      Self::Section => "section",
      Self::ParallelVerse => "parallelVerse",
      Self::InterlinearVerse => "interlinearVerse",
      Self::RelatedPassage => "relatedPassage",
      Self::TopicalPassage => "topicalPassage",
    }
  }
}

impl fmt::Display for SegmentKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Three-character book code such as `GEN`, `SA1` or `JN3`.
///
/// Always starts with an uppercase letter so it is usable as an HTML id.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct BookCode(String);

impl BookCode {
  #[must_use]
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl FromStr for BookCode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let mut chars = s.chars();
    let valid = s.len() == 3
      && chars.next().is_some_and(|c| c.is_ascii_uppercase())
      && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if valid {
      Ok(Self(s.to_string()))
    } else {
      Err(format!("Invalid book code: '{s}'"))
    }
  }
}

impl TryFrom<String> for BookCode {
  type Error = String;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<BookCode> for String {
  fn from(code: BookCode) -> Self {
    code.0
  }
}

impl fmt::Display for BookCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Where a rendering unit sits: book plus optional chapter and verse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefTuple {
  pub book:    BookCode,
  #[serde(default)]
  pub chapter: Option<u32>,
  #[serde(default)]
  pub verse:   Option<u32>,
}

impl RefTuple {
  #[must_use]
  pub const fn book(book: BookCode) -> Self {
    Self {
      book,
      chapter: None,
      verse: None,
    }
  }

  #[must_use]
  pub const fn chapter(book: BookCode, chapter: u32) -> Self {
    Self {
      book,
      chapter: Some(chapter),
      verse: None,
    }
  }

  #[must_use]
  pub const fn verse(book: BookCode, chapter: u32, verse: u32) -> Self {
    Self {
      book,
      chapter: Some(chapter),
      verse: Some(verse),
    }
  }
}

impl fmt::Display for RefTuple {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match (self.chapter, self.verse) {
      (Some(c), Some(v)) => write!(f, "{} {c}:{v}", self.book),
      (Some(c), None) => write!(f, "{} {c}", self.book),
      _ => write!(f, "{}", self.book),
    }
  }
}

/// Describes one call of the converter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
  pub kind:       SegmentKind,
  pub version:    String,
  pub reference:  RefTuple,
  /// Markers that are already open around this unit (e.g. `s1`, `p`).
  #[serde(default)]
  pub context:    Vec<String>,
  #[serde(default)]
  pub basic_only: bool,
  /// Directory depth of the page the fragment lands in.
  #[serde(default)]
  pub level:      usize,
}

impl Segment {
  #[must_use]
  pub fn new(kind: SegmentKind, version: &str, reference: RefTuple) -> Self {
    Self {
      kind,
      version: version.to_string(),
      reference,
      context: Vec::new(),
      basic_only: false,
      level: 0,
    }
  }

  #[must_use]
  pub fn with_context(mut self, context: &[&str]) -> Self {
    self.context = context.iter().map(ToString::to_string).collect();
    self
  }

  #[must_use]
  pub fn basic_only(mut self, basic_only: bool) -> Self {
    self.basic_only = basic_only;
    self
  }

  #[must_use]
  pub fn at_level(mut self, level: usize) -> Self {
    self.level = level;
    self
  }

  /// Short label used in log lines and error messages.
  #[must_use]
  pub fn location(&self) -> String {
    format!("{} {} ({})", self.version, self.reference, self.kind)
  }
}

/// Running footnote and cross-reference numbers.
///
/// Owned by the caller so numbering can continue across several units on
/// the same page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteCounters {
  pub footnotes: usize,
  pub xrefs:     usize,
}

/// Output of one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedUnit {
  /// Body html with note callers in place.
  pub html:           String,
  /// `<p class="fn">` entries, in first-occurrence order.
  pub footnotes_html: String,
  /// `<p class="xr">` entries, in first-occurrence order.
  pub xrefs_html:     String,
}

impl RenderedUnit {
  #[must_use]
  pub const fn has_notes(&self) -> bool {
    !self.footnotes_html.is_empty() || !self.xrefs_html.is_empty()
  }

  /// Joins the body and the trailing note lists into one fragment.
  #[must_use]
  pub fn into_html(self) -> String {
    if !self.has_notes() {
      return self.html;
    }
    let mut html = self.html;
    html.push_str("\n<hr style=\"width:45%;margin-left:0;margin-top:0.3em\">");
    if !self.footnotes_html.is_empty() {
      html.push_str("\n<div class=\"footnotes\">\n");
      html.push_str(&self.footnotes_html);
      html.push_str("</div><!--footnotes-->");
    }
    if !self.xrefs_html.is_empty() {
      html.push_str("\n<div class=\"crossRefs\">\n");
      html.push_str(&self.xrefs_html);
      html.push_str("</div><!--crossRefs-->");
    }
    html
  }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Fine in tests")]
mod tests {
  use super::*;

  #[test]
  fn test_book_code_validation() {
    assert!("GEN".parse::<BookCode>().is_ok());
    assert!("SA1".parse::<BookCode>().is_ok());
    assert!("1SA".parse::<BookCode>().is_err());
    assert!("gen".parse::<BookCode>().is_err());
    assert!("GENE".parse::<BookCode>().is_err());
  }

  #[test]
  fn test_ref_tuple_display() {
    let book: BookCode = "JHN".parse().unwrap();
    assert_eq!(RefTuple::verse(book.clone(), 3, 16).to_string(), "JHN 3:16");
    assert_eq!(RefTuple::chapter(book.clone(), 3).to_string(), "JHN 3");
    assert_eq!(RefTuple::book(book).to_string(), "JHN");
  }

  #[test]
  fn test_entry_deserializes_without_optional_fields() {
    let entry: MarkerEntry = serde_json::from_str(r#"{"marker":"v"}"#).unwrap();
    assert_eq!(entry, MarkerEntry::new("v"));
  }

  #[test]
  fn test_empty_text_is_absent() {
    assert_eq!(MarkerEntry::with_text("v~", "").text(), None);
    assert_eq!(MarkerEntry::with_text("v~", "x").text(), Some("x"));
  }

  #[test]
  fn test_rendered_unit_joins_notes() {
    let unit = RenderedUnit {
      html:           "<p>a</p>".to_string(),
      footnotes_html: "<p class=\"fn\" id=\"fn1\">n</p>\n".to_string(),
      xrefs_html:     String::new(),
    };
    let html = unit.into_html();
    assert!(html.contains("<div class=\"footnotes\">"));
    assert!(!html.contains("crossRefs"));
  }
}
