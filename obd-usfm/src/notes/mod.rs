//! Footnote and cross-reference extraction.
//!
//! Runs over the assembled html of one unit, after the marker loop. Every
//! `\f ...\f*` (or `\fe ...\fe*`) region, then every `\x ...\x*` region, is
//! numbered and replaced by a small caller link, and its body is rendered
//! into the matching end-of-unit list.
pub mod tokenizer;

use std::sync::LazyLock;

use regex::Regex;

use self::tokenizer::{Token, tokenize};
use crate::{
  error::{UsfmError, UsfmResult, snippet},
  reference::{LivenContext, liven_xref_field},
  render::character::style_tags,
  types::{NoteCounters, RenderedUnit, Segment},
  utils::{never_matching_regex, sanitise_title},
};

static VERSE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"id="C([0-9]+)V([0-9]+)""#).unwrap_or_else(|e| {
    log::error!("Failed to compile VERSE_ID_RE regex: {e}");
    never_matching_regex()
  })
});

static LOCATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"([0-9]+)[:.]([0-9]+)").unwrap_or_else(|e| {
    log::error!("Failed to compile LOCATOR_RE regex: {e}");
    never_matching_regex()
  })
});

const FOOTNOTE_FIELDS: &[&str] =
  &["ft", "fq", "fqa", "fk", "fl", "fw", "fp", "fv", "fr", "fdc", "fm"];
const XREF_FIELDS: &[&str] = &["xt", "xq", "xta", "xk", "xo", "xop", "xot"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoteKind {
  Footnote,
  CrossReference,
}

impl NoteKind {
  const fn id_prefix(self) -> &'static str {
    match self {
      Self::Footnote => "fn",
      Self::CrossReference => "xr",
    }
  }

  const fn openers(self) -> &'static [&'static str] {
    match self {
      Self::Footnote => &["f", "fe"],
      Self::CrossReference => &["x"],
    }
  }

  const fn locator(self) -> &'static str {
    match self {
      Self::Footnote => "fr",
      Self::CrossReference => "xo",
    }
  }

  const fn label(self) -> &'static str {
    match self {
      Self::Footnote => "footnotes",
      Self::CrossReference => "cross-references",
    }
  }

  fn caller(self, number: usize, title: &str) -> String {
    match self {
      Self::Footnote => format!(
        "<span class=\"fnCaller\">[<a title=\"Note: {title}\" \
         href=\"#fn{number}\">fn</a>]</span>"
      ),
      Self::CrossReference => format!(
        "<span class=\"xrCaller\">[<a title=\"See also: {title}\" \
         href=\"#xr{number}\">ref</a>]</span>"
      ),
    }
  }
}

/// Settings for one run of the notes pass.
#[derive(Debug, Clone, Copy)]
pub struct NoteContext<'a> {
  pub segment:     &'a Segment,
  pub liven:       LivenContext<'a>,
  /// Maximum characters in a caller's `title`.
  pub title_limit: usize,
  /// Maximum notes of each kind in one unit.
  pub scan_limit:  usize,
}

/// Where a note was found in the html.
struct Region<'h> {
  start:  usize,
  end:    usize,
  /// Text between the opener and the closer.
  inner:  &'h str,
  opener: &'static str,
}

fn delimiter(opener: &str) -> &'static str {
  match opener {
    "fe" => "\\fe",
    "f" => "\\f",
    _ => "\\x",
  }
}

fn find_region<'h>(
  html: &'h str,
  from: usize,
  kind: NoteKind,
  location: &str,
) -> UsfmResult<Option<Region<'h>>> {
  let found = kind
    .openers()
    .iter()
    .filter_map(|opener| {
      html[from..]
        .find(&format!("\\{opener} "))
        .map(|ix| (from + ix, *opener))
    })
    .min_by_key(|(ix, _)| *ix);
  let Some((start, opener)) = found else {
    return Ok(None);
  };
  let inner_start = start + opener.len() + 2;
  let closer = format!("\\{opener}*");
  let Some(close_ix) = html[inner_start..].find(&closer) else {
    return Err(UsfmError::UnclosedNote {
      location:  location.to_string(),
      delimiter: delimiter(opener),
      snippet:   snippet(&html[start..], 60),
    });
  };
  let end = inner_start + close_ix + closer.len();
  Ok(Some(Region {
    start,
    end,
    inner: &html[inner_start..inner_start + close_ix],
    opener,
  }))
}

/// Splits off the caller character and the optional locator field.
fn split_caller_and_locator(
  inner: &str,
  kind: NoteKind,
) -> (Option<String>, &str) {
  let inner = inner.trim_start();
  let rest = if inner.starts_with('\\') {
    inner
  } else {
    inner
      .split_once(char::is_whitespace)
      .map_or("", |(_caller, rest)| rest)
      .trim_start()
  };
  let opener = format!("\\{} ", kind.locator());
  let Some(after) = rest.strip_prefix(&opener) else {
    return (None, rest);
  };
  let locator_len = after.find('\\').unwrap_or(after.len());
  let locator = after[..locator_len].trim().to_string();
  let mut body = &after[locator_len..];
  let closer = format!("\\{}*", kind.locator());
  if let Some(stripped) = body.strip_prefix(&closer) {
    body = stripped;
  }
  ((!locator.is_empty()).then_some(locator), body)
}

/// Reduces body tokens to html, keeping at most one open field span.
struct BodyReducer<'c, 'a> {
  ctx:         &'c NoteContext<'a>,
  location:    &'c str,
  html:        String,
  field:       Option<&'static str>,
  styles:      Vec<(String, &'static str)>,
  xt_buffer:   Option<String>,
  nested_xref: bool,
  /// Drop the caller character at the start of a nested `\x`.
  skip_caller: bool,
}

impl<'c, 'a> BodyReducer<'c, 'a> {
  fn new(ctx: &'c NoteContext<'a>, location: &'c str) -> Self {
    Self {
      ctx,
      location,
      html: String::new(),
      field: None,
      styles: Vec::new(),
      xt_buffer: None,
      nested_xref: false,
      skip_caller: false,
    }
  }

  fn flush_xt(&mut self) -> UsfmResult<()> {
    if let Some(text) = self.xt_buffer.take() {
      let livened =
        liven_xref_field(&text, &self.ctx.liven).map_err(|source| {
          UsfmError::Reference {
            location: self.location.to_string(),
            source,
          }
        })?;
      self.html.push_str(&livened);
    }
    Ok(())
  }

  fn close_styles(&mut self) {
    for (_, closing) in self.styles.drain(..).rev() {
      self.html.push_str(closing);
    }
  }

  fn close_field(&mut self) -> UsfmResult<()> {
    self.flush_xt()?;
    self.close_styles();
    if self.field.take().is_some() {
      self.html.push_str("</span>");
    }
    Ok(())
  }

  fn text(&mut self, text: &str) {
    let text = if self.skip_caller {
      self.skip_caller = false;
      let trimmed = text.trim_start();
      trimmed
        .split_once(char::is_whitespace)
        .map_or("", |(_caller, rest)| rest)
    } else {
      text
    };
    match &mut self.xt_buffer {
      Some(buffer) => buffer.push_str(text),
      None => self.html.push_str(text),
    }
  }

  fn open(&mut self, name: &str) -> UsfmResult<()> {
    if let Some(field) = FOOTNOTE_FIELDS
      .iter()
      .chain(XREF_FIELDS)
      .find(|field| **field == name)
    {
      self.close_field()?;
      self.html.push_str(&format!("<span class=\"{field}\">"));
      self.field = Some(*field);
      if *field == "xt" {
        self.xt_buffer = Some(String::new());
      }
      return Ok(());
    }
    if name == "x" {
      self.close_field()?;
      self.html.push_str("<span class=\"xr\">");
      self.nested_xref = true;
      self.skip_caller = true;
      return Ok(());
    }
    if let Some((opening, closing)) = style_tags(name) {
      self.flush_xt()?;
      self.html.push_str(&opening);
      self.styles.push((name.to_string(), closing));
      return Ok(());
    }
    log::warn!("Dropping unknown note marker '\\{name}' in {}", self.location);
    Ok(())
  }

  fn close(&mut self, name: &str) -> UsfmResult<()> {
    if self.field == Some(name) || (name == "x" && self.nested_xref) {
      self.close_field()?;
      if name == "x" {
        self.html.push_str("</span>");
        self.nested_xref = false;
      }
      return Ok(());
    }
    if let Some(depth) = self.styles.iter().rposition(|(open, _)| open == name)
    {
      self.flush_xt()?;
      for (_, closing) in self.styles.drain(depth..).rev() {
        self.html.push_str(closing);
      }
      return Ok(());
    }
    log::warn!("Ignoring unopened '\\{name}*' in {}", self.location);
    Ok(())
  }

  fn finish(mut self) -> UsfmResult<String> {
    self.close_field()?;
    if self.nested_xref {
      log::warn!("Closing nested cross-reference in {}", self.location);
      self.html.push_str("</span>");
    }
    Ok(self.html.trim().to_string())
  }
}

fn render_body(
  body: &str,
  ctx: &NoteContext<'_>,
  location: &str,
) -> UsfmResult<String> {
  let mut reducer = BodyReducer::new(ctx, location);
  for token in tokenize(body) {
    match token {
      Token::Text(text) => reducer.text(text),
      Token::Open(name) => reducer.open(name)?,
      Token::Close(name) => reducer.close(name)?,
    }
  }
  reducer.finish()
}

/// The `C{c}V{v}` anchor a note links back to: its locator, or failing that
/// the last verse anchor before it.
fn back_link_target(
  locator: Option<&str>,
  last_anchor: impl FnOnce() -> Option<(u32, u32)>,
) -> Option<(u32, u32)> {
  locator
    .and_then(|locator| {
      let caps = LOCATOR_RE.captures(locator)?;
      Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
    })
    .or_else(last_anchor)
}

/// Last verse anchor seen so far. Extraction only moves forward, so each
/// stretch of html is scanned once.
#[derive(Debug, Default)]
struct VerseAnchors {
  scanned: usize,
  last:    Option<(u32, u32)>,
}

impl VerseAnchors {
  /// The last anchor in `html[..upto]`. Text before the previous `upto`
  /// must not have changed.
  fn before(&mut self, html: &str, upto: usize) -> Option<(u32, u32)> {
    if upto > self.scanned {
      let found = VERSE_ID_RE
        .captures_iter(&html[self.scanned..upto])
        .filter_map(|caps| Some((caps[1].parse().ok()?, caps[2].parse().ok()?)))
        .last();
      if found.is_some() {
        self.last = found;
      }
      self.scanned = upto;
    }
    self.last
  }
}

/// One extraction pass over `html` for one note kind.
fn extract(
  html: String,
  kind: NoteKind,
  ctx: &NoteContext<'_>,
  counter: &mut usize,
) -> UsfmResult<(String, String)> {
  let location = ctx.segment.location();
  let single_verse = ctx.segment.kind.is_single_verse();
  let prefix = kind.id_prefix();
  let mut html = html;
  let mut notes = String::new();
  let mut seen: Vec<(String, usize)> = Vec::new();
  let mut anchors = VerseAnchors::default();
  let mut from = 0;
  let mut found = 0;
  while let Some(region) = find_region(&html, from, kind, &location)? {
    found += 1;
    if found > ctx.scan_limit {
      return Err(UsfmError::NoteScanLimit {
        location,
        kind: kind.label(),
        limit: ctx.scan_limit,
      });
    }
    log::trace!("Found \\{} note in {location}", region.opener);
    let (start, end) = (region.start, region.end);
    let (locator, body) = split_caller_and_locator(region.inner, kind);
    let body_html = render_body(body, ctx, &location)?;

    *counter += 1;
    let number = *counter;
    let title = sanitise_title(&body_html, ctx.title_limit);
    let caller = kind.caller(number, &title);

    let duplicate = (single_verse && kind == NoteKind::Footnote)
      .then(|| seen.iter().find(|(seen_body, _)| *seen_body == body_html))
      .flatten()
      .map(|(_, first)| *first);
    if let Some(first) = duplicate {
      let existing = format!("<p class=\"{prefix}\" id=\"{prefix}{first}\">");
      let spliced = format!("{existing}<span id=\"{prefix}{number}\"></span>");
      notes = notes.replacen(&existing, &spliced, 1);
      log::debug!("Footnote {number} in {location} repeats footnote {first}");
    } else {
      let reference = if ctx.segment.kind.is_single_verse() {
        locator
          .as_ref()
          .map(|locator| {
            format!("<span class=\"{prefix}Ref\">{locator}</span> ")
          })
          .unwrap_or_default()
      } else {
        let last_anchor = || anchors.before(&html, start);
        match back_link_target(locator.as_deref(), last_anchor) {
          Some((c, v)) => {
            let text = locator.clone().unwrap_or_else(|| format!("{c}:{v}"));
            format!(
              "<span class=\"{prefix}Ref\"><a title=\"Go back up to {c}:{v} \
               in the text\" href=\"#C{c}V{v}\">{text}</a></span> "
            )
          },
          None => locator
            .as_ref()
            .map(|locator| {
              format!("<span class=\"{prefix}Ref\">{locator}</span> ")
            })
            .unwrap_or_default(),
        }
      };
      notes.push_str(&format!(
        "<p class=\"{prefix}\" \
         id=\"{prefix}{number}\">{reference}{body_html}</p>\n"
      ));
      seen.push((body_html, number));
    }

    html.replace_range(start..end, &caller);
    from = start + caller.len();
  }
  Ok((html, notes))
}

/// Moves every footnote, then every cross-reference, out of `html`.
///
/// Numbers continue from `counters`, which are left at the last number
/// used.
///
/// # Errors
///
/// Returns [`UsfmError::UnclosedNote`] for a region without its closer,
/// [`UsfmError::NoteScanLimit`] when a unit holds more notes than allowed,
/// and any error from livening `\xt` fields.
pub fn extract_notes(
  html: String,
  ctx: &NoteContext<'_>,
  counters: &mut NoteCounters,
) -> UsfmResult<RenderedUnit> {
  let (html, footnotes_html) =
    extract(html, NoteKind::Footnote, ctx, &mut counters.footnotes)?;
  let (html, xrefs_html) =
    extract(html, NoteKind::CrossReference, ctx, &mut counters.xrefs)?;
  Ok(RenderedUnit {
    html,
    footnotes_html,
    xrefs_html,
  })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Fine in tests")]
mod tests {
  use super::*;
  use crate::{
    collaborators::{BookTable, Lookups, SectionIndex},
    reference::LinkMode,
    types::{BookCode, RefTuple, SegmentKind},
  };

  struct Fixture {
    table:    BookTable,
    sections: SectionIndex,
    book:     BookCode,
    segment:  Segment,
  }

  impl Fixture {
    fn new(kind: SegmentKind) -> Self {
      let book: BookCode = "GEN".parse().unwrap();
      Self {
        table: BookTable::load().unwrap(),
        sections: SectionIndex::default(),
        segment: Segment::new(kind, "BSB", RefTuple::chapter(book.clone(), 1)),
        book,
      }
    }

    fn ctx(&self) -> NoteContext<'_> {
      NoteContext {
        segment:     &self.segment,
        liven:       LivenContext {
          version:   "BSB",
          home_book: &self.book,
          level:     1,
          mode:      LinkMode::for_segment(self.segment.kind, "BSB"),
          lookups:   Lookups::new(&self.table, &self.sections),
        },
        title_limit: 11_500,
        scan_limit:  100,
      }
    }
  }

  #[test]
  fn test_footnote_becomes_caller_and_note() {
    let fixture = Fixture::new(SegmentKind::Chapter);
    let mut counters = NoteCounters::default();
    let html = "<span class=\"v\" id=\"C1V3\">3 </span>light\\f + \\fr 1:3 \
                \\ft Some note.\\f* shone"
      .to_string();
    let unit = extract_notes(html, &fixture.ctx(), &mut counters).unwrap();
    assert_eq!(
      unit.html,
      "<span class=\"v\" id=\"C1V3\">3 </span>light<span \
       class=\"fnCaller\">[<a title=\"Note: Some note.\" \
       href=\"#fn1\">fn</a>]</span> shone"
    );
    assert_eq!(
      unit.footnotes_html,
      "<p class=\"fn\" id=\"fn1\"><span class=\"fnRef\"><a title=\"Go back \
       up to 1:3 in the text\" href=\"#C1V3\">1:3</a></span> <span \
       class=\"ft\">Some note.</span></p>\n"
    );
    assert_eq!(counters.footnotes, 1);
  }

  #[test]
  fn test_numbering_continues_and_orders() {
    let fixture = Fixture::new(SegmentKind::Chapter);
    let mut counters = NoteCounters {
      footnotes: 4,
      xrefs:     0,
    };
    let html = "a\\f + \\ft one\\f* b\\fe + \\ft two\\fe* c\\x - \\xt Gen \
                1:1\\x*"
      .to_string();
    let unit = extract_notes(html, &fixture.ctx(), &mut counters).unwrap();
    assert!(unit.html.contains("href=\"#fn5\""));
    assert!(unit.html.contains("href=\"#fn6\""));
    assert!(unit.html.contains("href=\"#xr1\""));
    let notes = &unit.footnotes_html;
    assert!(notes.find("id=\"fn5\"") < notes.find("id=\"fn6\""));
    assert!(unit.xrefs_html.contains(
      "<a class=\"xrRef\" title=\"GEN 1:1\" \
       href=\"../BSB/byC/GEN_C1.htm#C1V1\">Gen 1:1</a>"
    ));
    assert!(!unit.html.contains('\\'));
  }

  #[test]
  fn test_footnote_styles_and_nested_xref() {
    let fixture = Fixture::new(SegmentKind::Chapter);
    let mut counters = NoteCounters::default();
    let html = "x\\f + \\fq light\\fq* \\ft or \\it glow\\it*; \\x - \\xt Ps \
                27:1\\x*\\f*"
      .to_string();
    let unit = extract_notes(html, &fixture.ctx(), &mut counters).unwrap();
    let note = &unit.footnotes_html;
    assert!(note.contains("<span class=\"fq\">light</span>"), "{note}");
    assert!(
      note.contains("<span class=\"ft\">or <i>glow</i>; </span>"),
      "{note}"
    );
    assert!(
      note.contains("<span class=\"xr\"><span class=\"xt\"><a class=\"xrRef\""),
      "{note}"
    );
    assert!(unit.xrefs_html.is_empty());
    assert!(crate::html_check::check_html("BSB GEN 1", note, true));
  }

  #[test]
  fn test_duplicate_bodies_collapse_in_single_verse_units() {
    let fixture = Fixture::new(SegmentKind::ParallelVerse);
    let mut counters = NoteCounters::default();
    let html = "a\\f + \\ft Same.\\f* b\\f + \\ft Same.\\f*".to_string();
    let unit = extract_notes(html, &fixture.ctx(), &mut counters).unwrap();
    assert!(unit.html.contains("href=\"#fn1\""));
    assert!(unit.html.contains("href=\"#fn2\""));
    assert_eq!(unit.footnotes_html.matches("<p class=\"fn\"").count(), 1);
    assert!(unit.footnotes_html.starts_with(
      "<p class=\"fn\" id=\"fn1\"><span id=\"fn2\"></span>"
    ));

    // Other units show both
    let fixture = Fixture::new(SegmentKind::Chapter);
    let mut counters = NoteCounters::default();
    let html = "a\\f + \\ft Same.\\f* b\\f + \\ft Same.\\f*".to_string();
    let unit = extract_notes(html, &fixture.ctx(), &mut counters).unwrap();
    assert_eq!(unit.footnotes_html.matches("<p class=\"fn\"").count(), 2);
  }

  #[test]
  fn test_unclosed_note_raises() {
    let fixture = Fixture::new(SegmentKind::Chapter);
    let mut counters = NoteCounters::default();
    let err = extract_notes(
      "a\\f + \\ft never closed".to_string(),
      &fixture.ctx(),
      &mut counters,
    )
    .unwrap_err();
    assert!(matches!(err, UsfmError::UnclosedNote { delimiter: "\\f", .. }));
  }

  #[test]
  fn test_scan_limit_raises() {
    let fixture = Fixture::new(SegmentKind::Chapter);
    let mut ctx = fixture.ctx();
    ctx.scan_limit = 2;
    let mut counters = NoteCounters::default();
    let html = "\\f + \\ft 1\\f*\\f + \\ft 2\\f*\\f + \\ft 3\\f*".to_string();
    let err = extract_notes(html, &ctx, &mut counters).unwrap_err();
    assert!(matches!(err, UsfmError::NoteScanLimit { limit: 2, .. }));
  }

  #[test]
  fn test_back_link_falls_back_to_last_verse_anchor() {
    let html = "<span id=\"C2V1\"></span> <span id=\"C2V7\">";
    let mut anchors = VerseAnchors::default();
    assert_eq!(
      back_link_target(None, || anchors.before(html, html.len())),
      Some((2, 7))
    );
    assert_eq!(back_link_target(Some("3.4"), || None), Some((3, 4)));
    assert_eq!(back_link_target(None, || None), None);
  }

  #[test]
  fn test_verse_anchors_scan_forward() {
    let html = "<span id=\"C1V1\">a</span> b <span id=\"C1V2\">c</span> d";
    let mut anchors = VerseAnchors::default();
    assert_eq!(anchors.before(html, 0), None);
    assert_eq!(anchors.before(html, html.find(" b").unwrap()), Some((1, 1)));
    assert_eq!(anchors.before(html, html.find(" b").unwrap()), Some((1, 1)));
    assert_eq!(anchors.before(html, html.len()), Some((1, 2)));
  }

  #[test]
  fn test_each_note_links_back_to_its_own_verse() {
    let fixture = Fixture::new(SegmentKind::Chapter);
    let mut counters = NoteCounters::default();
    let html = "<span id=\"C1V1\"></span>a\\f + \\ft one\\f* \
                <span id=\"C1V2\"></span>b\\f + \\ft two\\f* \
                c\\f + \\ft three\\f*"
      .to_string();
    let unit = extract_notes(html, &fixture.ctx(), &mut counters).unwrap();
    let notes = &unit.footnotes_html;
    let back_links: Vec<_> = notes
      .match_indices("href=\"#C1V")
      .map(|(ix, _)| &notes[ix..ix + 11])
      .collect();
    assert_eq!(back_links, [
      "href=\"#C1V1",
      "href=\"#C1V2",
      "href=\"#C1V2"
    ]);
  }
}
