//! Turning references into links.
//!
//! Structured fields (`\xt`, `\r`) are split into pieces and every piece
//! must resolve, or be left as plain text with a warning. Prose is mined
//! heuristically and never fails.
use std::sync::LazyLock;

use regex::Regex;

use super::{
  LinkMode,
  ReferenceRange,
  VerseRef,
  parse::{ParseContext, parse_reference},
  reference_href,
};
use crate::{
  collaborators::Lookups,
  error::ReferenceError,
  types::BookCode,
  utils::{CRITICAL, never_matching_regex},
};

static PROSE_REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"(?:\b[1-3] ?)?\b[A-Z][a-z]+\.? [0-9]{1,3}:[0-9]{1,3}(?:[-–][0-9]{1,3}(?::[0-9]{1,3})?)?",
  )
  .unwrap_or_else(|e| {
    log::error!("Failed to compile PROSE_REFERENCE_RE regex: {e}");
    never_matching_regex()
  })
});

const IOR_OPEN: &str = "<span class=\"ior\">";

/// Where links are being generated.
#[derive(Debug, Clone, Copy)]
pub struct LivenContext<'a> {
  pub version:   &'a str,
  /// Book the text belongs to.
  pub home_book: &'a BookCode,
  /// Directory depth of the page the links land in.
  pub level:     usize,
  pub mode:      LinkMode,
  pub lookups:   Lookups<'a>,
}

impl<'a> LivenContext<'a> {
  #[must_use]
  pub const fn parse_context(&self) -> ParseContext<'a> {
    ParseContext {
      version:   self.version,
      home_book: self.home_book,
      lookups:   self.lookups,
    }
  }

  fn href(&self, target: &VerseRef) -> Result<String, ReferenceError> {
    reference_href(
      target,
      self.mode,
      self.version,
      self.level,
      self.lookups.sections,
    )
  }

  fn link(
    &self,
    text: &str,
    range: &ReferenceRange,
  ) -> Result<String, ReferenceError> {
    let href = self.href(&range.start)?;
    Ok(format!(
      "<a class=\"xrRef\" title=\"{range}\" href=\"{href}\">{text}</a>"
    ))
  }
}

/// Splits `text` after every `;` and `,`, keeping the separators.
fn pieces(text: &str) -> impl Iterator<Item = &str> {
  text.split_inclusive([';', ','])
}

/// Splits a piece into leading space, reference text and trailing
/// separator/space.
fn trim_piece(piece: &str) -> (&str, &str, &str) {
  let core_start = piece.len() - piece.trim_start().len();
  let core_end = piece
    .trim_end_matches(|c: char| c.is_whitespace() || c == ';' || c == ',')
    .len()
    .max(core_start);
  (
    &piece[..core_start],
    &piece[core_start..core_end],
    &piece[core_end..],
  )
}

/// Links every reference in a structured cross-reference field.
///
/// A piece that cannot be resolved stays plain text with a warning, except
/// in section mode where there is no unlinked layout to fall back to.
///
/// # Errors
///
/// Returns the [`ReferenceError`] of the first failing piece in
/// [`LinkMode::Section`].
pub fn liven_xref_field(
  text: &str,
  ctx: &LivenContext<'_>,
) -> Result<String, ReferenceError> {
  let parse_ctx = ctx.parse_context();
  let mut html = String::with_capacity(text.len() * 3);
  let mut last: Option<VerseRef> = None;

  for piece in pieces(text) {
    let (leading, core, trailing) = trim_piece(piece);
    html.push_str(leading);
    let linked = parse_reference(core, &parse_ctx, last.as_ref())
      .and_then(|range| ctx.link(core, &range).map(|link| (link, range)));
    match linked {
      Ok((link, range)) => {
        html.push_str(&link);
        last = Some(range.last().clone());
      },
      Err(ReferenceError::Empty) => html.push_str(core),
      Err(err) if ctx.mode == LinkMode::Section => return Err(err),
      Err(err) => {
        log::warn!(
          "Leaving '{core}' unlinked in {} {}: {err}",
          ctx.version,
          ctx.home_book
        );
        html.push_str(core);
      },
    }
    html.push_str(trailing);
  }
  Ok(html)
}

/// Calls `f` on every stretch of text that is outside tags and outside
/// `<a>` elements, copying everything else through.
fn map_text_outside_links(
  html: &str,
  mut f: impl FnMut(&str) -> String,
) -> String {
  let mut out = String::with_capacity(html.len());
  let mut link_depth = 0usize;
  let mut rest = html;
  while !rest.is_empty() {
    let Some(tag_start) = rest.find('<') else {
      if link_depth == 0 {
        out.push_str(&f(rest));
      } else {
        out.push_str(rest);
      }
      break;
    };
    let text = &rest[..tag_start];
    if link_depth == 0 {
      out.push_str(&f(text));
    } else {
      out.push_str(text);
    }
    let tag_end = rest[tag_start..]
      .find('>')
      .map_or(rest.len(), |ix| tag_start + ix + 1);
    let tag = &rest[tag_start..tag_end];
    if tag.starts_with("<a ") || tag == "<a>" {
      link_depth += 1;
    } else if tag == "</a>" {
      link_depth = link_depth.saturating_sub(1);
    }
    out.push_str(tag);
    rest = &rest[tag_end..];
  }
  out
}

/// Links `Book C:V` shaped references found in free text.
///
/// Text inside tags or existing links is left alone, and anything that does
/// not resolve stays as it was.
#[must_use]
pub fn liven_prose(html: &str, ctx: &LivenContext<'_>) -> String {
  if !html.contains(':') {
    return html.to_string();
  }
  let parse_ctx = ctx.parse_context();
  map_text_outside_links(html, |text| {
    PROSE_REFERENCE_RE
      .replace_all(text, |caps: &regex::Captures| {
        let found = &caps[0];
        let linked = parse_reference(found, &parse_ctx, None)
          .and_then(|range| ctx.link(found, &range));
        linked.unwrap_or_else(|err| {
          log::debug!("Not linking '{found}' in {}: {err}", ctx.version);
          found.to_string()
        })
      })
      .into_owned()
  })
}

/// Links the contents of `<span class="ior">` intro outline references to
/// where they start in the book.
#[must_use]
pub fn liven_intro_outline_refs(html: &str, ctx: &LivenContext<'_>) -> String {
  let parse_ctx = ctx.parse_context();
  // Outline references never name a book
  let home = VerseRef::new(ctx.home_book.clone(), 1, None);
  let mut out = String::with_capacity(html.len());
  let mut rest = html;

  while let Some(ix) = rest.find(IOR_OPEN) {
    let guts_start = ix + IOR_OPEN.len();
    out.push_str(&rest[..guts_start]);
    rest = &rest[guts_start..];
    let Some(guts_len) = rest.find("</span>") else {
      break;
    };
    let guts = &rest[..guts_len];
    let start_text = guts.split(['-', '–']).next().unwrap_or(guts);
    let href = parse_reference(start_text, &parse_ctx, Some(&home))
      .and_then(|range| {
        let mut start = range.start;
        start.verse.get_or_insert(1);
        ctx.href(&start)
      });
    match href {
      Ok(href) => out.push_str(&format!("<a href=\"{href}\">{guts}</a>")),
      Err(err) => {
        log::error!(
          target: CRITICAL,
          "Unable to find intro outline reference '{guts}' in {} {}: {err}",
          ctx.version,
          ctx.home_book
        );
        out.push_str(guts);
      },
    }
    rest = &rest[guts_len..];
  }
  out.push_str(rest);
  out
}
