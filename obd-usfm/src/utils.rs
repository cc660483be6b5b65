//! Small helpers shared by the converter and the post-passes.
use std::sync::LazyLock;

use regex::Regex;

/// Log target for problems a human should look at but which do not stop
/// the run.
pub const CRITICAL: &str = "obd_usfm::critical";

pub const NARROW_NON_BREAK_SPACE: char = '\u{202F}';

/// Path prefix from a page `level` directories deep back to the site root.
#[must_use]
pub fn root_prefix(level: usize) -> String {
  "../".repeat(level)
}

/// OET, OET-RV and OET-LV share section linking and typography rules.
#[must_use]
pub fn is_oet_family(version: &str) -> bool {
  version.starts_with("OET")
}

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"<[^>]*>").unwrap_or_else(|e| {
    log::error!("Failed to compile TAG_RE regex: {e}");
    never_matching_regex()
  })
});

/// Removes every html tag, keeping the text between them.
#[must_use]
pub fn strip_tags(html: &str) -> String {
  TAG_RE.replace_all(html, "").into_owned()
}

/// Plain text suitable for a `title` attribute.
///
/// Tags are stripped, `"`, `<` and `>` escaped, and the result truncated to
/// `max_chars` characters.
#[must_use]
pub fn sanitise_title(html: &str, max_chars: usize) -> String {
  let plain = strip_tags(html);
  let mut plain = plain.split_whitespace().collect::<Vec<_>>().join(" ");
  if let Some((ix, _)) = plain.char_indices().nth(max_chars) {
    plain.truncate(ix);
    plain.push('…');
  }
  plain
    .replace('"', "&quot;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
}

/// Rewrites the text between html tags with `f`, leaving the tags alone.
///
/// An unterminated `<` is treated as text.
#[must_use]
pub fn map_text_outside_tags(html: &str, f: impl Fn(&str) -> String) -> String {
  let mut out = String::with_capacity(html.len());
  let mut rest = html;
  while let Some(start) = rest.find('<') {
    let Some(len) = rest[start..].find('>') else {
      break;
    };
    out.push_str(&f(&rest[..start]));
    out.push_str(&rest[start..=start + len]);
    rest = &rest[start + len + 1..];
  }
  out.push_str(&f(rest));
  out
}

/// Create a regex that never matches anything.
///
/// Used as a fallback when a static pattern fails to compile, so callers
/// degrade to "no match" instead of panicking.
#[must_use]
#[allow(
  clippy::expect_used,
  reason = "Both patterns are literals that always compile"
)]
pub fn never_matching_regex() -> Regex {
  Regex::new(r"[^\s\S]").unwrap_or_else(|_| {
    Regex::new(r"^\b$").expect("fallback regex must compile")
  })
}
