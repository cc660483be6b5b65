//! Quick structural sanity checks on generated html.
//!
//! Not a validator: counts the tags the converter produces and walks them
//! with a stack to catch crossed nesting.
use std::sync::LazyLock;

use regex::Regex;

use crate::utils::never_matching_regex;

static TAG_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"<!--.*?-->|<(/?)([a-zA-Z][a-zA-Z0-9]*)\b[^>]*?(/?)>")
    .unwrap_or_else(|e| {
      log::error!("Failed to compile TAG_NAME_RE regex: {e}");
      never_matching_regex()
    })
});

const VOID_ELEMENTS: &[&str] =
  &["br", "hr", "img", "meta", "link", "input", "wbr", "source", "col"];

const COUNTED: &[&str] =
  &["div", "p", "span", "h1", "h2", "h3", "em", "i", "b", "a", "ul", "li"];

/// Whether span balance is checked for a page labelled `label`.
///
/// The ULT and UST feeds and the parallel pages built from them carry
/// known-unbalanced spans.
fn checks_spans(label: &str) -> bool {
  !["ULT ", "UST ", "Parallel "]
    .iter()
    .any(|feed| label.contains(feed))
}

/// Describes the first problem found in `html`, if any.
///
/// `segment_only` relaxes the `html`/`head`/`body` rule from "exactly once"
/// to "balanced", for fragments that are not whole pages.
#[must_use]
pub fn find_html_problem(
  label: &str,
  html: &str,
  segment_only: bool,
) -> Option<String> {
  for outer in ["html", "head", "body"] {
    let opened = count_open(html, outer);
    let closed = html.matches(&format!("</{outer}>")).count();
    if segment_only {
      if opened != closed {
        return Some(format!(
          "<{outer}> opened {opened} times but closed {closed} times"
        ));
      }
    } else if opened != 1 || closed != 1 {
      return Some(format!(
        "page needs exactly one <{outer}> and </{outer}>, found {opened} and \
         {closed}"
      ));
    }
  }

  let spans = checks_spans(label);
  for name in COUNTED {
    if *name == "span" && !spans {
      continue;
    }
    let opened = count_open(html, name);
    let closed = html.matches(&format!("</{name}>")).count();
    if opened != closed {
      return Some(format!(
        "<{name}> opened {opened} times but closed {closed} times"
      ));
    }
  }

  check_nesting(html, spans)
}

/// Counts `<name` followed by `>`, whitespace or `/`.
fn count_open(html: &str, name: &str) -> usize {
  let needle = format!("<{name}");
  html
    .match_indices(&needle)
    .filter(|(ix, _)| {
      html[ix + needle.len()..]
        .chars()
        .next()
        .is_some_and(|c| c == '>' || c == '/' || c.is_whitespace())
    })
    .count()
}

fn check_nesting(html: &str, spans: bool) -> Option<String> {
  let mut stack: Vec<String> = Vec::new();
  for caps in TAG_NAME_RE.captures_iter(html) {
    let Some(name) = caps.get(2) else {
      // comment
      continue;
    };
    let name = name.as_str().to_ascii_lowercase();
    if VOID_ELEMENTS.contains(&name.as_str())
      || (!spans && name == "span")
      || caps.get(3).is_some_and(|m| !m.as_str().is_empty())
    {
      continue;
    }
    let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
    if !closing {
      stack.push(name);
      continue;
    }
    match stack.pop() {
      Some(open) if open == name => {},
      Some(open) => {
        return Some(format!("</{name}> closes <{open}>"));
      },
      None => return Some(format!("</{name}> with nothing open")),
    }
  }
  stack.last().map(|open| format!("<{open}> never closed"))
}

/// Logs any problem with `html` and returns whether it passed.
#[must_use]
pub fn check_html(label: &str, html: &str, segment_only: bool) -> bool {
  match find_html_problem(label, html, segment_only) {
    Some(problem) => {
      log::error!("Bad html for {label}: {problem}");
      false
    },
    None => true,
  }
}
