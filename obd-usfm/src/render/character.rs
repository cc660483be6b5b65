//! Inline character formatting.
//!
//! Turns paired USFM character markers (`\add ...\add*`, `\nd ...\nd*`,
//! `\w word|attrs\w*`, ...) inside one text field into html. Footnote and
//! cross-reference regions are copied through untouched for the notes pass.
use crate::{
  error::{UsfmError, UsfmResult},
  utils::sanitise_title,
};

/// Styles whose open and close counts must agree before formatting.
const PAIRED_STYLES: &[&str] = &["add", "em", "it", "bd", "bdit"];

/// Character styles rendered as `<span class="{marker}">`.
const SPAN_STYLES: &[&str] = &[
  "add", "ca", "va", "sup", "sc", "no", "png", "tl", "sls", "sig", "qt", "bk",
  "wj", "nd", "ord", "pn", "pro", "rq", "ior", "iqt", "qs", "qac", "k", "dc",
  "addpn", "lik", "liv", "litl", "fig",
];

/// Opening and closing html for a character style, if it is one.
pub(crate) fn style_tags(marker: &str) -> Option<(String, &'static str)> {
  match marker {
    "bdit" => Some(("<b><i>".to_string(), "</i></b>")),
    "bd" => Some(("<b>".to_string(), "</b>")),
    "it" => Some(("<i>".to_string(), "</i>")),
    "em" => Some(("<em>".to_string(), "</em>")),
    _ if SPAN_STYLES.contains(&marker) => {
      Some((format!("<span class=\"{marker}\">"), "</span>"))
    },
    _ => None,
  }
}

/// Counts `\{style} ` and `\+{style} ` against `\{style}*` and `\+{style}*`.
fn style_balance(text: &str, style: &str) -> (usize, usize) {
  let opened = text.matches(&format!("\\{style} ")).count()
    + text.matches(&format!("\\+{style} ")).count();
  let closed = text.matches(&format!("\\{style}*")).count()
    + text.matches(&format!("\\+{style}*")).count();
  (opened, closed)
}

/// One backslash marker found in the text.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct RawMarker<'a> {
  pub name:    &'a str,
  pub closing: bool,
  /// Byte length of the whole marker, including a trailing space after an
  /// opener.
  pub len:     usize,
}

/// Reads the marker that starts at `text[0]`, which must be a backslash.
pub(crate) fn read_marker(text: &str) -> Option<RawMarker<'_>> {
  let body = text.strip_prefix('\\')?;
  let nested = usize::from(body.starts_with('+'));
  let name_start = 1 + nested;
  let name_len = text[name_start..]
    .find(|c: char| !c.is_ascii_alphanumeric())
    .unwrap_or(text.len() - name_start);
  if name_len == 0 {
    return None;
  }
  let name = &text[name_start..name_start + name_len];
  let mut len = name_start + name_len;
  let closing = text[len..].starts_with('*');
  if closing {
    len += 1;
  } else if text[len..].starts_with(' ') {
    len += 1;
  }
  Some(RawMarker { name, closing, len })
}

/// Byte offset just past the closer of the note region starting at
/// `text[0]`, if there is one.
pub(crate) fn note_region_end(text: &str, marker: &str) -> Option<usize> {
  let closer = format!("\\{marker}*");
  text.find(&closer).map(|ix| ix + closer.len())
}

/// Splits `word|key="value" ...` into the word and escaped attributes.
fn split_attributes(content: &str) -> (&str, Option<String>) {
  match content.split_once('|') {
    Some((word, attrs)) if !attrs.trim().is_empty() => {
      (word, Some(sanitise_title(attrs.trim(), usize::MAX)))
    },
    Some((word, _)) => (word, None),
    None => (content, None),
  }
}

/// Value of `key="..."` inside a `|` attribute list.
fn attribute<'a>(attrs: &'a str, key: &str) -> Option<&'a str> {
  let start = attrs.find(&format!("{key}=\""))? + key.len() + 2;
  let len = attrs[start..].find('"')?;
  Some(&attrs[start..start + len])
}

/// Renders a `\w`, `\fig` or `\jmp` span whose content includes attributes.
fn attributed_span(name: &str, content: &str) -> String {
  match name {
    "jmp" => {
      let href = content
        .split_once('|')
        .and_then(|(_, attrs)| attribute(attrs, "link-href"));
      let (text, _) = split_attributes(content);
      match href {
        Some(href) => format!("<a href=\"{href}\">{text}</a>"),
        None => format!("<span class=\"jmp\">{text}</span>"),
      }
    },
    _ => {
      let (word, title) = split_attributes(content);
      match title {
        Some(title) => {
          format!("<span class=\"{name}\" title=\"{title}\">{word}</span>")
        },
        None => format!("<span class=\"{name}\">{word}</span>"),
      }
    },
  }
}

/// Converts the character markers in `text` to html.
///
/// Text without a backslash is returned unchanged. `tolerated` versions get
/// warnings instead of errors for unbalanced styles and unknown markers.
///
/// # Errors
///
/// Returns [`UsfmError::UnbalancedCharacterStyle`] when a paired style is
/// opened and closed a different number of times, and
/// [`UsfmError::UnhandledCase`] for an unknown character marker.
pub fn convert_character_formatting(
  version: &str,
  location: &str,
  text: &str,
  tolerated: bool,
) -> UsfmResult<String> {
  if !text.contains('\\') {
    return Ok(text.to_string());
  }

  for style in PAIRED_STYLES {
    let (opened, closed) = style_balance(text, style);
    if opened != closed {
      if tolerated {
        log::warn!(
          "Unbalanced '\\{style}' in {location}: {opened} opened, {closed} \
           closed"
        );
      } else {
        return Err(UsfmError::UnbalancedCharacterStyle {
          location: location.to_string(),
          style,
          opened,
          closed,
        });
      }
    }
  }

  let stripped;
  let text = if version == "NET" {
    // NET \w wrappers only hold the English word
    stripped = text.replace("\\w ", "").replace("\\w*", "");
    stripped.as_str()
  } else {
    text
  };

  let mut html = String::with_capacity(text.len() + text.len() / 4);
  let mut open: Vec<(&str, &'static str)> = Vec::new();
  let mut rest = text;
  while let Some(ix) = rest.find('\\') {
    html.push_str(&rest[..ix]);
    rest = &rest[ix..];
    let Some(raw) = read_marker(rest) else {
      // Lone backslash: leave it for the left-over check
      html.push('\\');
      rest = &rest[1..];
      continue;
    };

    match (raw.name, raw.closing) {
      ("f" | "fe" | "x", false) => {
        let end = note_region_end(rest, raw.name).unwrap_or(rest.len());
        html.push_str(&rest[..end]);
        rest = &rest[end..];
        continue;
      },
      (name @ ("w" | "fig" | "jmp"), false) => {
        let after = &rest[raw.len..];
        let closer = format!("\\{name}*");
        let nested_closer = format!("\\+{name}*");
        let close = after.find(&closer).map(|ix| (ix, closer.len())).or_else(
          || after.find(&nested_closer).map(|ix| (ix, nested_closer.len())),
        );
        if let Some((content_len, closer_len)) = close {
          html.push_str(&attributed_span(name, &after[..content_len]));
          rest = &after[content_len + closer_len..];
          continue;
        }
        log::warn!("Unclosed '\\{name}' in {location}");
        rest = after;
        continue;
      },
      (name, false) => {
        if let Some((opening, closing)) = style_tags(name) {
          html.push_str(&opening);
          open.push((raw.name, closing));
        } else if tolerated {
          log::warn!(
            "Dropping unknown character marker '\\{name}' in {location}"
          );
        } else {
          return Err(UsfmError::UnhandledCase {
            location: location.to_string(),
            marker:   format!("\\{name}"),
            detail:   "unknown character marker".to_string(),
          });
        }
      },
      (name, true) => {
        match open.iter().rposition(|(opened, _)| *opened == name) {
          Some(depth) => {
            if depth + 1 != open.len() {
              log::warn!("Crossed '\\{name}*' in {location}");
            }
            for (_, closing) in open.drain(depth..).rev() {
              html.push_str(closing);
            }
          },
          None => {
            log::warn!("Dropping unopened '\\{name}*' in {location}");
          },
        }
      },
    }
    rest = &rest[raw.len..];
  }
  html.push_str(rest);

  for (name, closing) in open.drain(..).rev() {
    log::warn!("Closing '\\{name}' left open in {location}");
    html.push_str(closing);
  }
  Ok(html)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Fine in tests")]
mod tests {
  use super::*;

  fn format(text: &str) -> String {
    convert_character_formatting("BSB", "BSB GEN 1:1", text, false).unwrap()
  }

  #[test]
  fn test_plain_text_unchanged() {
    let text = "In the beginning <b>already html</b> & more";
    assert_eq!(format(text), text);
  }

  #[test]
  fn test_basic_styles() {
    assert_eq!(
      format("the \\nd Lord\\nd* said \\add to them\\add*"),
      "the <span class=\"nd\">Lord</span> said <span class=\"add\">to \
       them</span>"
    );
    assert_eq!(format("\\bdit x\\bdit*"), "<b><i>x</i></b>");
    assert_eq!(format("\\it x\\it* \\em y\\em*"), "<i>x</i> <em>y</em>");
  }

  #[test]
  fn test_nested_plus_markers() {
    assert_eq!(
      format("\\wj Go \\+nd Lord\\+nd*\\wj*"),
      "<span class=\"wj\">Go <span class=\"nd\">Lord</span></span>"
    );
  }

  #[test]
  fn test_word_attributes() {
    assert_eq!(
      format("\\w beginning|strong=\"H7225\"\\w*"),
      "<span class=\"w\" title=\"strong=&quot;H7225&quot;\">beginning</span>"
    );
    assert_eq!(format("\\w plain\\w*"), "<span class=\"w\">plain</span>");
  }

  #[test]
  fn test_jmp_link() {
    assert_eq!(
      format("\\jmp here|link-href=\"https://example.org\"\\jmp*"),
      "<a href=\"https://example.org\">here</a>"
    );
    assert_eq!(format("\\jmp here\\jmp*"), "<span class=\"jmp\">here</span>");
  }

  #[test]
  fn test_net_drops_word_wrappers() {
    let html =
      convert_character_formatting("NET", "NET GEN 1:1", "\\w God\\w*", false)
        .unwrap();
    assert_eq!(html, "God");
  }

  #[test]
  fn test_note_regions_untouched() {
    let text =
      "word\\f + \\ft a \\it note\\it*\\f* more \\x - \\xt Gen 1:1\\x*";
    assert_eq!(format(text), text);
  }

  #[test]
  fn test_unbalanced_paired_style() {
    let err = convert_character_formatting("BSB", "here", "\\add x", false)
      .unwrap_err();
    assert!(matches!(
      err,
      UsfmError::UnbalancedCharacterStyle {
        style: "add",
        opened: 1,
        closed: 0,
        ..
      }
    ));
    // Tolerated feeds force-close instead
    let html =
      convert_character_formatting("UST", "here", "\\add x", true).unwrap();
    assert_eq!(html, "<span class=\"add\">x</span>");
  }

  #[test]
  fn test_unknown_marker() {
    let err = convert_character_formatting("BSB", "here", "\\zz x\\zz*", false)
      .unwrap_err();
    assert!(matches!(err, UsfmError::UnhandledCase { .. }));
    let html =
      convert_character_formatting("ULT", "here", "\\zz x\\zz*", true).unwrap();
    assert_eq!(html, "x");
  }

  #[test]
  fn test_idempotent_on_output() {
    let once = format("\\nd Lord\\nd* of \\bd hosts\\bd*");
    assert_eq!(format(&once), once);
  }

  #[test]
  fn test_read_marker() {
    assert_eq!(
      read_marker("\\+nd Lord"),
      Some(RawMarker {
        name:    "nd",
        closing: false,
        len:     5,
      })
    );
    assert_eq!(
      read_marker("\\f*"),
      Some(RawMarker {
        name:    "f",
        closing: true,
        len:     3,
      })
    );
    assert_eq!(read_marker("\\ "), None);
  }
}
