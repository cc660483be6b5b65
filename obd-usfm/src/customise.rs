//! Html adjustments for the two halves of the Open English Translation.
use crate::utils::map_text_outside_tags;

/// Marks that open an OET-LV added-word span, with the class each becomes.
const ADDED_WORD_CLASSES: &[(char, &str)] = &[
  ('+', "addArticle"),
  ('=', "addCopula"),
  ('~', "addDirectObject"),
  ('>', "addExtra"),
  ('^', "addOwner"),
];

const ADD_SPAN: &str = "<span class=\"add\">";

/// Readers' tweaks for the literal version.
///
/// - each sentence ends a line: `<br>` after `.`, `?`, `!` and `:`
/// - an added-word span starting with `+ = ~ > ^` (`>` as `&gt;`) gets the
///   matching `add*` class and loses the mark
/// - `_` joining glossed words is underlined
///
/// Only text is touched, never attributes.
#[must_use]
pub fn customise_oet_lv(html: &str) -> String {
  let html =
    html.replace(&format!("{ADD_SPAN}&gt;"), &format!("{ADD_SPAN}>"));
  let mut out = String::with_capacity(html.len() + html.len() / 4);
  let mut rest = html.as_str();
  while let Some(ix) = rest.find(ADD_SPAN) {
    out.push_str(&rest[..ix]);
    let after = &rest[ix + ADD_SPAN.len()..];
    let class = after.chars().next().and_then(|mark| {
      ADDED_WORD_CLASSES
        .iter()
        .find(|(m, _)| *m == mark)
        .map(|(m, class)| (m.len_utf8(), class))
    });
    match class {
      Some((mark_len, class)) => {
        out.push_str(&format!("<span class=\"{class}\">"));
        rest = &after[mark_len..];
      },
      None => {
        out.push_str(ADD_SPAN);
        rest = after;
      },
    }
  }
  out.push_str(rest);

  map_text_outside_tags(&out, |text| {
    let mut text = text.to_string();
    for stop in ['.', '?', '!', ':'] {
      text = text.replace(stop, &format!("{stop}<br>"));
    }
    text.replace('_', "<span class=\"ul\">_</span>")
  })
}

/// Readers' tweaks for the readers' version: runs of spaces left by
/// removed markers collapse, and no space is left before a closing `</p>`.
#[must_use]
pub fn customise_oet_rv(html: &str) -> String {
  let html = map_text_outside_tags(html, |text| {
    let mut text = text.to_string();
    while text.contains("  ") {
      text = text.replace("  ", " ");
    }
    text
  });
  html.replace(" </p>", "</p>")
}
