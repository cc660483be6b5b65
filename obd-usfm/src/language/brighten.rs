//! Grammatical colouring of the SR Greek New Testament.
//!
//! Each Greek word in the rendered verse is matched, in order, with the
//! `ww` extra that carries its Strong's number and morphology, then wrapped
//! in a link classed by role or case.
use crate::{types::MarkerEntry, utils::CRITICAL};

const LEADING_PUNCTUATION: &[char] = &['“', '‘', '˚', '('];
const TRAILING_PUNCTUATION: &[char] =
  &['.', ',', '?', '!', ':', '”', '’', '·', ';', ')', '–', '…'];

/// Strong's number of `οὐ`, shown as a negative.
const STRONG_NEGATIVE: &str = "37560";

/// Colour classes, in the order their keys are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GreekClass {
  Verb,
  Nominative,
  Accusative,
  Genitive,
  Dative,
  Vocative,
  Negative,
}

impl GreekClass {
  #[must_use]
  pub const fn class_name(self) -> &'static str {
    match self {
      Self::Verb => "grkVrb",
      Self::Nominative => "grkNom",
      Self::Accusative => "grkAcc",
      Self::Genitive => "grkGen",
      Self::Dative => "grkDat",
      Self::Vocative => "grkVoc",
      Self::Negative => "grkNeg",
    }
  }

  /// Legend entry naming the colour and what it marks.
  #[must_use]
  pub const fn key_html(self) -> &'static str {
    match self {
      Self::Verb => r#"<span class="grkVrb">khaki</span>:verbs"#,
      Self::Nominative => {
        r#"<span class="grkNom">light-green</span>:nominative/subject"#
      },
      Self::Accusative => {
        r#"<span class="grkAcc">orange</span>:accusative/object"#
      },
      Self::Genitive => {
        r#"<span class="grkGen">pink</span>:genitive/possessor"#
      },
      Self::Dative => {
        r#"<span class="grkDat">cyan</span>:dative/indirect object"#
      },
      Self::Vocative => r#"<span class="grkVoc">magenta</span>:vocative"#,
      Self::Negative => r#"<span class="grkNeg">red</span>:negative"#,
    }
  }

  const fn from_case(case: char) -> Option<Self> {
    match case {
      'N' | 'n' => Some(Self::Nominative),
      'G' | 'g' => Some(Self::Genitive),
      'A' | 'a' => Some(Self::Accusative),
      'D' | 'd' => Some(Self::Dative),
      'V' | 'v' => Some(Self::Vocative),
      _ => None,
    }
  }
}

/// Coloured verse html with the classes it uses, in legend order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Brightened {
  pub html:    String,
  pub classes: Vec<GreekClass>,
}

impl Brightened {
  /// Legend entries for the classes used.
  #[must_use]
  pub fn keys(&self) -> Vec<&'static str> {
    self.classes.iter().map(|class| class.key_html()).collect()
  }
}

/// What a `ww` extra says about one word.
#[derive(Debug, PartialEq, Eq)]
struct WordInfo {
  role:   char,
  /// The seven morphology characters after `Gr,R,`.
  morph:  String,
  /// Strong's number without the `G`.
  strong: String,
}

impl WordInfo {
  /// Parses `lemma="ἀρχή" x-strong="G07460" x-morph="Gr,N,....NFS"`.
  fn parse(attributes: &str) -> Option<Self> {
    let mut morph = None;
    let mut strong = None;
    for chunk in attributes.split(' ') {
      let (name, value) = chunk.split_once('=')?;
      let value = value.trim_matches('"');
      match name.strip_prefix("x-").unwrap_or(name) {
        "morph" => morph = Some(value),
        "strong" => strong = Some(value),
        _ => {},
      }
    }
    let morph = morph?.strip_prefix("Gr,")?;
    let role = morph.chars().next()?;
    let morph = morph.get(2..).filter(|m| m.chars().count() == 7)?;
    let strong = strong?.strip_prefix('G')?;
    Some(Self {
      role,
      morph: morph.to_string(),
      strong: strong.to_string(),
    })
  }

  fn class(&self) -> Option<GreekClass> {
    if self.role == 'V' {
      return Some(GreekClass::Verb);
    }
    if self.strong == STRONG_NEGATIVE {
      return Some(GreekClass::Negative);
    }
    match self.morph.chars().nth(4) {
      Some('.') | None => None,
      Some(case) => {
        let class = GreekClass::from_case(case);
        if class.is_none() {
          log::warn!(
            "Unknown Greek case '{case}' in morphology {}",
            self.morph
          );
        }
        class
      },
    }
  }

  fn link(&self) -> String {
    let number = self
      .strong
      .char_indices()
      .next_back()
      .map_or("", |(ix, _)| &self.strong[..ix]);
    format!("https://BibleHub.com/greek/{number}.htm")
  }
}

/// Byte ranges of the space-separated words in the text parts of `html`.
fn words(html: &str) -> Vec<(usize, usize)> {
  let mut words = Vec::new();
  let mut start = None;
  let mut in_tag = false;
  for (ix, c) in html.char_indices() {
    let boundary = in_tag || c == '<' || c.is_whitespace();
    if boundary {
      if let Some(begin) = start.take() {
        words.push((begin, ix));
      }
    } else if start.is_none() {
      start = Some(ix);
    }
    match c {
      '<' => in_tag = true,
      '>' if in_tag => in_tag = false,
      _ => {},
    }
  }
  if let Some(begin) = start {
    words.push((begin, html.len()));
  }
  words
}

/// Colours the Greek words of one rendered SR-GNT verse.
///
/// `entries` are the verse's marker entries; their `ww` extras are taken in
/// order, one per word. A word that does not match its extra stops the
/// colouring there, leaving the rest of the verse plain.
#[must_use]
pub fn brighten_sr_gnt(
  html: &str,
  entries: &[MarkerEntry],
  location: &str,
) -> Brightened {
  let mut extras = entries
    .iter()
    .flat_map(|entry| &entry.extras)
    .filter(|extra| extra.kind == "ww")
    .map(|extra| extra.text.as_str());

  let mut out = String::with_capacity(html.len() * 3);
  let mut classes = Vec::new();
  let mut copied = 0;

  for (start, end) in words(html) {
    let raw = &html[start..end];
    let word = raw.trim_start_matches(LEADING_PUNCTUATION);
    let word_start = start + raw.len() - word.len();
    let word = word.trim_end_matches(TRAILING_PUNCTUATION);
    if word.is_empty() || !word.chars().all(char::is_alphabetic) {
      continue;
    }

    let Some(extra) = extras.next() else {
      log::error!(
        target: CRITICAL,
        "{location}: ran out of word extras at '{word}'"
      );
      break;
    };
    let info = extra
      .strip_prefix(word)
      .and_then(|rest| rest.strip_prefix('|'))
      .and_then(WordInfo::parse);
    let Some(info) = info else {
      log::error!(
        target: CRITICAL,
        "{location}: word '{word}' does not match extra '{extra}'"
      );
      break;
    };

    let class = info.class();
    let class_attr = class.map_or_else(String::new, |class| {
      format!("class=\"{}\" ", class.class_name())
    });
    if let Some(class) = class
      && !classes.contains(&class)
    {
      classes.push(class);
    }
    let link = format!(
      "<a title=\"{}-{}\" {class_attr}href=\"{}\">{word}</a>",
      info.role,
      info.morph,
      info.link()
    );

    let sacred = html[..word_start].ends_with('˚');
    if sacred {
      out.push_str(&html[copied..word_start - '˚'.len_utf8()]);
      out.push_str(&format!("<b>˚{link}</b>"));
    } else {
      out.push_str(&html[copied..word_start]);
      out.push_str(&link);
    }
    copied = word_start + word.len();
  }
  out.push_str(&html[copied..]);

  classes.sort_unstable();
  Brightened { html: out, classes }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(words: &[&str]) -> MarkerEntry {
    words
      .iter()
      .fold(MarkerEntry::with_text("v~", ""), |entry, word| {
        entry.extra("ww", word)
      })
  }

  const EN: &str =
    r#"Ἐν|lemma="ἐν" x-strong="G17220" x-morph="Gr,P,.......""#;
  const ARCHE: &str =
    r#"ἀρχῇ|lemma="ἀρχή" x-strong="G07460" x-morph="Gr,N,....DFS""#;
  const EN_VERB: &str =
    r#"ἦν|lemma="εἰμί" x-strong="G15100" x-morph="Gr,V,IIA3..S""#;
  const HO: &str =
    r#"ὁ|lemma="ὁ" x-strong="G35880" x-morph="Gr,E,....NMS""#;
  const LOGOS: &str =
    r#"λόγος|lemma="λόγος" x-strong="G30560" x-morph="Gr,N,....NMS""#;

  #[test]
  fn test_colours_words_in_order() {
    let html = "Ἐν ἀρχῇ ἦν ὁ λόγος,";
    let result =
      brighten_sr_gnt(html, &[entry(&[EN, ARCHE, EN_VERB, HO, LOGOS])], "JHN");
    assert!(result.html.starts_with(
      "<a title=\"P-.......\" \
       href=\"https://BibleHub.com/greek/1722.htm\">Ἐν</a> "
    ));
    assert!(result.html.contains(
      "<a title=\"N-....DFS\" class=\"grkDat\" \
       href=\"https://BibleHub.com/greek/0746.htm\">ἀρχῇ</a>"
    ));
    assert!(result.html.contains("class=\"grkVrb\""));
    assert!(result.html.ends_with("λόγος</a>,"));
    assert_eq!(result.classes, vec![
      GreekClass::Verb,
      GreekClass::Nominative,
      GreekClass::Dative,
    ]);
    assert_eq!(result.keys()[0], r#"<span class="grkVrb">khaki</span>:verbs"#);
  }

  #[test]
  fn test_nomina_sacra_and_tags() {
    let theos =
      r#"Θεός|lemma="θεός" x-strong="G23160" x-morph="Gr,N,....NMS""#;
    let html = "<span class=\"v\">1</span>“˚Θεός”<br>";
    let result = brighten_sr_gnt(html, &[entry(&[theos])], "JHN");
    assert_eq!(
      result.html,
      "<span class=\"v\">1</span>“<b>˚<a title=\"N-....NMS\" \
       class=\"grkNom\" href=\"https://BibleHub.com/greek/2316.htm\">Θεός</a>\
       </b>”<br>"
    );
  }

  #[test]
  fn test_negative() {
    let ou = r#"οὐ|lemma="οὐ" x-strong="G37560" x-morph="Gr,D,.......""#;
    let result = brighten_sr_gnt("οὐ", &[entry(&[ou])], "JHN");
    assert_eq!(result.classes, vec![GreekClass::Negative]);
  }

  #[test]
  fn test_mismatch_stops() {
    let html = "Ἐν ἀρχῇ";
    let result = brighten_sr_gnt(html, &[entry(&[EN, LOGOS])], "JHN");
    assert!(result.html.ends_with("</a> ἀρχῇ"));
    assert!(result.classes.is_empty());
  }

  #[test]
  fn test_word_info_parse() {
    let attributes = r#"lemma="ἀρχή" x-strong="G07460" x-morph="Gr,N,....DFS""#;
    assert_eq!(
      WordInfo::parse(attributes),
      Some(WordInfo {
        role:   'N',
        morph:  "....DFS".to_string(),
        strong: "07460".to_string(),
      })
    );
    assert_eq!(WordInfo::parse(r#"x-morph="He,N,....DFS""#), None);
  }
}
