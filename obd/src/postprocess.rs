//! Per-version html adjustments applied after conversion.
//!
//! Early English, German and Latin texts get a second, easier-to-read line
//! under the original; the OET halves get their readers' tweaks; the SR
//! Greek text is coloured by case with a key paragraph.
use std::sync::LazyLock;

use obd_usfm::{
  LanguageTables,
  MarkerEntry,
  adjust_latin,
  brighten_sr_gnt,
  customise_oet_lv,
  customise_oet_rv,
  utils::{map_text_outside_tags, never_matching_regex},
};
use regex::Regex;

/// Early English versions whose spelling is modernised.
const EARLY_ENGLISH_VERSIONS: &[&str] =
  &["KJB-1769", "KJB-1611", "Bshps", "Gnva", "Cvdl", "TNT", "Wycl"];

/// Of those, the ones that also spell `y` as `j` and `i`.
const PRE_1769_VERSIONS: &[&str] =
  &["KJB-1611", "Bshps", "Gnva", "Cvdl", "TNT", "Wycl"];

const MARGIN: &str = "\u{2003}\u{2003}";

static NOTE_CALLER_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"<span class="(?:fn|xr)Caller">.*?</span>"#).unwrap_or_else(
    |e| {
      log::error!("Failed to compile NOTE_CALLER_RE regex: {e}");
      never_matching_regex()
    },
  )
});

/// Applies the adjustment for `version`, if any, to a rendered body.
///
/// `entries` are the unit's marker entries, needed for the Greek colouring.
/// Without `tables` the early English, German and Latin lines are left out;
/// the OET and SR Greek changes always apply.
#[must_use]
pub fn post_process(
  version: &str,
  html: &str,
  entries: &[MarkerEntry],
  tables: Option<&LanguageTables>,
  location: &str,
) -> String {
  match (version, tables) {
    ("OET-LV", _) => customise_oet_lv(html),
    ("OET-RV", _) => customise_oet_rv(html),
    ("SR-GNT", _) => {
      let brightened = brighten_sr_gnt(html, entries, location);
      if brightened.classes.is_empty() {
        brightened.html
      } else {
        format!(
          "{}\n<p class=\"key\"><b>Key</b>: {}.</p>",
          brightened.html,
          brightened.keys().join(", ")
        )
      }
    },
    ("Luth", Some(tables)) => {
      append_adjusted(version, html, |text| tables.translate_german(text))
    },
    ("ClVg", Some(_)) => {
      append_adjusted(version, html, |text| {
        map_text_outside_tags(text, adjust_latin)
      })
    },
    (_, Some(tables)) if EARLY_ENGLISH_VERSIONS.contains(&version) => {
      append_adjusted(version, html, |text| {
        let modernised = tables.modernise_english_words(text);
        if PRE_1769_VERSIONS.contains(&version) {
          map_text_outside_tags(&modernised, fix_early_letters)
        } else {
          modernised
        }
      })
    },
    _ => html.to_string(),
  }
}

/// `J` for `Y` and `I` for `Y` before vowels, keeping the words where the
/// `J` is real.
fn fix_early_letters(text: &str) -> String {
  text
    .replace('J', "Y")
    .replace("Ie", "Ye")
    .replace("Io", "Yo")
    .replace("Yudge", "Judge")
    .replace("KYB", "KJB")
}

/// Adds the adjusted text as a bracketed line under the original, when the
/// adjustment changed anything. Note callers are left out of the copy.
fn append_adjusted(
  version: &str,
  html: &str,
  adjust: impl Fn(&str) -> String,
) -> String {
  let note_free = NOTE_CALLER_RE.replace_all(html, "");
  let adjusted = adjust(&note_free);
  if adjusted == note_free {
    return html.to_string();
  }
  let adjusted = adjusted
    .replace(
      &format!("class=\"{version}_verseTextChunk\""),
      &format!("class=\"{version}_trans\""),
    )
    .replace("<br>", &format!("<br>{MARGIN}"));
  format!("{html}<br>{MARGIN}({adjusted})")
}
