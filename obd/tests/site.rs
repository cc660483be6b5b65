#![allow(
  clippy::expect_used,
  clippy::unwrap_used,
  clippy::panic,
  reason = "Fine in tests"
)]
use std::{fs, path::Path};

use obd::render::render_site;
use obd_config::Config;
use obd_usfm::find_html_problem;
use tempfile::tempdir;

const CHAPTER_UNIT: &str = r#"{
  "segment": {
    "kind": "chapter",
    "version": "BSB",
    "reference": {"book": "JHN", "chapter": 3}
  },
  "entries": [
    {"marker": "c", "text": "3"},
    {"marker": "s1", "text": "Jesus and Nicodemus"},
    {"marker": "p"},
    {"marker": "v", "text": "16"},
    {"marker": "v~", "text": "For God so loved the world\\f + \\fr 3:16 \\ft Or only\\f*"},
    {"marker": "¬p"}
  ]
}"#;

const PARALLEL_UNIT: &str = r#"{
  "segment": {
    "kind": "parallelVerse",
    "version": "TNT",
    "reference": {"book": "MAT", "chapter": 8, "verse": 23},
    "basic_only": true
  },
  "entries": [
    {"marker": "v~", "text": "And he entred into a boot"}
  ]
}"#;

fn write_units(dir: &Path) {
  fs::create_dir_all(dir.join("BSB")).expect("Failed to create dir in test");
  fs::write(dir.join("BSB/JHN_C3.json"), CHAPTER_UNIT)
    .expect("Failed to write unit in test");
  fs::write(dir.join("MAT_C8V23.json"), PARALLEL_UNIT)
    .expect("Failed to write unit in test");
}

#[test]
fn test_render_site_writes_pages_and_assets() {
  let temp_dir = tempdir().expect("Failed to create temp dir in test");
  let input = temp_dir.path().join("units");
  let output = temp_dir.path().join("site");
  write_units(&input);

  let config = Config {
    jobs: Some(2),
    ..Config::default()
  };
  let written = render_site(&config, &input, &output).unwrap();
  assert_eq!(written.len(), 2);

  let chapter = fs::read_to_string(output.join("BSB/byC/JHN_C3.htm"))
    .expect("Chapter page missing");
  assert_eq!(find_html_problem("BSB JHN 3", &chapter, false), None);
  assert!(chapter.contains("href=\"../../BibleChapter.css\""));
  assert!(chapter.contains("<div class=\"footnotes\">"));
  assert!(chapter.contains("id=\"fn1\""));

  let parallel = fs::read_to_string(output.join("par/MAT/C8V23.htm"))
    .expect("Parallel page missing");
  assert!(parallel.contains("href=\"../../BibleSite.css\""));
  assert!(parallel.contains("\u{2003}Parallel\u{2003}"));
  assert!(parallel.contains("<span class=\"TNT_trans\">"));
  assert!(parallel.contains("into a boat"));

  for asset in ["BibleSite.css", "BibleChapter.css", "OETChapter.css"] {
    assert!(output.join(asset).is_file(), "{asset} not written");
  }
}

#[test]
fn test_modernise_off_leaves_text_alone() {
  let temp_dir = tempdir().expect("Failed to create temp dir in test");
  let input = temp_dir.path().join("units");
  let output = temp_dir.path().join("site");
  write_units(&input);

  let config = Config {
    modernise: false,
    level: 1,
    ..Config::default()
  };
  render_site(&config, &input, &output).unwrap();

  let parallel = fs::read_to_string(output.join("par/MAT/C8V23.htm"))
    .expect("Parallel page missing");
  assert!(!parallel.contains("into a boat"));
  assert!(parallel.contains("href=\"../../../BibleSite.css\""));
  assert!(!output.join("BibleSite.css").exists());
}

#[test]
fn test_modernise_off_keeps_oet_line_breaks() {
  let temp_dir = tempdir().expect("Failed to create temp dir in test");
  let input = temp_dir.path().join("units");
  fs::create_dir_all(&input).expect("Failed to create dir in test");
  fs::write(
    input.join("OET-LV_JHN_C11.json"),
    r#"{
      "segment": {
        "kind": "chapter",
        "version": "OET-LV",
        "reference": {"book": "JHN", "chapter": 11}
      },
      "entries": [
        {"marker": "c", "text": "11"},
        {"marker": "p"},
        {"marker": "v", "text": "35"},
        {"marker": "v~", "text": "Yaʸsous wept. Then"},
        {"marker": "¬p"}
      ]
    }"#,
  )
  .expect("Failed to write unit in test");

  let config = Config {
    modernise: false,
    ..Config::default()
  };
  let output = temp_dir.path().join("site");
  render_site(&config, &input, &output).unwrap();

  let page = fs::read_to_string(output.join("OET-LV/byC/JHN_C11.htm"))
    .expect("Chapter page missing");
  assert!(page.contains("wept.<br>"));
  assert!(page.contains("href=\"../../OETChapter.css\""));
}

#[test]
fn test_bad_unit_names_its_file() {
  let temp_dir = tempdir().expect("Failed to create temp dir in test");
  let input = temp_dir.path().join("units");
  fs::create_dir_all(&input).expect("Failed to create dir in test");
  fs::write(
    input.join("bad.json"),
    r#"{
      "segment": {
        "kind": "chapter",
        "version": "BSB",
        "reference": {"book": "GEN", "chapter": 1}
      },
      "entries": [{"marker": "zzz", "text": "?"}]
    }"#,
  )
  .expect("Failed to write unit in test");

  let err = render_site(
    &Config::default(),
    &input,
    &temp_dir.path().join("site"),
  )
  .unwrap_err();
  assert!(format!("{err:?}").contains("bad.json"));
}

#[test]
fn test_empty_input_renders_nothing() {
  let temp_dir = tempdir().expect("Failed to create temp dir in test");
  let written = render_site(
    &Config::default(),
    temp_dir.path(),
    &temp_dir.path().join("site"),
  )
  .unwrap();
  assert!(written.is_empty());
}
