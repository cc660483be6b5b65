#![allow(
  clippy::expect_used,
  clippy::unwrap_used,
  clippy::panic,
  reason = "Fine in tests"
)]
use obd_usfm::{
  BookCode,
  BookTable,
  Lookups,
  MarkerEntry,
  NoteCounters,
  RefTuple,
  RenderOptions,
  RenderedUnit,
  Renderer,
  SectionIndex,
  Segment,
  SegmentKind,
  convert_character_formatting,
  find_html_problem,
};

struct Site {
  table:    BookTable,
  sections: SectionIndex,
}

impl Site {
  fn new() -> Self {
    let mut sections = SectionIndex::default();
    sections.push("OET-RV", book("GEN"), [1, 1, 1, 31].into());
    sections.push("OET-RV", book("GEN"), [2, 1, 2, 25].into());
    Self {
      table: BookTable::load().unwrap(),
      sections,
    }
  }

  fn renderer(&self) -> Renderer<'_> {
    Renderer::new(
      Lookups::new(&self.table, &self.sections),
      RenderOptions::default(),
    )
  }

  fn render(
    &self,
    segment: &Segment,
    entries: &[MarkerEntry],
  ) -> RenderedUnit {
    self
      .renderer()
      .convert(segment, entries, &mut NoteCounters::default())
      .unwrap_or_else(|err| panic!("{}: {err}", segment.location()))
  }
}

fn book(code: &str) -> BookCode {
  code.parse().unwrap()
}

fn entry(marker: &str, text: &str) -> MarkerEntry {
  MarkerEntry::with_text(marker, text)
}

/// A small but structurally busy chapter.
fn genesis_one() -> Vec<MarkerEntry> {
  vec![
    entry("c", "1"),
    entry("s1", "The Creation"),
    entry("r", "(John 1:1-5; Heb 11:1-3)"),
    MarkerEntry::new("p"),
    entry("v", "1"),
    entry(
      "v~",
      "In the beginning \\nd God\\nd* created the heavens and the \
       earth.\\f + \\fr 1:1 \\ft Or \\it sky\\it*\\f*",
    ),
    entry("v", "2"),
    entry(
      "v~",
      "Now the earth was formless\\x - \\xo 1:2 \\xt Jer 4:23\\x* and void.",
    ),
    MarkerEntry::new("¬p"),
    MarkerEntry::new("q1"),
    entry("v", "3-4"),
    entry("v~", "And God said, \\add Let there be\\add* light."),
    MarkerEntry::new("¬q1"),
    MarkerEntry::new("q2"),
    entry("v~", "and there was light."),
    MarkerEntry::new("¬q2"),
    entry("s2", "The first day"),
    MarkerEntry::new("p"),
    entry("v", "5"),
    entry("v~", "God called the light \\wj day\\wj*.\\f + \\ft Note.\\f*"),
    MarkerEntry::new("¬p"),
    MarkerEntry::new("¬s1"),
    MarkerEntry::new("¬c"),
  ]
}

fn genesis_chapter() -> Segment {
  Segment::new(
    SegmentKind::Chapter,
    "BSB",
    RefTuple::chapter(book("GEN"), 1),
  )
}

fn all_kinds() -> Vec<(Segment, Vec<MarkerEntry>)> {
  let chapter = RefTuple::chapter(book("GEN"), 1);
  let mut units = Vec::new();
  for version in ["BSB", "OET-RV", "WEB"] {
    for kind in [
      SegmentKind::Book,
      SegmentKind::Chapter,
      SegmentKind::Section,
      SegmentKind::RelatedPassage,
    ] {
      // Section pages of the OET need every reference in a section
      if version == "OET-RV" && kind == SegmentKind::Section {
        continue;
      }
      for basic_only in [false, true] {
        let reference = if kind == SegmentKind::Book {
          RefTuple::book(book("GEN"))
        } else {
          chapter.clone()
        };
        units.push((
          Segment::new(kind, version, reference)
            .basic_only(basic_only)
            .at_level(1),
          genesis_one(),
        ));
      }
    }
  }
  units.push((
    Segment::new(
      SegmentKind::ParallelVerse,
      "BSB",
      RefTuple::verse(book("GEN"), 1, 2),
    )
    .with_context(&["chapters", "c"])
    .basic_only(true),
    vec![entry(
      "v~",
      "Now the earth\\f + \\ft Or land\\f* was formless\\x - \\xt Jer \
       4:23\\x*",
    )],
  ));
  units
}

#[test]
fn test_output_tags_balance() {
  let site = Site::new();
  for (segment, entries) in all_kinds() {
    let unit = site.render(&segment, &entries);
    for (part, html) in [
      ("body", &unit.html),
      ("footnotes", &unit.footnotes_html),
      ("cross-references", &unit.xrefs_html),
    ] {
      // Spans are counted too, which the check skips for parallel labels
      let problem = find_html_problem("BSB GEN 1", html, true);
      assert_eq!(problem, None, "{} {part}: {html}", segment.location());
    }
  }
}

#[test]
fn test_no_backslash_leaks() {
  let site = Site::new();
  for (segment, entries) in all_kinds() {
    let unit = site.render(&segment, &entries);
    for html in [&unit.html, &unit.footnotes_html, &unit.xrefs_html] {
      assert!(!html.contains('\\'), "{}: {html}", segment.location());
    }
  }
}

#[test]
fn test_no_doubled_blank_lines_or_trailing_breaks() {
  let site = Site::new();
  for (segment, entries) in all_kinds() {
    let html = site.render(&segment, &entries).html;
    assert!(!html.contains("\n\n"), "{}", segment.location());
    assert!(!html.ends_with('\n'), "{}", segment.location());
    assert!(!html.ends_with("<br>"), "{}", segment.location());
  }
}

#[test]
fn test_bridge_endpoints_anchored_once() {
  let site = Site::new();
  let segment = Segment::new(
    SegmentKind::Chapter,
    "BSB",
    RefTuple::chapter(book("GEN"), 3),
  );
  let unit = site.render(&segment, &[
    entry("c", "3"),
    MarkerEntry::new("p"),
    entry("v", "12-14"),
    entry("v~", "The man said"),
    MarkerEntry::new("¬p"),
  ]);
  assert_eq!(unit.html.matches("id=\"C3V12\"").count(), 1);
  assert_eq!(unit.html.matches("id=\"C3V14\"").count(), 1);
}

#[test]
fn test_footnote_numbering_is_deterministic() {
  let site = Site::new();
  let segment = genesis_chapter();
  let first = site.render(&segment, &genesis_one());
  let second = site.render(&segment, &genesis_one());
  assert_eq!(first, second);

  let one = first.html.find("href=\"#fn1\"").unwrap();
  let two = first.html.find("href=\"#fn2\"").unwrap();
  assert!(one < two);
  assert!(first.footnotes_html.contains("Or <i>sky</i>"));
}

#[test]
fn test_numbering_continues_across_units() {
  let site = Site::new();
  let renderer = site.renderer();
  let segment = genesis_chapter();
  let mut counters = NoteCounters::default();
  renderer
    .convert(&segment, &genesis_one(), &mut counters)
    .unwrap();
  assert_eq!(counters, NoteCounters {
    footnotes: 2,
    xrefs:     1,
  });
  let unit = renderer
    .convert(&segment, &genesis_one(), &mut counters)
    .unwrap();
  assert!(unit.footnotes_html.contains("id=\"fn3\""));
  assert!(unit.xrefs_html.contains("id=\"xr2\""));
}

#[test]
fn test_duplicate_notes_share_one_body() {
  let site = Site::new();
  let segment = Segment::new(
    SegmentKind::ParallelVerse,
    "BSB",
    RefTuple::verse(book("GEN"), 1, 1),
  );
  let unit = site.render(&segment, &[entry(
    "v~",
    "In\\f + \\ft Hebrew idiom.\\f* the beginning\\f + \\ft Hebrew idiom.\\f*",
  )]);

  assert!(unit.html.contains("href=\"#fn1\""));
  assert!(unit.html.contains("href=\"#fn2\""));
  assert_eq!(unit.footnotes_html.matches("<p class=\"fn\"").count(), 1);
  assert_eq!(unit.footnotes_html.matches("id=\"fn1\"").count(), 1);
  assert_eq!(unit.footnotes_html.matches("id=\"fn2\"").count(), 1);
  assert_eq!(unit.footnotes_html.matches("Hebrew idiom.").count(), 1);
}

#[test]
fn test_character_formatting_idempotent_without_markers() {
  for text in [
    "",
    "plain words",
    "already <span class=\"nd\">formatted</span> text",
    "tabs\tand “quotes” and ˚marks",
  ] {
    assert_eq!(
      convert_character_formatting("BSB", "here", text, false).unwrap(),
      text
    );
  }
}

#[test]
fn test_oet_section_pages_link_headings_and_references() {
  let site = Site::new();
  let segment = Segment::new(
    SegmentKind::Section,
    "OET-RV",
    RefTuple::chapter(book("GEN"), 1),
  )
  .at_level(1);
  let unit = site.render(&segment, &[
    entry("c", "1"),
    entry("s1", "The Creation"),
    MarkerEntry::new("p"),
    entry("v", "1"),
    entry("v~", "In the beginning\\x - \\xt Gen 2:4\\x*"),
    MarkerEntry::new("¬p"),
  ]);
  assert!(unit.html.contains("href=\"../OET-RV/bySec/GEN_S0.htm#C1V1\""));
  assert!(unit.xrefs_html.contains("../OET-RV/bySec/GEN_S1.htm#C2V4"));
}

#[test]
fn test_section_mode_cannot_leave_references_unlinked() {
  let site = Site::new();
  let segment = Segment::new(
    SegmentKind::Section,
    "OET-RV",
    RefTuple::chapter(book("GEN"), 1),
  );
  let result = site.renderer().convert(
    &segment,
    &[
      entry("c", "1"),
      MarkerEntry::new("p"),
      entry("v~", "Text\\x - \\xt Exo 3:4\\x*"),
      MarkerEntry::new("¬p"),
    ],
    &mut NoteCounters::default(),
  );
  assert!(result.is_err());
}
