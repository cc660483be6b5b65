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
  UsfmError,
  UsfmResult,
  VerseRef,
  reference::ParseContext,
  parse_reference,
};

fn book(code: &str) -> BookCode {
  code.parse().unwrap()
}

fn render(
  segment: &Segment,
  entries: &[MarkerEntry],
) -> UsfmResult<RenderedUnit> {
  let table = BookTable::load().unwrap();
  let sections = SectionIndex::default();
  let renderer =
    Renderer::new(Lookups::new(&table, &sections), RenderOptions::default());
  renderer.convert(segment, entries, &mut NoteCounters::default())
}

fn entry(marker: &str, text: &str) -> MarkerEntry {
  MarkerEntry::with_text(marker, text)
}

fn chapter(version: &str, number: u32) -> Segment {
  Segment::new(
    SegmentKind::Chapter,
    version,
    RefTuple::chapter(book("GEN"), number),
  )
  .at_level(1)
}

#[test]
fn test_verse_one_shows_the_chapter_number() {
  let unit = render(&chapter("BSB", 1), &[
    entry("c", "1"),
    entry("v", "1"),
    entry("v~", "In the beginning"),
  ])
  .unwrap();

  let label = unit
    .html
    .find("<span class=\"c\" id=\"C1V1\">")
    .expect("chapter label");
  let text = unit
    .html
    .find("<span class=\"BSB_verseTextChunk\">In the beginning</span>")
    .expect("verse text");
  assert!(label < text);
  assert!(unit.html.contains(">1</a>"));
  assert!(!unit.html.contains("class=\"v\""));
}

#[test]
fn test_footnote_becomes_caller_and_listed_note() {
  let unit = render(&chapter("BSB", 1), &[
    entry("c", "1"),
    MarkerEntry::new("p"),
    entry("v", "3"),
    entry("v~", "there was light\\f + \\fr 1:3 \\ft Some note.\\f*"),
    MarkerEntry::new("¬p"),
  ])
  .unwrap();

  assert!(
    unit
      .html
      .contains("<span class=\"fnCaller\">[<a title=\"Note: Some note.\" \
                 href=\"#fn1\">fn</a>]</span>"),
    "{}",
    unit.html
  );
  assert!(unit.footnotes_html.starts_with("<p class=\"fn\" id=\"fn1\">"));
  assert!(unit.footnotes_html.contains("Some note."));
  assert!(unit.footnotes_html.contains("href=\"#C1V3\""));
  assert!(!unit.html.contains('\\'));
}

#[test]
fn test_reference_resolution() {
  let table = BookTable::load().unwrap();
  let sections = SectionIndex::default();
  let home = book("GEN");
  let ctx = ParseContext {
    version:   "BSB",
    home_book: &home,
    lookups:   Lookups::new(&table, &sections),
  };

  let range = parse_reference("Gen 25:9-10", &ctx, None).unwrap();
  assert_eq!(range.start, VerseRef::new(book("GEN"), 25, Some(9)));
  assert_eq!(range.last(), &VerseRef::new(book("GEN"), 25, Some(10)));

  let range = parse_reference("1 Sam 16:1–1 Ki 2:11", &ctx, None).unwrap();
  assert_eq!(range.start, VerseRef::new(book("SA1"), 16, Some(1)));
  assert_eq!(range.end, Some(VerseRef::new(book("KI1"), 2, Some(11))));
}

#[test]
fn test_basic_mode_keeps_blocks_inline() {
  let segment = chapter("BSB", 1).basic_only(true);
  let unit = render(&segment, &[
    entry("c", "1"),
    entry("s1", "Heading"),
    MarkerEntry::new("p"),
    entry("v~", "Text"),
    MarkerEntry::new("¬p"),
  ])
  .unwrap();

  assert_eq!(
    unit.html,
    "<br> §&nbsp;Heading<br> <span class=\"BSB_verseTextChunk\">Text</span>"
  );
  assert!(!unit.html.contains("<div"));
  assert!(!unit.html.contains("<p"));
}

#[test]
fn test_basic_mode_keeps_footnotes() {
  let segment = chapter("BSB", 1).basic_only(true);
  let unit = render(&segment, &[
    entry("c", "1"),
    entry("s1", "Heading"),
    entry("v~", "Text\\f + \\ft kept\\f*"),
  ])
  .unwrap();
  assert!(unit.html.contains("href=\"#fn1\""));
  assert!(unit.footnotes_html.contains("kept"));
}

#[test]
fn test_skipped_list_level_is_synthesised() {
  let unit = render(&chapter("BSB", 1), &[
    entry("c", "1"),
    MarkerEntry::new("list"),
    entry("li1", "first"),
    entry("li3", "deep"),
    MarkerEntry::new("¬list"),
  ])
  .unwrap();

  assert_eq!(unit.html.matches("<ul>").count(), 3);
  assert_eq!(unit.html.matches("</ul>").count(), 3);
  assert!(
    unit
      .html
      .starts_with("<ul>\n<li>first<ul>\n<ul>\n<li>deep</li>\n</ul>\n</ul>\n"),
    "{}",
    unit.html
  );
}

#[test]
fn test_unknown_marker_raises_except_for_legacy_feeds() {
  let entries = [entry("c", "1"), entry("zzz", "dropped"), entry("v~", "kept")];

  let err = render(&chapter("BSB", 1), &entries).unwrap_err();
  assert!(matches!(
    err,
    UsfmError::UnhandledCase { ref marker, .. } if marker == "zzz"
  ));

  for version in ["ULT", "UST"] {
    let unit = render(&chapter(version, 1), &entries).unwrap();
    assert!(!unit.html.contains("dropped"));
    assert!(unit.html.contains("kept"));
  }
}

#[test]
fn test_structure_errors_raise_only_for_books() {
  let entries = [entry("c", "1"), MarkerEntry::new("¬p")];

  let whole_book =
    Segment::new(SegmentKind::Book, "BSB", RefTuple::book(book("GEN")));
  assert!(matches!(
    render(&whole_book, &entries),
    Err(UsfmError::IntegrityViolation { .. })
  ));
  assert!(render(&chapter("BSB", 1), &entries).is_ok());
}

#[test]
fn test_single_verse_context_is_validated() {
  let verse = Segment::new(
    SegmentKind::ParallelVerse,
    "BSB",
    RefTuple::verse(book("GEN"), 1, 1),
  );
  let entries = [entry("v~", "In the beginning")];

  let verse_in_chapter = verse.clone().with_context(&["chapters", "c"]);
  assert!(render(&verse_in_chapter, &entries).is_ok());
  assert!(matches!(
    render(&verse.with_context(&["chapters", "s1", "p"]), &entries),
    Err(UsfmError::InvalidContext { .. })
  ));
}
