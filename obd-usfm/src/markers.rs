//! Paragraph-level marker vocabulary.
//!
//! Each tag in the tokenised stream is classified once into a [`Marker`]
//! so the converter can dispatch on behaviour instead of comparing strings.
//! Closing tags carry a leading `¬`.
use std::{fmt, str::FromStr};

/// Prefix the upstream parser puts on closing tags.
pub const END_PREFIX: char = '¬';

/// Named container divisions at the top of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
  Headers,
  Intro,
  Periph,
}

impl Container {
  /// CSS class of the generated `<div>`.
  #[must_use]
  pub const fn class(self) -> &'static str {
    match self {
      Self::Headers => "bookHeader",
      Self::Intro => "bookIntro",
      Self::Periph => "periph",
    }
  }

  #[must_use]
  pub const fn tag(self) -> &'static str {
    match self {
      Self::Headers => "headers",
      Self::Intro => "intro",
      Self::Periph => "periph",
    }
  }
}

/// Table cell kind, e.g. `thr2` is a right-aligned header in column 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
  pub header: bool,
  pub right:  bool,
  pub column: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
  /// `c`
  Chapter,
  /// `c#`, drawn implicitly at verse one.
  ChapterDisplay,
  /// `¬c`
  ChapterEnd,
  /// `¬chapters`
  ChaptersEnd,
  /// `v`
  Verse,
  /// `¬v` and `v=`
  VerseIgnored,
  /// `v~` and `p~`
  Text,
  Paragraph { poetry: bool },
  ParagraphEnd,
  Section(u8),
  SectionEnd(u8),
  MajorSection(u8),
  /// `r`, the parallel passage reference under a heading.
  ParallelReference,
  /// `mr`, `sr`, `qa`, `cl`, `cd`
  Heading,
  /// `d`, the descriptive title of a psalm.
  Descriptive,
  /// `sp`
  Speaker,
  /// `rem`
  Remark,
  /// `id`, `usfm`, `ide`, `h`, `toc1`..`toc3`: never displayed.
  BookId,
  /// `mt1`..`mt4`, `mte1`, `mte2`
  Title,
  /// Introduction paragraph styles.
  Intro,
  /// `ib`
  IntroBlank,
  /// `ie`
  IntroEnd,
  Container(Container),
  ContainerEnd(Container),
  List,
  ListEnd,
  ListItem(u8),
  ListItemEnd(u8),
  TableRow,
  TableCell(Cell),
  /// `b`
  Break,
}

/// Returned for any tag outside the known vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMarker(pub String);

impl fmt::Display for UnknownMarker {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Unknown marker '{}'", self.0)
  }
}

impl std::error::Error for UnknownMarker {}

const PROSE_PARAGRAPHS: &[&str] = &[
  "p", "m", "mi", "nb", "pi", "pi1", "pi2", "pi3", "pc", "pr", "pmo", "pm",
  "pmc", "pmr", "cls", "ph", "ph1", "ph2", "ph3",
];
const POETRY_PARAGRAPHS: &[&str] = &[
  "q", "q1", "q2", "q3", "q4", "qr", "qc", "qm", "qm1", "qm2", "qm3", "qd",
];
const INTRO_PARAGRAPHS: &[&str] = &[
  "imt", "imt1", "imt2", "imt3", "imt4", "is", "is1", "is2", "ip", "ipi", "im",
  "imi", "ipq", "imq", "ipr", "iq", "iq1", "iq2", "iq3", "iot", "io", "io1",
  "io2", "io3", "io4", "iex", "ili", "ili1", "ili2", "imte", "imte1", "imte2",
];

/// Splits `tag` into its alphabetic stem and a trailing level digit.
fn stem_and_level(tag: &str) -> (&str, Option<u8>) {
  match tag.char_indices().last() {
    Some((ix, c)) if c.is_ascii_digit() => {
      let level = u8::try_from(c.to_digit(10).unwrap_or(0)).unwrap_or(0);
      (&tag[..ix], Some(level))
    },
    _ => (tag, None),
  }
}

impl Marker {
  /// Whether the marker starts a new block and so ends any open table.
  #[must_use]
  pub const fn is_block(self) -> bool {
    !matches!(
      self,
      Self::Chapter
        | Self::ChapterDisplay
        | Self::Verse
        | Self::VerseIgnored
        | Self::Text
        | Self::TableRow
        | Self::TableCell(_)
        | Self::BookId
    )
  }

  fn parse_end(tag: &str) -> Option<Self> {
    if PROSE_PARAGRAPHS.contains(&tag) || POETRY_PARAGRAPHS.contains(&tag) {
      return Some(Self::ParagraphEnd);
    }
    let marker = match tag {
      "v" => Self::VerseIgnored,
      "c" => Self::ChapterEnd,
      "chapters" => Self::ChaptersEnd,
      "list" => Self::ListEnd,
      "headers" => Self::ContainerEnd(Container::Headers),
      "intro" => Self::ContainerEnd(Container::Intro),
      "periph" => Self::ContainerEnd(Container::Periph),
      _ => {
        return match stem_and_level(tag) {
          ("s", Some(level @ 1..=4)) => Some(Self::SectionEnd(level)),
          ("li", Some(level @ 1..=4)) => Some(Self::ListItemEnd(level)),
          _ => None,
        };
      },
    };
    Some(marker)
  }
}

impl FromStr for Marker {
  type Err = UnknownMarker;

  fn from_str(tag: &str) -> Result<Self, Self::Err> {
    if let Some(end) = tag.strip_prefix(END_PREFIX) {
      return Self::parse_end(end).ok_or_else(|| UnknownMarker(tag.to_string()));
    }
    if PROSE_PARAGRAPHS.contains(&tag) {
      return Ok(Self::Paragraph { poetry: false });
    }
    if POETRY_PARAGRAPHS.contains(&tag) {
      return Ok(Self::Paragraph { poetry: true });
    }
    if INTRO_PARAGRAPHS.contains(&tag) {
      return Ok(Self::Intro);
    }
    let marker = match tag {
      "c" => Self::Chapter,
      "c#" => Self::ChapterDisplay,
      "v" => Self::Verse,
      "v=" => Self::VerseIgnored,
      "v~" | "p~" => Self::Text,
      "r" => Self::ParallelReference,
      "mr" | "sr" | "qa" | "cl" | "cd" => Self::Heading,
      "d" => Self::Descriptive,
      "sp" => Self::Speaker,
      "rem" => Self::Remark,
      "id" | "usfm" | "ide" | "h" | "toc1" | "toc2" | "toc3" | "toca1"
      | "toca2" | "toca3" => Self::BookId,
      "ib" => Self::IntroBlank,
      "ie" => Self::IntroEnd,
      "headers" => Self::Container(Container::Headers),
      "intro" => Self::Container(Container::Intro),
      "periph" => Self::Container(Container::Periph),
      "list" => Self::List,
      "tr" => Self::TableRow,
      "b" => Self::Break,
      _ => {
        return match stem_and_level(tag) {
          ("s", Some(level @ 1..=4)) => Ok(Self::Section(level)),
          ("s", None) => Ok(Self::Section(1)),
          ("ms", Some(level @ 1..=4)) => Ok(Self::MajorSection(level)),
          ("ms", None) => Ok(Self::MajorSection(1)),
          ("mt" | "mte", _) => Ok(Self::Title),
          ("li", Some(level @ 1..=4)) => Ok(Self::ListItem(level)),
          ("li", None) => Ok(Self::ListItem(1)),
          (stem @ ("th" | "thr" | "tc" | "tcr"), Some(column @ 1..=9)) => {
            Ok(Self::TableCell(Cell {
              header: stem.starts_with("th"),
              right: stem.ends_with('r'),
              column,
            }))
          },
          _ => Err(UnknownMarker(tag.to_string())),
        };
      },
    };
    Ok(marker)
  }
}
