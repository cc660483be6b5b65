//! Chapter and verse number anchors.
use crate::{
  collaborators::SectionLookup,
  error::{UsfmError, UsfmResult},
  reference::{LinkMode, VerseRef, reference_href},
  types::{Segment, SegmentKind},
  utils::{CRITICAL, NARROW_NON_BREAK_SPACE},
};

/// Renders the number of each `\v` in one unit.
pub(super) struct VerseNumbers<'a> {
  pub segment:        &'a Segment,
  pub single_chapter: bool,
  pub sections:       &'a dyn SectionLookup,
}

impl VerseNumbers<'_> {
  /// Where verse numbers point: the parallel-verse page from book, chapter
  /// and section pages, the chapter page from passages, nowhere from
  /// single-verse pages.
  const fn link_mode(&self) -> Option<LinkMode> {
    match self.segment.kind {
      SegmentKind::Book | SegmentKind::Chapter | SegmentKind::Section => {
        Some(LinkMode::Verse)
      },
      SegmentKind::RelatedPassage | SegmentKind::TopicalPassage => {
        Some(LinkMode::Chapter)
      },
      SegmentKind::ParallelVerse | SegmentKind::InterlinearVerse => None,
    }
  }

  fn number(&self, chapter: u32, verse: u32, label: &str) -> String {
    let target =
      VerseRef::new(self.segment.reference.book.clone(), chapter, Some(verse));
    let href = self.link_mode().and_then(|mode| {
      reference_href(
        &target,
        mode,
        &self.segment.version,
        self.segment.level,
        self.sections,
      )
      .ok()
    });
    match (href, self.link_mode()) {
      (Some(href), Some(LinkMode::Verse)) => format!(
        "<a title=\"View verse in many parallel versions\" \
         href=\"{href}\">{label}</a>"
      ),
      (Some(href), _) => {
        format!("<a title=\"View chapter\" href=\"{href}\">{label}</a>")
      },
      (None, _) => label.to_string(),
    }
  }

  /// Html for the `\v` with number `text` in `chapter`, which is empty for
  /// a simple verse on a single-verse page.
  ///
  /// Verse one doubles as the chapter label except in single-chapter books.
  /// Both ends of a bridge get an anchor.
  pub fn render(
    &self,
    chapter: u32,
    text: &str,
    location: &str,
  ) -> UsfmResult<String> {
    let parse = |number: &str| {
      number.trim().parse::<u32>().map_err(|_| UsfmError::UnhandledCase {
        location: location.to_string(),
        marker:   "v".to_string(),
        detail:   format!("non-numeric verse '{text}'"),
      })
    };

    if let Some((first, last)) = text.split_once('-') {
      let (first, last) = (parse(first)?, parse(last)?);
      if last != first + 1 {
        log::error!(
          target: CRITICAL,
          "Not handling 3+ verse bridge well yet at {location} {chapter}:{text}"
        );
      }
      let start = if first == 1 && !self.single_chapter {
        format!(
          "<span id=\"C{chapter}\"></span><span class=\"c\" \
           id=\"C{chapter}V1\">{}</span>",
          self.number(chapter, 1, &chapter.to_string())
        )
      } else {
        format!(
          "<span class=\"v\" id=\"C{chapter}V{first}\">{}</span>",
          self.number(chapter, first, &format!("{first}-"))
        )
      };
      return Ok(format!(
        "{start}<span class=\"v\" \
         id=\"C{chapter}V{last}\">{}{NARROW_NON_BREAK_SPACE}</span>",
        self.number(chapter, last, &last.to_string())
      ));
    }

    let verse = parse(text)?;
    if self.segment.kind.is_single_verse() {
      return Ok(String::new());
    }
    if verse == 1 && !self.single_chapter {
      Ok(format!(
        "<span id=\"C{chapter}\"></span><span class=\"c\" \
         id=\"C{chapter}V1\">{}{NARROW_NON_BREAK_SPACE}</span>",
        self.number(chapter, 1, &chapter.to_string())
      ))
    } else {
      Ok(format!(
        "<span class=\"v\" \
         id=\"C{chapter}V{verse}\">{}{NARROW_NON_BREAK_SPACE}</span>",
        self.number(chapter, verse, &verse.to_string())
      ))
    }
  }
}
