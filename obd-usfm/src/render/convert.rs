//! The per-marker dispatch of [`Renderer::convert`](super::Renderer).
use std::sync::LazyLock;

use regex::Regex;

use super::{
  Renderer,
  character::{convert_character_formatting, read_marker},
  state::RenderState,
  verse::VerseNumbers,
};
use crate::{
  error::{UsfmError, UsfmResult, snippet},
  html_check::{check_html, find_html_problem},
  markers::{Cell, Container, Marker},
  notes::{NoteContext, extract_notes},
  reference::{
    LinkMode,
    LivenContext,
    VerseRef,
    liven_intro_outline_refs,
    liven_prose,
    liven_xref_field,
    reference_href,
  },
  types::{MarkerEntry, NoteCounters, RenderedUnit, Segment},
  utils::{CRITICAL, is_oet_family, never_matching_regex},
};

static NOMINA_SACRA_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"˚(\w+)").unwrap_or_else(|e| {
    log::error!("Failed to compile NOMINA_SACRA_RE regex: {e}");
    never_matching_regex()
  })
});

/// One run of the converter over one unit.
pub(super) struct Conversion<'r, 'a> {
  renderer:  &'r Renderer<'a>,
  segment:   &'r Segment,
  location:  String,
  tolerated: bool,
  oet:       bool,
  liven:     LivenContext<'r>,
  verses:    VerseNumbers<'r>,
  state:     RenderState,
}

impl<'r, 'a> Conversion<'r, 'a> {
  pub fn new(renderer: &'r Renderer<'a>, segment: &'r Segment) -> Self {
    let lookups = renderer.lookups();
    let book = &segment.reference.book;
    Self {
      renderer,
      segment,
      location: segment.location(),
      tolerated: renderer.options().is_tolerated(&segment.version),
      oet: is_oet_family(&segment.version),
      liven: LivenContext {
        version: &segment.version,
        home_book: book,
        level: segment.level,
        mode: LinkMode::for_segment(segment.kind, &segment.version),
        lookups,
      },
      verses: VerseNumbers {
        segment,
        single_chapter: lookups.versification.is_single_chapter_book(book),
        sections: lookups.sections,
      },
      state: RenderState::new(segment.basic_only, segment.reference.chapter),
    }
  }

  pub fn run(
    mut self,
    entries: &[MarkerEntry],
    counters: &mut NoteCounters,
  ) -> UsfmResult<RenderedUnit> {
    self.open_context()?;
    for (ix, entry) in entries.iter().enumerate() {
      log::trace!("{} {}: {:?}", self.location, entry.marker, entry.text);
      let marker = match entry.marker.parse::<Marker>() {
        Ok(marker) => marker,
        Err(err) if self.tolerated => {
          log::warn!("{err} in {}, dropping its text", self.location);
          continue;
        },
        Err(err) => {
          return Err(UsfmError::UnhandledCase {
            location: self.location.clone(),
            marker:   entry.marker.clone(),
            detail:   err.to_string(),
          });
        },
      };
      if marker.is_block() {
        self.state.close_table();
      }
      self.dispatch(marker, entry, &entries[ix + 1..])?;
    }
    self.finish(counters)
  }

  const fn basic_only(&self) -> bool {
    self.segment.basic_only
  }

  fn unhandled(&self, marker: &str, detail: impl Into<String>) -> UsfmError {
    UsfmError::UnhandledCase {
      location: self.location.clone(),
      marker:   marker.to_string(),
      detail:   detail.into(),
    }
  }

  /// Raises a structural problem in whole-book units, warns otherwise.
  fn violation(&self, detail: impl Into<String>) -> UsfmResult<()> {
    let detail = detail.into();
    if self.segment.kind.is_strict() {
      return Err(UsfmError::IntegrityViolation {
        location: self.location.clone(),
        detail,
      });
    }
    log::warn!("{detail} in {}", self.location);
    Ok(())
  }

  /// Reports a block still open when the entries ran out.
  fn leftover(&self, what: &str) {
    if self.segment.kind.is_strict() {
      log::error!(
        target: CRITICAL,
        "Closing {what} left open at the end of {}",
        self.location
      );
    } else {
      log::warn!("Closing {what} left open at the end of {}", self.location);
    }
  }

  /// Closes an open paragraph before a block that cannot sit inside one.
  fn end_paragraph_for(&mut self, what: &str) -> UsfmResult<()> {
    if let Some(open) = &self.state.paragraph {
      self.violation(format!("{what} inside the open '{open}' paragraph"))?;
      self.state.close_paragraph();
    }
    Ok(())
  }

  fn open_context(&mut self) -> UsfmResult<()> {
    let segment = self.segment;
    let single_verse = segment.kind.is_single_verse();
    for tag in &segment.context {
      match tag.as_str() {
        "chapters" | "c" | "c#" => {},
        _ if single_verse => return Err(self.invalid_context()),
        "s1" => {
          self.state.push_structure("<div class=\"s1\">\n");
          self.state.section = true;
        },
        "list" => self.state.open_list(),
        _ => {
          match tag.parse::<Marker>() {
            Ok(Marker::Paragraph { .. }) => {
              if !self.basic_only() {
                self.state.push(&format!("<p class=\"{tag}\">"));
                self.state.paragraph = Some(tag.clone());
              }
            },
            Ok(Marker::Container(container)) => {
              self.state.close_container();
              self.state.push_structure(&format!(
                "<div class=\"{}\">\n",
                container.class()
              ));
              self.state.container = Some(container);
            },
            _ => return Err(self.invalid_context()),
          }
        },
      }
    }
    Ok(())
  }

  fn invalid_context(&self) -> UsfmError {
    UsfmError::InvalidContext {
      location: self.location.clone(),
      context:  self.segment.context.clone(),
    }
  }

  /// Entry text with version-specific typography applied.
  fn text(&self, entry: &MarkerEntry) -> Option<String> {
    entry.text().map(|text| {
      if self.oet {
        text.replace('\'', "’")
      } else {
        text.to_string()
      }
    })
  }

  /// Character formatting plus the OET nomina sacra spans.
  fn format(&self, text: &str) -> UsfmResult<String> {
    let html = convert_character_formatting(
      &self.segment.version,
      &self.location,
      text,
      self.tolerated,
    )?;
    if self.oet && html.contains('˚') {
      return Ok(
        NOMINA_SACRA_RE
          .replace_all(&html, "<span class=\"nominaSacra\">$1</span>")
          .into_owned(),
      );
    }
    Ok(html)
  }

  /// Formatted text of `entry`, or an empty string with a warning.
  fn formatted_or_empty(&self, entry: &MarkerEntry) -> UsfmResult<String> {
    match self.text(entry) {
      Some(text) => self.format(&text),
      None => {
        log::warn!("Missing '{}' text in {}", entry.marker, self.location);
        Ok(String::new())
      },
    }
  }

  fn liven_field(&self, text: &str) -> UsfmResult<String> {
    liven_xref_field(text, &self.liven).map_err(|source| {
      UsfmError::Reference {
        location: self.location.clone(),
        source,
      }
    })
  }

  /// Heading rendering in basic mode.
  fn push_basic_heading(&mut self, heading: &str) {
    self.state.push(&format!("<br> §&nbsp;{heading}"));
    self.state.after_heading = true;
  }

  fn dispatch(
    &mut self,
    marker: Marker,
    entry: &MarkerEntry,
    following: &[MarkerEntry],
  ) -> UsfmResult<()> {
    let tag = entry.marker.as_str();
    match marker {
      Marker::Chapter => {
        let text = entry.text().unwrap_or_default();
        let chapter = text.trim().parse().map_err(|_| {
          self.unhandled(tag, format!("non-numeric chapter '{text}'"))
        })?;
        self.state.chapter = Some(chapter);
      },
      Marker::ChapterDisplay | Marker::VerseIgnored | Marker::BookId => {},
      Marker::ChapterEnd | Marker::ChaptersEnd => {
        if self.state.close_section() {
          log::error!(
            target: CRITICAL,
            "Finished chapter inside a section in {}",
            self.location
          );
        }
        if self.state.close_paragraph() {
          log::error!(
            target: CRITICAL,
            "Finished chapter inside a paragraph in {}",
            self.location
          );
        }
      },
      Marker::Verse => self.verse(entry)?,
      Marker::Text => {
        let Some(text) = self.text(entry) else {
          log::warn!("Missing verse text in {}", self.location);
          return Ok(());
        };
        let html = self.format(&text)?;
        self.state.push(&format!(
          "<span class=\"{}_verseTextChunk\">{html}</span>",
          self.segment.version
        ));
        self.state.after_heading = false;
      },
      Marker::Paragraph { poetry } => self.paragraph(tag, poetry)?,
      Marker::ParagraphEnd => {
        if self.basic_only() {
          return Ok(());
        }
        match &self.state.paragraph {
          None => self.violation(format!("'{tag}' closes no paragraph"))?,
          Some(open) if Some(open.as_str()) != tag.strip_prefix('¬') => {
            log::warn!("'{tag}' closes '{open}' in {}", self.location);
          },
          Some(_) => {},
        }
        self.state.close_paragraph();
      },
      Marker::Section(level) => self.section(level, entry, following)?,
      Marker::SectionEnd(level) => {
        if level != 1 {
          return Ok(());
        }
        if !self.state.section {
          return self.violation("'¬s1' closes no section");
        }
        if self.state.close_paragraph() {
          log::warn!("'¬s1' closed a paragraph in {}", self.location);
        }
        self.state.close_lists();
        self.state.close_section();
      },
      Marker::MajorSection(level) => {
        self.state.close_right_box();
        self.end_paragraph_for("Major section heading")?;
        self.state.close_speaker();
        if self.state.section {
          self.violation("Major section heading inside an open section")?;
          self.state.close_section();
        }
        let heading = self.formatted_or_empty(entry)?;
        if self.basic_only() {
          self.push_basic_heading(&heading);
        } else {
          self
            .state
            .push(&format!("<p class=\"ms{level}\">{heading}</p>\n"));
        }
      },
      Marker::ParallelReference => self.parallel_reference(entry)?,
      Marker::Heading => {
        self.state.close_right_box();
        self.end_paragraph_for("Heading")?;
        let heading = self.formatted_or_empty(entry)?;
        if !self.basic_only() {
          self.state.push(&format!("<p class=\"{tag}\">{heading}</p>\n"));
        } else if matches!(tag, "mr" | "sr") {
          self.push_basic_heading(&heading);
        }
      },
      Marker::Descriptive => {
        self.state.close_right_box();
        let html = self.formatted_or_empty(entry)?;
        if self.basic_only() {
          if !self.state.html.is_empty() {
            self.state.push(" ");
          }
          self.state.push(&format!("<span class=\"d\">{html}</span>"));
          self.state.after_heading = false;
        } else {
          self.end_paragraph_for("Descriptive title")?;
          self.state.push(&format!("<p class=\"d\">{html}</p>\n"));
        }
      },
      Marker::Speaker => {
        self.state.close_right_box();
        if self.basic_only() {
          return Ok(());
        }
        self.end_paragraph_for("Speaker")?;
        self.state.close_speaker();
        let html = self.formatted_or_empty(entry)?;
        self
          .state
          .push(&format!("<div class=\"sp\"><p class=\"sp\">{html}</p>\n"));
        self.state.speaker = true;
      },
      Marker::Remark => {
        self.state.close_right_box();
        if self.basic_only() {
          return Ok(());
        }
        let html = self.formatted_or_empty(entry)?;
        if self.state.paragraph.is_some() {
          self.state.push(&format!("<span class=\"rem\">{html}</span>"));
        } else {
          self.state.push(&format!("<p class=\"rem\">{html}</p>\n"));
        }
      },
      Marker::Title => {
        if self.basic_only() {
          return Ok(());
        }
        self.state.close_paragraph();
        let html = self.formatted_or_empty(entry)?;
        self.state.push(&format!("<p class=\"{tag}\">{html}</p>\n"));
      },
      Marker::Intro => {
        self.state.close_paragraph();
        let html = self.formatted_or_empty(entry)?;
        let html = if tag.starts_with("io") {
          liven_intro_outline_refs(&html, &self.liven)
        } else {
          liven_prose(&html, &self.liven)
        };
        self.state.push(&format!("<p class=\"{tag}\">{html}</p>\n"));
      },
      Marker::IntroBlank | Marker::Break => {
        self.state.push("<br>\n");
        self.state.after_heading = false;
      },
      Marker::IntroEnd => {},
      Marker::Container(container) => {
        if let Some(open) = self.state.container {
          self.violation(format!(
            "'{}' opened inside '{}'",
            container.tag(),
            open.tag()
          ))?;
          self.state.close_paragraph();
          self.state.close_container();
        }
        self.state.close_paragraph();
        self.state.push_structure(&format!(
          "<div class=\"{}\">\n",
          container.class()
        ));
        self.state.container = Some(container);
      },
      Marker::ContainerEnd(container) => self.end_container(container)?,
      Marker::List => {
        if self.state.close_paragraph() {
          log::debug!("List closed a paragraph in {}", self.location);
        }
        self.state.close_lists();
        self.state.open_list();
      },
      Marker::ListEnd => {
        if !self.state.close_lists() {
          self.violation("'¬list' closes no list")?;
        }
      },
      Marker::ListItem(level) => self.list_item(level, entry)?,
      Marker::ListItemEnd(level) => {
        let depth_matches = self.state.lists.len() == usize::from(level);
        if !depth_matches || !self.state.close_list_item() {
          self.violation(format!("'{tag}' closes no list item"))?;
          self.state.close_list_item();
        }
      },
      Marker::TableRow => {
        self.state.close_paragraph();
        self.state.open_row();
        if let Some(text) = self.text(entry) {
          self.row_cells(&text)?;
        }
      },
      Marker::TableCell(cell) => {
        if !self.state.table_row {
          return Err(self.unhandled(tag, "table cell outside a table row"));
        }
        let text = self.text(entry).unwrap_or_default();
        let html = self.cell(cell, &text)?;
        self.state.push(&html);
      },
    }
    Ok(())
  }

  fn verse(&mut self, entry: &MarkerEntry) -> UsfmResult<()> {
    self.state.close_right_box();
    let Some(text) = entry.text() else {
      return Err(self.unhandled("v", "verse without a number"));
    };
    let Some(chapter) = self.state.chapter else {
      return Err(self.unhandled("v", "verse before any chapter"));
    };
    let html = self.verses.render(chapter, text, &self.location)?;
    if html.is_empty() {
      return Ok(());
    }
    let html_so_far = &self.state.html;
    if !html_so_far.is_empty()
      && !html_so_far.ends_with('>')
      && !html_so_far.ends_with('—')
    {
      self.state.push(" ");
    }
    self.state.push(&html);
    self.state.after_heading = false;
    Ok(())
  }

  fn paragraph(&mut self, tag: &str, poetry: bool) -> UsfmResult<()> {
    if self.basic_only() {
      let separator = if self.state.html.is_empty() {
        ""
      } else if self.state.after_heading {
        "<br> "
      } else if poetry {
        " ⇔&nbsp;"
      } else {
        " ¶&nbsp;"
      };
      self.state.push(separator);
      self.state.after_heading = false;
      return Ok(());
    }

    self.state.close_right_box();
    if self.state.close_lists() {
      log::warn!("Paragraph '{tag}' closed a list in {}", self.location);
    }
    self.end_paragraph_for(&format!("Paragraph '{tag}'"))?;
    self.state.push(&format!("<p class=\"{tag}\">"));
    self.state.paragraph = Some(tag.to_string());
    Ok(())
  }

  fn section(
    &mut self,
    level: u8,
    entry: &MarkerEntry,
    following: &[MarkerEntry],
  ) -> UsfmResult<()> {
    self.state.close_right_box();
    let heading = self.formatted_or_empty(entry)?;

    if level != 1 {
      if self.basic_only() {
        self.push_basic_heading(&heading);
      } else {
        self.end_paragraph_for("Section heading")?;
        self
          .state
          .push(&format!("<p class=\"s{level}\">{heading}</p>\n"));
      }
      return Ok(());
    }

    if self.state.paragraph.is_some() {
      self.end_paragraph_for("Section heading")?;
    }
    if self.state.close_lists() {
      log::warn!("Section heading closed a list in {}", self.location);
    }
    if self.state.section {
      log::warn!("Previous section was never closed in {}", self.location);
      self.state.close_section();
    }
    self.state.section = true;

    if self.basic_only() {
      self.push_basic_heading(&heading);
    } else if self.oet {
      let raw = entry.text().unwrap_or_default();
      let heading = self.section_link(&heading, raw, following);
      self.state.push(&format!(
        "<div class=\"s1\"><div class=\"rightBox\"><p \
         class=\"s1\">{heading}</p>\n"
      ));
      self.state.right_box = true;
    } else {
      self
        .state
        .push(&format!("<div class=\"s1\"><p class=\"s1\">{heading}</p>\n"));
    }
    Ok(())
  }

  /// Links an OET section heading to its section page.
  ///
  /// The section is found from the first verse after the heading. Headings
  /// holding a footnote or cross-reference stay unlinked so the caller link
  /// is not nested.
  fn section_link(
    &self,
    heading: &str,
    raw: &str,
    following: &[MarkerEntry],
  ) -> String {
    if raw.contains("\\f") || raw.contains("\\x") {
      return heading.to_string();
    }
    let mut chapter = self.state.chapter;
    let verse = following.iter().find_map(|entry| {
      match entry.marker.as_str() {
        "c" => {
          chapter = entry.text().and_then(|text| text.trim().parse().ok());
          None
        },
        "v" => entry
          .text()
          .and_then(|text| text.split('-').next()?.trim().parse::<u32>().ok()),
        _ => None,
      }
    });
    let (Some(chapter), Some(verse)) = (chapter, verse) else {
      log::debug!("No verse follows a section heading in {}", self.location);
      return heading.to_string();
    };
    let target = VerseRef::new(
      self.segment.reference.book.clone(),
      chapter,
      Some(verse),
    );
    match reference_href(
      &target,
      LinkMode::Section,
      &self.segment.version,
      self.segment.level,
      self.liven.lookups.sections,
    ) {
      Ok(href) => {
        format!("<a title=\"View section\" href=\"{href}\">{heading}</a>")
      },
      Err(err) => {
        log::warn!("Leaving heading unlinked in {}: {err}", self.location);
        heading.to_string()
      },
    }
  }

  fn parallel_reference(&mut self, entry: &MarkerEntry) -> UsfmResult<()> {
    let Some(text) = self.text(entry) else {
      log::warn!("Empty parallel reference in {}", self.location);
      return Ok(());
    };
    if !self.state.section {
      log::warn!("Parallel reference outside a section in {}", self.location);
    }
    if self.basic_only() {
      return Ok(());
    }
    let inner = text
      .strip_prefix('(')
      .and_then(|text| text.strip_suffix(')'));
    let html = if let Some(inner) = inner {
      format!("({})", self.liven_field(inner)?)
    } else {
      log::warn!(
        "Parallel reference '{text}' not in parentheses in {}",
        self.location
      );
      self.liven_field(&text)?
    };
    self.state.push(&format!("<p class=\"r\">{html}</p>\n"));
    Ok(())
  }

  fn end_container(&mut self, container: Container) -> UsfmResult<()> {
    match self.state.container {
      Some(open) if open == container => {},
      Some(open) => {
        self.violation(format!(
          "'¬{}' closes '{}'",
          container.tag(),
          open.tag()
        ))?;
      },
      None => {
        return self
          .violation(format!("'¬{}' closes nothing", container.tag()));
      },
    }
    self.state.close_paragraph();
    self.state.close_lists();
    self.state.close_container();
    Ok(())
  }

  fn list_item(&mut self, level: u8, entry: &MarkerEntry) -> UsfmResult<()> {
    let depth = usize::from(level);
    if self.state.lists.is_empty() {
      log::warn!(
        "List item outside a list in {}, opening one",
        self.location
      );
      self.state.close_paragraph();
      self.state.open_list();
    }
    if self.state.lists.len() < depth {
      log::warn!(
        "Synthesising missing list levels {}..{depth} in {}",
        self.state.lists.len() + 1,
        self.location
      );
      while self.state.lists.len() < depth {
        self.state.open_list();
      }
    }
    self.state.close_lists_to(depth);
    self.state.close_list_item();

    let html = self.formatted_or_empty(entry)?;
    if self.basic_only() {
      self.state.push(&format!(" •&nbsp;{html}"));
    } else {
      self.state.push(&format!("<li>{html}"));
    }
    if let Some(open) = self.state.lists.last_mut() {
      *open = true;
    }
    self.state.after_heading = false;
    Ok(())
  }

  fn cell(&self, cell: Cell, text: &str) -> UsfmResult<String> {
    let element = if cell.header { "th" } else { "td" };
    let class = format!(
      "{}{}{}",
      if cell.header { "th" } else { "tc" },
      if cell.right { "r" } else { "" },
      cell.column
    );
    let html = self.format(text.trim())?;
    Ok(format!("<{element} class=\"{class}\">{html}</{element}>"))
  }

  /// Renders the cells whose markers are embedded in a `\tr` text.
  fn row_cells(&mut self, text: &str) -> UsfmResult<()> {
    let mut starts: Vec<(usize, usize, Cell)> = Vec::new();
    let mut search = 0;
    while let Some(ix) = text[search..].find('\\') {
      let at = search + ix;
      let raw = read_marker(&text[at..]);
      match raw
        .as_ref()
        .map(|raw| (raw.closing, raw.name.parse::<Marker>(), raw.len)) {
        Some((false, Ok(Marker::TableCell(cell)), len)) => {
          starts.push((at, len, cell));
          search = at + len;
        },
        _ => search = at + 1,
      }
    }

    let leading = &text[..starts.first().map_or(text.len(), |start| start.0)];
    if !leading.trim().is_empty() {
      log::warn!(
        "Dropping '{leading}' before the first table cell in {}",
        self.location
      );
    }
    for (ix, &(at, len, cell)) in starts.iter().enumerate() {
      let end = starts.get(ix + 1).map_or(text.len(), |next| next.0);
      let html = self.cell(cell, &text[at + len..end])?;
      self.state.push(&html);
    }
    Ok(())
  }

  /// Closes what is still open, extracts notes and checks the result.
  fn finish(mut self, counters: &mut NoteCounters) -> UsfmResult<RenderedUnit> {
    self.state.close_right_box();
    self.state.close_table();
    self.state.close_speaker();
    if !self.state.lists.is_empty() {
      self.leftover("list");
      self.state.close_lists();
    }
    if self.state.paragraph.is_some() {
      self.leftover("paragraph");
      self.state.close_paragraph();
    }
    if self.state.section {
      // Sections routinely run on past the end of a chapter or passage
      if self.segment.kind.is_strict() {
        self.leftover("section");
      }
      self.state.close_section();
    }
    if self.state.container.is_some() {
      self.leftover("container");
      self.state.close_container();
    }

    let options = self.renderer.options();
    let ctx = NoteContext {
      segment:     self.segment,
      liven:       self.liven,
      title_limit: options.title_limit(&self.segment.version),
      scan_limit:  options
        .scan_limit(&self.segment.version, &self.segment.reference.book),
    };
    let html = std::mem::take(&mut self.state.html);
    let mut unit = extract_notes(html, &ctx, counters)?;
    unit.html = tidy(&unit.html);

    for html in [&unit.html, &unit.footnotes_html, &unit.xrefs_html] {
      if let Some(ix) = html.find('\\') {
        let near = snippet(&html[ix..], 40);
        if !self.tolerated {
          return Err(UsfmError::LeftoverBackslash {
            location: self.location.clone(),
            snippet:  near,
          });
        }
        log::warn!("Left-over backslash in {} near '{near}'", self.location);
      }
    }

    let label = if self.segment.kind.is_single_verse() {
      format!("Parallel {}", self.location)
    } else {
      self.location.clone()
    };
    for (part, html) in [
      ("body", &unit.html),
      ("footnotes", &unit.footnotes_html),
      ("cross-references", &unit.xrefs_html),
    ] {
      if options.strict_html {
        if let Some(detail) = find_html_problem(&label, html, true) {
          return Err(UsfmError::Html {
            location: self.location.clone(),
            detail:   format!("{part}: {detail}"),
          });
        }
      } else if !check_html(&label, html, true) {
        log::debug!("Keeping unbalanced {part} of {label}");
      }
    }
    Ok(unit)
  }
}

/// Collapses doubled blank lines and drops trailing newlines and breaks.
fn tidy(html: &str) -> String {
  let mut html = html.to_string();
  while html.contains("\n\n") {
    html = html.replace("\n\n", "\n");
  }
  let mut end = html.len();
  loop {
    let rest = &html[..end];
    match rest.strip_suffix('\n').or_else(|| rest.strip_suffix("<br>")) {
      Some(trimmed) => end = trimmed.len(),
      None => break,
    }
  }
  html.truncate(end);
  html
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Fine in tests")]
mod tests {
  use super::*;
  use crate::{
    collaborators::{BookTable, Lookups, SectionIndex},
    render::RenderOptions,
    types::{RefTuple, SegmentKind},
  };

  struct Fixture {
    table:    BookTable,
    sections: SectionIndex,
  }

  impl Fixture {
    fn new() -> Self {
      let mut sections = SectionIndex::default();
      sections.push("OET-RV", "GEN".parse().unwrap(), [1, 1, 2, 3].into());
      Self {
        table: BookTable::load().unwrap(),
        sections,
      }
    }

    fn convert(
      &self,
      segment: &Segment,
      entries: &[MarkerEntry],
    ) -> UsfmResult<RenderedUnit> {
      let renderer = Renderer::new(
        Lookups::new(&self.table, &self.sections),
        RenderOptions::default(),
      );
      renderer.convert(segment, entries, &mut NoteCounters::default())
    }
  }

  fn entry(marker: &str, text: &str) -> MarkerEntry {
    MarkerEntry::with_text(marker, text)
  }

  fn chapter(version: &str, kind: SegmentKind) -> Segment {
    Segment::new(kind, version, RefTuple::chapter("GEN".parse().unwrap(), 1))
  }

  #[test]
  fn test_tidy() {
    assert_eq!(tidy("<p>a</p>\n\n\n<br>\n<br>"), "<p>a</p>");
    assert_eq!(tidy("x"), "x");
  }

  #[test]
  fn test_paragraph_and_verses() {
    let unit = Fixture::new()
      .convert(&chapter("BSB", SegmentKind::Chapter), &[
        entry("c", "1"),
        MarkerEntry::new("p"),
        entry("v", "2"),
        entry("v~", "Now the earth"),
        MarkerEntry::new("¬p"),
      ])
      .unwrap();
    assert!(
      unit
        .html
        .starts_with("<p class=\"p\"><span class=\"v\" id=\"C1V2\">")
    );
    assert!(unit.html.ends_with(
      "<span class=\"BSB_verseTextChunk\">Now the earth</span></p>"
    ));
  }

  #[test]
  fn test_oet_typography() {
    let unit = Fixture::new()
      .convert(&chapter("OET-RV", SegmentKind::Chapter), &[
        entry("c", "1"),
        entry("v~", "the ˚Lord's word"),
      ])
      .unwrap();
    assert!(
      unit
        .html
        .contains("the <span class=\"nominaSacra\">Lord</span>’s")
    );
  }

  #[test]
  fn test_oet_section_heading_links_to_section() {
    let unit = Fixture::new()
      .convert(&chapter("OET-RV", SegmentKind::Chapter).at_level(1), &[
        entry("c", "1"),
        entry("s1", "In the beginning"),
        MarkerEntry::new("p"),
        entry("v", "2"),
        entry("v~", "text"),
        MarkerEntry::new("¬p"),
        MarkerEntry::new("¬s1"),
      ])
      .unwrap();
    assert!(unit.html.starts_with(
      "<div class=\"s1\"><div class=\"rightBox\"><p class=\"s1\"><a \
       title=\"View section\" href=\"../OET-RV/bySec/GEN_S0.htm#C1V2\">In the \
       beginning</a></p>\n</div><!--rightBox-->\n<p class=\"p\">"
    ));
    assert!(unit.html.ends_with("</p>\n</div><!--s1-->"));
  }

  #[test]
  fn test_oet_heading_with_cross_reference_stays_unlinked() {
    let unit = Fixture::new()
      .convert(&chapter("OET-RV", SegmentKind::Chapter).at_level(1), &[
        entry("c", "1"),
        entry("s1", "In the beginning\\x - \\xo 1:1 \\xt Jn 1:1\\x*"),
        MarkerEntry::new("p"),
        entry("v", "2"),
        entry("v~", "text"),
        MarkerEntry::new("¬p"),
        MarkerEntry::new("¬s1"),
      ])
      .unwrap();
    assert!(!unit.html.contains("title=\"View section\""));
    assert!(unit.html.contains("xrCaller"));
  }

  #[test]
  fn test_parallel_reference_is_livened() {
    let unit = Fixture::new()
      .convert(&chapter("BSB", SegmentKind::Chapter), &[
        entry("c", "1"),
        entry("s1", "The Creation"),
        entry("r", "(John 1:1-5)"),
        MarkerEntry::new("¬s1"),
      ])
      .unwrap();
    assert!(unit.html.contains(
      "<p class=\"r\">(<a class=\"xrRef\" title=\"JHN 1:1-5\" \
       href=\"BSB/byC/JHN_C1.htm#C1V1\">John 1:1-5</a>)</p>"
    ));
  }

  #[test]
  fn test_context_validation() {
    let fixture = Fixture::new();
    let verse = Segment::new(
      SegmentKind::ParallelVerse,
      "BSB",
      RefTuple::verse("GEN".parse().unwrap(), 1, 1),
    );
    assert!(fixture.convert(&verse.clone().with_context(&["c"]), &[]).is_ok());
    assert!(matches!(
      fixture.convert(&verse.with_context(&["s1"]), &[]),
      Err(UsfmError::InvalidContext { .. })
    ));
    let section =
      chapter("BSB", SegmentKind::Section).with_context(&["s1", "p"]);
    let unit = fixture
      .convert(&section, &[entry("v", "3"), entry("v~", "x")])
      .unwrap();
    assert!(unit.html.starts_with("<div class=\"s1\">\n<p class=\"p\">"));
    assert!(unit.html.ends_with("</p>\n</div><!--s1-->"));
    let bad = chapter("BSB", SegmentKind::Chapter).with_context(&["zz"]);
    assert!(fixture.convert(&bad, &[]).is_err());
  }

  #[test]
  fn test_book_units_are_strict() {
    let fixture = Fixture::new();
    let entries = [entry("c", "1"), MarkerEntry::new("¬p")];
    assert!(matches!(
      fixture.convert(&chapter("BSB", SegmentKind::Book), &entries),
      Err(UsfmError::IntegrityViolation { .. })
    ));
    assert!(
      fixture
        .convert(&chapter("BSB", SegmentKind::Chapter), &entries)
        .is_ok()
    );
  }

  #[test]
  fn test_container_mismatch() {
    let fixture = Fixture::new();
    let entries = [
      MarkerEntry::new("headers"),
      entry("mt1", "Genesis"),
      MarkerEntry::new("¬intro"),
    ];
    assert!(
      fixture
        .convert(&chapter("BSB", SegmentKind::Book), &entries)
        .is_err()
    );
    let unit = fixture
      .convert(&chapter("BSB", SegmentKind::Chapter), &entries)
      .unwrap();
    assert_eq!(
      unit.html,
      "<div class=\"bookHeader\">\n<p class=\"mt1\">Genesis</p>\n</div>\
       <!--bookHeader-->"
    );
  }

  #[test]
  fn test_intro_outline() {
    let unit = Fixture::new()
      .convert(&chapter("BSB", SegmentKind::Book), &[
        MarkerEntry::new("intro"),
        entry("io1", "Creation \\ior 1:1–2:3\\ior*"),
        MarkerEntry::new("ie"),
        MarkerEntry::new("¬intro"),
      ])
      .unwrap();
    assert!(unit.html.contains(
      "<p class=\"io1\">Creation <span class=\"ior\"><a \
       href=\"BSB/byDoc/GEN.htm#C1V1\">1:1–2:3</a></span></p>"
    ));
  }

  #[test]
  fn test_table_rows_and_cells() {
    let fixture = Fixture::new();
    let unit = fixture
      .convert(&chapter("BSB", SegmentKind::Chapter), &[
        entry("tr", "\\th1 Tribe \\thr2 Number"),
        MarkerEntry::new("tr"),
        entry("tc1", "Reuben"),
        entry("tcr2", "46,500"),
        MarkerEntry::new("p"),
        MarkerEntry::new("¬p"),
      ])
      .unwrap();
    assert_eq!(
      unit.html,
      "<table>\n<tr><th class=\"th1\">Tribe</th><th \
       class=\"thr2\">Number</th></tr>\n<tr><td class=\"tc1\">Reuben</td><td \
       class=\"tcr2\">46,500</td></tr>\n</table>\n<p class=\"p\"></p>"
    );
    let err = fixture
      .convert(&chapter("BSB", SegmentKind::Chapter), &[entry("tc1", "x")])
      .unwrap_err();
    assert!(matches!(err, UsfmError::UnhandledCase { .. }));
  }

  #[test]
  fn test_leftover_backslash() {
    let fixture = Fixture::new();
    let entries = [entry("c", "1"), entry("v~", "a \\ b")];
    assert!(matches!(
      fixture.convert(&chapter("BSB", SegmentKind::Chapter), &entries),
      Err(UsfmError::LeftoverBackslash { .. })
    ));
    assert!(
      fixture
        .convert(&chapter("ULT", SegmentKind::Chapter), &entries)
        .is_ok()
    );
  }
}
