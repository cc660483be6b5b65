//! Page chrome around rendered units.
//!
//! The top of a page picks its stylesheet by page type and carries the
//! header of version links; the bottom carries the footer. Both come from
//! the tera templates in `obd-templates`.
use color_eyre::eyre::{Context, Result};
use obd_config::Config;
use obd_usfm::{
  Segment,
  SegmentKind,
  utils::{is_oet_family, root_prefix},
};
use serde::Serialize;
use tera::Tera;

/// Which family of page is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
  /// Book, chapter and section pages.
  Chapters,
  /// Book, chapter and section pages of the OET, which also load the
  /// site script.
  OetChapters,
  Parallel,
  Interlinear,
  /// Everything else, such as related and topical passages.
  Site,
}

impl PageType {
  #[must_use]
  pub fn for_segment(segment: &Segment) -> Self {
    match segment.kind {
      SegmentKind::Book | SegmentKind::Chapter | SegmentKind::Section => {
        if is_oet_family(&segment.version) {
          Self::OetChapters
        } else {
          Self::Chapters
        }
      },
      SegmentKind::ParallelVerse => Self::Parallel,
      SegmentKind::InterlinearVerse => Self::Interlinear,
      SegmentKind::RelatedPassage | SegmentKind::TopicalPassage => Self::Site,
    }
  }

  #[must_use]
  pub const fn stylesheet(self) -> &'static str {
    match self {
      Self::Chapters => "BibleChapter.css",
      Self::OetChapters => "OETChapter.css",
      Self::Parallel | Self::Interlinear | Self::Site => "BibleSite.css",
    }
  }

  #[must_use]
  pub const fn script(self) -> Option<&'static str> {
    match self {
      Self::OetChapters => Some("Bible.js"),
      _ => None,
    }
  }
}

/// One entry of the header bar. The entry for the current page type has no
/// link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderLink {
  pub label: String,
  pub href:  Option<String>,
}

/// Builds the fixed parts of every page.
#[derive(Debug)]
pub struct PageBuilder {
  tera:        Tera,
  site_title:  String,
  footer_text: String,
  versions:    Vec<String>,
}

impl PageBuilder {
  /// # Errors
  ///
  /// Returns an error if an embedded template does not parse.
  pub fn new(config: &Config) -> Result<Self> {
    let mut tera = Tera::default();
    tera
      .add_raw_templates(obd_templates::page_templates())
      .wrap_err("Failed to load page templates")?;
    Ok(Self {
      tera,
      site_title: html_escape::encode_text(&config.title).into_owned(),
      footer_text: html_escape::encode_text(&config.footer_text).into_owned(),
      versions: config.versions.clone(),
    })
  }

  /// Links for the header bar of a page `level` directories deep.
  #[must_use]
  pub fn header_links(
    &self,
    level: usize,
    page_type: PageType,
  ) -> Vec<HeaderLink> {
    let root = root_prefix(level);
    let mut links: Vec<_> = self
      .versions
      .iter()
      .map(|version| {
        let version = html_escape::encode_text(version);
        HeaderLink {
          href:  Some(format!("{root}{version}/")),
          label: version.into_owned(),
        }
      })
      .collect();
    for (label, dir, own_type) in [
      ("Parallel", "par", PageType::Parallel),
      ("Interlinear", "ilr", PageType::Interlinear),
    ] {
      links.push(HeaderLink {
        label: label.to_string(),
        href:  (page_type != own_type).then(|| format!("{root}{dir}/")),
      });
    }
    links
  }

  fn context(&self, level: usize, page_type: PageType) -> tera::Context {
    let mut context = tera::Context::new();
    context.insert("root", &root_prefix(level));
    context.insert("stylesheet", page_type.stylesheet());
    context.insert("script", &page_type.script());
    context.insert("header_links", &self.header_links(level, page_type));
    context.insert("site_title", &self.site_title);
    context.insert("footer_text", &self.footer_text);
    context
  }

  /// Everything up to and including the header bar.
  ///
  /// # Errors
  ///
  /// Returns an error if the template fails to render.
  pub fn make_top(
    &self,
    level: usize,
    page_type: PageType,
    title: &str,
    keywords: &str,
  ) -> Result<String> {
    let mut context = self.context(level, page_type);
    context.insert("title", &html_escape::encode_text(title));
    context.insert(
      "keywords",
      &html_escape::encode_double_quoted_attribute(keywords),
    );
    self
      .tera
      .render("top", &context)
      .wrap_err("Failed to render page top")
  }

  /// The header bar on its own.
  ///
  /// # Errors
  ///
  /// Returns an error if the template fails to render.
  pub fn make_header(
    &self,
    level: usize,
    page_type: PageType,
  ) -> Result<String> {
    self
      .tera
      .render("header", &self.context(level, page_type))
      .wrap_err("Failed to render page header")
  }

  /// # Errors
  ///
  /// Returns an error if the template fails to render.
  pub fn make_footer(&self) -> Result<String> {
    self
      .tera
      .render("footer", &self.context(0, PageType::Site))
      .wrap_err("Failed to render page footer")
  }

  /// The footer and the closing `body` and `html` tags.
  ///
  /// # Errors
  ///
  /// Returns an error if the template fails to render.
  pub fn make_bottom(&self) -> Result<String> {
    self
      .tera
      .render("bottom", &self.context(0, PageType::Site))
      .wrap_err("Failed to render page bottom")
  }

  /// A whole page around `content`.
  ///
  /// # Errors
  ///
  /// Returns an error if a template fails to render.
  pub fn make_page(
    &self,
    level: usize,
    page_type: PageType,
    title: &str,
    keywords: &str,
    content: &str,
  ) -> Result<String> {
    let mut page = self.make_top(level, page_type, title, keywords)?;
    page.push_str(content);
    page.push('\n');
    page.push_str(&self.make_bottom()?);
    Ok(page)
  }
}
