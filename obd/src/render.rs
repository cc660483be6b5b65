//! Rendering unit files into pages.
use std::{
  collections::HashSet,
  fs,
  path::{Path, PathBuf},
};

use color_eyre::eyre::{Context, Result, bail, eyre};
use log::{debug, info, warn};
use obd_config::Config;
use obd_usfm::{
  BookTable,
  LanguageTables,
  Lookups,
  NoteCounters,
  Renderer,
  SectionIndex,
  check_html,
};
use rayon::prelude::*;

use crate::{
  page::{PageBuilder, PageType},
  postprocess::post_process,
  units::{UnitFile, collect_unit_files, depth},
};

/// Book table and section index a run resolves references against.
#[derive(Debug, Default)]
pub struct LookupData {
  pub books:    BookTable,
  pub sections: SectionIndex,
}

impl LookupData {
  /// Loads the embedded book table, with the verse counts and section index
  /// named in `config` when set.
  ///
  /// # Errors
  ///
  /// Returns an error if a file cannot be read or does not parse.
  pub fn load(config: &Config) -> Result<Self> {
    let mut books = BookTable::load().wrap_err("Failed to load book table")?;
    if let Some(ref path) = config.verse_counts {
      let json = fs::read_to_string(path).wrap_err_with(|| {
        format!("Failed to read verse counts {}", path.display())
      })?;
      books.load_verse_counts(&json).wrap_err_with(|| {
        format!("Failed to load verse counts {}", path.display())
      })?;
    }

    let sections = match config.section_index {
      Some(ref path) => {
        let json = fs::read_to_string(path).wrap_err_with(|| {
          format!("Failed to read section index {}", path.display())
        })?;
        SectionIndex::from_json(&json).wrap_err_with(|| {
          format!("Failed to load section index {}", path.display())
        })?
      },
      None => SectionIndex::default(),
    };

    Ok(Self { books, sections })
  }

  #[must_use]
  pub fn lookups(&self) -> Lookups<'_> {
    Lookups::new(&self.books, &self.sections)
  }
}

/// One finished page, relative to the output directory.
#[derive(Debug, Clone)]
pub struct RenderedPage {
  pub path: PathBuf,
  pub html: String,
}

/// Everything needed to turn a unit into a page. Shared by the worker
/// threads.
#[derive(Debug)]
pub struct SiteRenderer<'a> {
  config:   &'a Config,
  data:     &'a LookupData,
  renderer: Renderer<'a>,
  pages:    PageBuilder,
  tables:   Option<LanguageTables>,
}

impl<'a> SiteRenderer<'a> {
  /// # Errors
  ///
  /// Returns an error if the page templates or the word tables fail to load.
  pub fn new(config: &'a Config, data: &'a LookupData) -> Result<Self> {
    let tables = if config.modernise {
      Some(LanguageTables::load().wrap_err("Failed to load word tables")?)
    } else {
      None
    };
    Ok(Self {
      config,
      data,
      renderer: Renderer::new(data.lookups(), config.render_options()),
      pages: PageBuilder::new(config)?,
      tables,
    })
  }

  /// Converts one unit and wraps it in page chrome.
  ///
  /// # Errors
  ///
  /// Returns an error if the unit has no page path, fails to convert, or
  /// with `strict_html` if the finished page is unbalanced.
  pub fn render_unit(&self, unit: &UnitFile) -> Result<RenderedPage> {
    let path = unit.output_path(&self.data.sections)?;
    let level = self.config.level + depth(&path);

    let mut segment = unit.segment.clone();
    if segment.level != level {
      debug!(
        "{}: level {} replaced by page depth {level}",
        segment.location(),
        segment.level
      );
      segment.level = level;
    }
    let location = segment.location();

    let mut counters = NoteCounters::default();
    let mut rendered = self
      .renderer
      .convert(&segment, &unit.entries, &mut counters)
      .wrap_err_with(|| format!("Failed to render {location}"))?;
    rendered.html = post_process(
      &segment.version,
      &rendered.html,
      &unit.entries,
      self.tables.as_ref(),
      &location,
    );

    let page_type = PageType::for_segment(&segment);
    let keywords = format!(
      "Bible, {}, {}",
      segment.version, segment.reference.book
    );
    let html = self.pages.make_page(
      level,
      page_type,
      &unit.page_title(),
      &keywords,
      &rendered.into_html(),
    )?;

    let label = match page_type {
      PageType::Parallel => format!("Parallel {}", segment.reference),
      PageType::Interlinear => format!("Interlinear {}", segment.reference),
      _ => format!("{} {}", segment.version, segment.reference),
    };
    if !check_html(&label, &html, false) && self.config.strict_html {
      bail!("Unbalanced html in {label} page {}", path.display());
    }

    Ok(RenderedPage { path, html })
  }
}

/// Renders every unit under `input` into `output`, returning the written
/// page paths.
///
/// # Errors
///
/// Returns an error if any unit fails to render, two units claim the same
/// page, or a page cannot be written.
pub fn render_site(
  config: &Config,
  input: &Path,
  output: &Path,
) -> Result<Vec<PathBuf>> {
  let files = collect_unit_files(input);
  if files.is_empty() {
    warn!("No unit files found in {}", input.display());
    return Ok(Vec::new());
  }
  info!("Rendering {} unit files from {}", files.len(), input.display());

  let data = LookupData::load(config)?;
  let site = SiteRenderer::new(config, &data)?;

  let thread_count = config.jobs.unwrap_or_else(num_cpus::get);
  let pool = rayon::ThreadPoolBuilder::new()
    .num_threads(thread_count)
    .build()
    .wrap_err("Failed to build render thread pool")?;

  let pages = pool.install(|| {
    files
      .par_iter()
      .map(|file| {
        let unit = UnitFile::from_file(file)?;
        site
          .render_unit(&unit)
          .wrap_err_with(|| format!("In unit file {}", file.display()))
      })
      .collect::<Result<Vec<_>>>()
  })?;

  let mut seen = HashSet::new();
  for page in &pages {
    if !seen.insert(&page.path) {
      bail!("More than one unit renders to {}", page.path.display());
    }
  }

  fs::create_dir_all(output).wrap_err_with(|| {
    format!("Failed to create output directory {}", output.display())
  })?;
  let written = pool.install(|| {
    pages
      .par_iter()
      .map(|page| write_page(output, page))
      .collect::<Result<Vec<_>>>()
  })?;

  if config.level == 0 {
    write_assets(output)?;
  }

  info!("Wrote {} pages to {}", written.len(), output.display());
  Ok(written)
}

fn write_page(output: &Path, page: &RenderedPage) -> Result<PathBuf> {
  let target = output.join(&page.path);
  let parent = target
    .parent()
    .ok_or_else(|| eyre!("Page path has no parent: {}", target.display()))?;
  fs::create_dir_all(parent).wrap_err_with(|| {
    format!("Failed to create directory {}", parent.display())
  })?;
  fs::write(&target, &page.html)
    .wrap_err_with(|| format!("Failed to write page {}", target.display()))?;
  debug!("Wrote {}", target.display());
  Ok(target)
}

/// Writes the stylesheets and script the pages link to.
///
/// # Errors
///
/// Returns an error if a file cannot be written.
pub fn write_assets(output: &Path) -> Result<()> {
  for (name, content) in obd_templates::all_assets() {
    let target = output.join(name);
    fs::write(&target, content).wrap_err_with(|| {
      format!("Failed to write asset {}", target.display())
    })?;
  }
  Ok(())
}
