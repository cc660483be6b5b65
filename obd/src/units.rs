//! Rendering unit files.
//!
//! A unit file is JSON holding one [`Segment`] and its marker entries, as
//! produced upstream by the USFM tokeniser:
//!
//! ```json
//! {
//!   "segment": {
//!     "kind": "chapter",
//!     "version": "BSB",
//!     "reference": {"book": "GEN", "chapter": 1}
//!   },
//!   "entries": [{"marker": "c", "text": "1"}, {"marker": "p"}]
//! }
//! ```
use std::{
  fs,
  path::{Path, PathBuf},
};

use color_eyre::eyre::{Context, Result, bail};
use log::trace;
use obd_usfm::{MarkerEntry, SectionLookup, Segment, SegmentKind};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitFile {
  pub segment: Segment,
  pub entries: Vec<MarkerEntry>,

  /// Page title. Defaults to the version and reference.
  #[serde(default)]
  pub title: Option<String>,

  /// Page path relative to the output directory. Required for passages;
  /// derived from the segment otherwise.
  #[serde(default)]
  pub output: Option<PathBuf>,
}

impl UnitFile {
  /// # Errors
  ///
  /// Returns an error if the file cannot be read or is not a unit.
  pub fn from_file(path: &Path) -> Result<Self> {
    let content = fs::read_to_string(path).wrap_err_with(|| {
      format!("Failed to read unit file {}", path.display())
    })?;
    serde_json::from_str(&content)
      .wrap_err_with(|| format!("Failed to parse unit file {}", path.display()))
  }

  #[must_use]
  pub fn page_title(&self) -> String {
    self.title.clone().unwrap_or_else(|| {
      format!("{} {}", self.segment.version, self.segment.reference)
    })
  }

  /// Where the page lands, relative to the output directory.
  ///
  /// These match the paths scripture references link to: `byDoc`, `byC`
  /// and `bySec` under the version, and `par` or `ilr` for single verses.
  ///
  /// # Errors
  ///
  /// Returns an error if the reference lacks the chapter or verse the page
  /// kind needs, no section contains a section unit, or a passage has no
  /// explicit output path.
  pub fn output_path(&self, sections: &dyn SectionLookup) -> Result<PathBuf> {
    if let Some(ref output) = self.output {
      return Ok(output.clone());
    }

    let segment = &self.segment;
    let version = &segment.version;
    let book = &segment.reference.book;
    let chapter = segment.reference.chapter;
    let verse = segment.reference.verse;
    let path = match (segment.kind, chapter, verse) {
      (SegmentKind::Book, ..) => format!("{version}/byDoc/{book}.htm"),
      (SegmentKind::Chapter, Some(c), _) => {
        format!("{version}/byC/{book}_C{c}.htm")
      },
      (SegmentKind::Section, Some(c), v) => {
        let v = v.unwrap_or(1);
        let Some(n) = sections.find_section_number(version, book, c, v) else {
          bail!("No {version} section of {book} contains {c}:{v}");
        };
        format!("{version}/bySec/{book}_S{n}.htm")
      },
      (SegmentKind::ParallelVerse, Some(c), Some(v)) => {
        format!("par/{book}/C{c}V{v}.htm")
      },
      (SegmentKind::InterlinearVerse, Some(c), Some(v)) => {
        format!("ilr/{book}/C{c}V{v}.htm")
      },
      (SegmentKind::RelatedPassage | SegmentKind::TopicalPassage, ..) => {
        bail!("{} needs an explicit output path", segment.location())
      },
      _ => {
        bail!(
          "{} lacks the chapter or verse its page needs",
          segment.location()
        )
      },
    };
    Ok(PathBuf::from(path))
  }
}

/// Directory depth of a page path, which is how many `../` take it back to
/// the output directory.
#[must_use]
pub fn depth(path: &Path) -> usize {
  path.components().count().saturating_sub(1)
}

/// Unit files under `input`, sorted for deterministic runs. A file is
/// returned as is.
#[must_use]
pub fn collect_unit_files(input: &Path) -> Vec<PathBuf> {
  if input.is_file() {
    return vec![input.to_path_buf()];
  }

  let mut files: Vec<_> = WalkDir::new(input)
    .follow_links(true)
    .into_iter()
    .filter_map(Result::ok)
    .map(walkdir::DirEntry::into_path)
    .filter(|path| {
      path.is_file() && path.extension().is_some_and(|ext| ext == "json")
    })
    .collect();
  files.sort();

  trace!("Found {} unit files to render", files.len());
  files
}
