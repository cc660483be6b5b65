//! Size limits applied while extracting notes.
//!
//! Some versions carry notes far longer or far more numerous than the rest,
//! so both limits take a default and per-version (and for scanning,
//! per-book) overrides.
use std::collections::BTreeMap;

use obd_usfm::{
  BookCode,
  render::{DEFAULT_NOTE_SCAN_LIMIT, DEFAULT_NOTE_TITLE_LIMIT},
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maximum characters in a note caller's `title` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteTitleLimits {
  /// Limit for versions without an override.
  pub default: usize,

  /// Per-version overrides, keyed by version abbreviation.
  pub versions: BTreeMap<String, usize>,
}

impl Default for NoteTitleLimits {
  fn default() -> Self {
    Self {
      default:  DEFAULT_NOTE_TITLE_LIMIT,
      versions: BTreeMap::from([("NET".to_string(), 18_000)]),
    }
  }
}

impl NoteTitleLimits {
  /// Apply a `note_title_limits.*` override. `subkey` is either `default` or
  /// a version abbreviation.
  ///
  /// # Errors
  ///
  /// Returns an error if `value` is not a positive integer.
  pub fn apply_override(
    &mut self,
    subkey: &str,
    value: &str,
  ) -> Result<(), ConfigError> {
    let limit = parse_limit("note_title_limits", subkey, value)?;
    if subkey == "default" {
      self.default = limit;
    } else {
      self.versions.insert(subkey.to_string(), limit);
    }
    Ok(())
  }

  pub fn merge(&mut self, other: Self) {
    self.default = other.default;
    self.versions.extend(other.versions);
  }
}

/// Maximum notes of one kind looked for in one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteScanLimits {
  /// Limit for versions and books without an override.
  pub default: usize,

  /// Per-version overrides.
  pub versions: BTreeMap<String, usize>,

  /// Per-book overrides. These win over the version ones.
  pub books: BTreeMap<BookCode, usize>,
}

impl Default for NoteScanLimits {
  fn default() -> Self {
    Self {
      default:  DEFAULT_NOTE_SCAN_LIMIT,
      versions: BTreeMap::from([("NET".to_string(), 15_000)]),
      books:    BTreeMap::new(),
    }
  }
}

impl NoteScanLimits {
  /// Apply a `note_scan_limits.*` override. `subkey` is `default`,
  /// `versions.<VERSION>` or `books.<BOOK>`.
  ///
  /// # Errors
  ///
  /// Returns an error if the subkey is unknown, the book code is invalid or
  /// `value` is not a positive integer.
  pub fn apply_override(
    &mut self,
    subkey: &str,
    value: &str,
  ) -> Result<(), ConfigError> {
    let limit = parse_limit("note_scan_limits", subkey, value)?;
    if subkey == "default" {
      self.default = limit;
    } else if let Some(version) = subkey.strip_prefix("versions.") {
      self.versions.insert(version.to_string(), limit);
    } else if let Some(book) = subkey.strip_prefix("books.") {
      let book = book.parse().map_err(|e: String| {
        ConfigError::Config(format!(
          "Invalid key 'note_scan_limits.{subkey}': {e}"
        ))
      })?;
      self.books.insert(book, limit);
    } else {
      return Err(ConfigError::Config(format!(
        "Unknown configuration key: 'note_scan_limits.{subkey}'. Expected \
         default, versions.<VERSION> or books.<BOOK>"
      )));
    }
    Ok(())
  }

  pub fn merge(&mut self, other: Self) {
    self.default = other.default;
    self.versions.extend(other.versions);
    self.books.extend(other.books);
  }
}

fn parse_limit(
  field: &str,
  subkey: &str,
  value: &str,
) -> Result<usize, ConfigError> {
  match value.parse::<usize>() {
    Ok(limit) if limit > 0 => Ok(limit),
    _ => {
      Err(ConfigError::Config(format!(
        "Invalid value for '{field}.{subkey}': '{value}'. Expected a \
         positive integer"
      )))
    },
  }
}
