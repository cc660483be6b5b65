//! Version-specific text post-processors.
//!
//! Old English spellings and German glosses are ordered substitution tables
//! held as JSON data and checked when loaded. Greek colouring for the SR
//! text lives in [`brighten`].
pub mod brighten;

use std::collections::HashSet;

use serde::Deserialize;

use crate::error::TableError;

const ENGLISH_JSON: &str =
  include_str!("../../data/english_modernisation.json");
const GERMAN_JSON: &str = include_str!("../../data/german_glosses.json");

/// Characters that must end every old form when they end the replacement.
const TRAILING_PUNCTUATION: &[char] = &[' ', ',', '.', ':', ';'];

/// Several spellings that all become `new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
  pub olds: Vec<String>,
  pub new:  String,
}

#[derive(Deserialize)]
struct TableFile {
  name:    String,
  entries: Vec<(Vec<String>, String)>,
}

/// An ordered list of plain-text replacements.
///
/// Entries apply in order and each old form is replaced everywhere, so
/// longer forms come before the shorter forms they contain.
#[derive(Debug, Clone)]
pub struct WordSubstitutionTable {
  name:    String,
  entries: Vec<Substitution>,
}

impl WordSubstitutionTable {
  /// Parses and validates a table.
  ///
  /// # Errors
  ///
  /// Returns [`TableError::Parse`] for malformed JSON, or the first rule the
  /// table breaks.
  pub fn from_json(json: &str) -> Result<Self, TableError> {
    let file: TableFile =
      serde_json::from_str(json).map_err(|source| TableError::Parse {
        table: "substitution".to_string(),
        source,
      })?;
    let table = Self {
      name:    file.name,
      entries: file
        .entries
        .into_iter()
        .map(|(olds, new)| Substitution { olds, new })
        .collect(),
    };
    table.validate()?;
    log::debug!("Loaded {} {} substitutions", table.len(), table.name);
    Ok(table)
  }

  #[must_use]
  pub fn name(&self) -> &str {
    &self.name
  }

  #[must_use]
  pub fn entries(&self) -> &[Substitution] {
    &self.entries
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Checks the rules that keep replacement order-safe.
  ///
  /// - every form is at least two characters and has no doubled space
  /// - no old form appears twice
  /// - a leading or trailing space on the first old form or on the
  ///   replacement is shared by every form of the entry
  /// - a replacement ending in space or `,.:;` ends every old form the same
  ///   way
  /// - no replacement contains a later old form of its own entry, or any
  ///   old form of an earlier entry
  ///
  /// # Errors
  ///
  /// Returns the first rule broken.
  pub fn validate(&self) -> Result<(), TableError> {
    let table = || self.name.clone();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut earlier: Vec<&str> = Vec::new();

    for Substitution { olds, new } in &self.entries {
      let Some(first) = olds.first() else {
        return Err(TableError::EmptyEntry { table: table() });
      };
      if new.is_empty() || olds.iter().any(|old| old.chars().count() < 2) {
        return Err(TableError::EmptyEntry { table: table() });
      }
      if new.contains("  ") {
        return Err(TableError::DoubleSpace {
          table: table(),
          form:  new.clone(),
        });
      }
      let leading = first.starts_with(' ') || new.starts_with(' ');
      let trailing = first.ends_with(' ') || new.ends_with(' ');
      let mismatch = |edge, old: &str| TableError::SpaceMismatch {
        table: table(),
        edge,
        old: old.to_string(),
        new: new.clone(),
      };
      if leading && !new.starts_with(' ') {
        return Err(mismatch("leading", first));
      }
      if trailing && !new.ends_with(' ') {
        return Err(mismatch("trailing", first));
      }
      let last_char = new.chars().next_back();

      for (ix, old) in olds.iter().enumerate() {
        if !seen.insert(old.as_str()) {
          return Err(TableError::Duplicate {
            table: table(),
            form:  old.clone(),
          });
        }
        if old.contains("  ") {
          return Err(TableError::DoubleSpace {
            table: table(),
            form:  old.clone(),
          });
        }
        if leading && !old.starts_with(' ') {
          return Err(mismatch("leading", old));
        }
        if trailing && !old.ends_with(' ') {
          return Err(mismatch("trailing", old));
        }
        if let Some(c) = last_char.filter(|c| TRAILING_PUNCTUATION.contains(c))
          && !old.ends_with(c)
        {
          return Err(TableError::PunctuationMismatch {
            table: table(),
            old:   old.clone(),
            new:   new.clone(),
          });
        }
        if ix > 0 && new.contains(old.as_str()) {
          return Err(TableError::Recursive {
            table: table(),
            old:   old.clone(),
            new:   new.clone(),
          });
        }
      }

      if let Some(old) = earlier.iter().find(|old| new.contains(**old)) {
        return Err(TableError::Recursive {
          table: table(),
          old:   (*old).to_string(),
          new:   new.clone(),
        });
      }
      earlier.extend(olds.iter().map(String::as_str));
    }
    Ok(())
  }

  /// Applies every replacement in table order.
  #[must_use]
  pub fn apply(&self, text: &str) -> String {
    let mut text = text.to_string();
    for Substitution { olds, new } in &self.entries {
      for old in olds {
        if text.contains(old.as_str()) {
          text = text.replace(old.as_str(), new);
        }
      }
    }
    text
  }
}

/// The substitution tables, loaded once per run.
#[derive(Debug, Clone)]
pub struct LanguageTables {
  pub english: WordSubstitutionTable,
  pub german:  WordSubstitutionTable,
}

impl LanguageTables {
  /// Loads and validates the embedded tables.
  ///
  /// # Errors
  ///
  /// Returns a [`TableError`] if either table is malformed.
  pub fn load() -> Result<Self, TableError> {
    Ok(Self {
      english: WordSubstitutionTable::from_json(ENGLISH_JSON)?,
      german:  WordSubstitutionTable::from_json(GERMAN_JSON)?,
    })
  }

  /// Modernises the spelling of early English versions such as the KJV
  /// 1611, Tyndale and Wycliffe.
  #[must_use]
  pub fn modernise_english_words(&self, html: &str) -> String {
    self.english.apply(html)
  }

  /// Glosses the commonest words of the Luther German text in English.
  #[must_use]
  pub fn translate_german(&self, html: &str) -> String {
    self.german.apply(html)
  }
}

/// Respells the Vulgate's `j` as `y`, except in `Jhesus`.
#[must_use]
pub fn adjust_latin(html: &str) -> String {
  html.replace('j', "y").replace('J', "Y").replace("Yhes", "Jhes")
}
