use std::{
  fs,
  path::{Path, PathBuf},
  sync::OnceLock,
};

use obd_usfm::RenderOptions;
use serde::{Deserialize, Serialize};

use crate::{
  error::ConfigError,
  limits::{NoteScanLimits, NoteTitleLimits},
};

/// Configuration for the Open Bible Data renderer.
///
/// [`Config`] holds the options that shape a rendering run: where unit files
/// come from and where pages go, how strictly html and legacy feeds are
/// treated, note limits, and the lookup data the reference resolver needs.
/// Fields are typically loaded from a TOML or JSON config file, but can also
/// be set via `--config KEY=VALUE` on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Directory (or single file) holding rendering unit JSON files.
  pub input_dir: Option<PathBuf>,

  /// Output directory for rendered pages.
  pub output_dir: PathBuf,

  /// Site title shown in the page header.
  pub title: String,

  /// Number of threads to use for parallel rendering.
  pub jobs: Option<usize>,

  /// Directory depth of the output directory below the site root. Added to
  /// the depth of each page within the output directory.
  pub level: usize,

  /// Turn tag-balance problems into errors instead of log lines.
  pub strict_html: bool,

  /// Legacy feeds whose unknown markers only warn.
  pub tolerated_versions: Vec<String>,

  /// Versions listed in the page header, in display order.
  pub versions: Vec<String>,

  /// Note caller `title` length limits.
  pub note_title_limits: NoteTitleLimits,

  /// Number of notes looked for in one unit.
  pub note_scan_limits: NoteScanLimits,

  /// Path to the section index JSON used to link OET section pages.
  pub section_index: Option<PathBuf>,

  /// Path to the verse count JSON used to expand whole-chapter references.
  pub verse_counts: Option<PathBuf>,

  /// Whether to add the modernised early English, German and Latin lines to
  /// rendered pages. The OET and SR Greek adjustments always run.
  pub modernise: bool,

  /// Text to be inserted in the footer.
  pub footer_text: String,
}

impl Default for Config {
  fn default() -> Self {
    let options = RenderOptions::default();
    Self {
      input_dir:          None,
      output_dir:         PathBuf::from("build"),
      title:              "Open Bible Data".to_string(),
      jobs:               None,
      level:              0,
      strict_html:        options.strict_html,
      tolerated_versions: options.tolerated_versions,
      versions:           ["OET", "OET-RV", "OET-LV", "BSB", "WEB"]
        .map(String::from)
        .to_vec(),
      note_title_limits:  NoteTitleLimits::default(),
      note_scan_limits:   NoteScanLimits::default(),
      section_index:      None,
      verse_counts:       None,
      modernise:          true,
      footer_text:        "Open Bible Data: freely given".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from a file (TOML or JSON).
  ///
  /// # Arguments
  ///
  /// * `path` - Path to the configuration file.
  ///
  /// # Errors
  ///
  /// Returns an error if the file cannot be read or parsed, or if the format is
  /// unsupported.
  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
      ConfigError::Config(format!(
        "Failed to read config file: {}: {}",
        path.display(),
        e
      ))
    })?;

    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
      return Err(ConfigError::Config(format!(
        "Config file has no extension: {}",
        path.display()
      )));
    };

    match ext.to_lowercase().as_str() {
      "json" => {
        serde_json::from_str(&content).map_err(|e| {
          ConfigError::Config(format!(
            "Failed to parse JSON config from {}: {}",
            path.display(),
            e
          ))
        })
      },
      "toml" => {
        toml::from_str(&content).map_err(|e| {
          ConfigError::Config(format!(
            "Failed to parse TOML config from {}: {}",
            path.display(),
            e
          ))
        })
      },
      _ => {
        Err(ConfigError::Config(format!(
          "Unsupported config file format: {}",
          path.display()
        )))
      },
    }
  }

  /// Load configuration from the given files, or a discovered one, then
  /// apply `KEY=VALUE` overrides.
  ///
  /// Several files are merged in order, later ones taking precedence.
  ///
  /// # Errors
  ///
  /// Returns an error if a file cannot be loaded, an override is malformed,
  /// or the result fails [`Config::validate`].
  pub fn load(
    config_files: &[PathBuf],
    config_overrides: &[String],
  ) -> Result<Self, ConfigError> {
    let mut config = if let Some((first, rest)) = config_files.split_first() {
      let mut merged_config = Self::from_file(first).map_err(|e| {
        ConfigError::Config(format!(
          "Failed to load config from {}: {}",
          first.display(),
          e
        ))
      })?;

      for config_path in rest {
        let additional_config = Self::from_file(config_path).map_err(|e| {
          ConfigError::Config(format!(
            "Failed to load config from {}: {}",
            config_path.display(),
            e
          ))
        })?;
        merged_config.merge(additional_config);
      }

      if config_files.len() > 1 {
        log::info!("Loaded and merged {} config files", config_files.len());
      }

      merged_config
    } else if let Some(discovered_config) = Self::find_config_file() {
      log::info!(
        "Using discovered config file: {}",
        discovered_config.display()
      );
      Self::from_file(&discovered_config).map_err(|e| {
        ConfigError::Config(format!(
          "Failed to load discovered config from {}: {}",
          discovered_config.display(),
          e
        ))
      })?
    } else {
      Self::default()
    };

    if !config_overrides.is_empty() {
      config.apply_overrides(config_overrides)?;
    }

    config.validate()?;
    Ok(config)
  }

  /// Apply configuration overrides from KEY=VALUE strings.
  ///
  /// # Errors
  ///
  /// Returns an error if:
  ///
  /// - An override string is not in KEY=VALUE format
  /// - A key is not recognized
  /// - A value cannot be parsed as the expected type
  ///
  /// # Example
  ///
  /// ```rust
  /// let mut config = obd_config::Config::default();
  /// config
  ///   .apply_overrides(&[
  ///     "strict_html=true".to_string(),
  ///     "note_scan_limits.books.PSA=9000".to_string(),
  ///   ])
  ///   .unwrap();
  /// assert!(config.strict_html);
  /// ```
  pub fn apply_overrides(
    &mut self,
    overrides: &[String],
  ) -> Result<(), ConfigError> {
    for override_str in overrides {
      let (key, value) = override_str.split_once('=').ok_or_else(|| {
        ConfigError::Config(format!(
          "Invalid config override format: '{override_str}'. Expected \
           KEY=VALUE"
        ))
      })?;

      self.apply_override(key.trim(), value.trim())?;
    }

    Ok(())
  }

  /// Apply a single override. Optional paths and `jobs` are cleared by an
  /// empty value; list fields take a comma-separated value and replace the
  /// whole list.
  ///
  /// # Errors
  ///
  /// Returns an error if the key is unknown or the value does not parse.
  pub fn apply_override(
    &mut self,
    key: &str,
    value: &str,
  ) -> Result<(), ConfigError> {
    if let Some(subkey) = key.strip_prefix("note_title_limits.") {
      return self.note_title_limits.apply_override(subkey, value);
    }
    if let Some(subkey) = key.strip_prefix("note_scan_limits.") {
      return self.note_scan_limits.apply_override(subkey, value);
    }

    match key {
      "input_dir" => self.input_dir = optional_path(value),
      "output_dir" => self.output_dir = PathBuf::from(value),
      "title" => self.title = value.to_string(),
      "footer_text" => self.footer_text = value.to_string(),
      "jobs" => {
        self.jobs = if value.is_empty() {
          None
        } else {
          Some(parse_usize(key, value)?)
        };
      },
      "level" => self.level = parse_usize(key, value)?,
      "strict_html" => self.strict_html = parse_bool(key, value)?,
      "modernise" => self.modernise = parse_bool(key, value)?,
      "tolerated_versions" => self.tolerated_versions = parse_list(value),
      "versions" => self.versions = parse_list(value),
      "section_index" => self.section_index = optional_path(value),
      "verse_counts" => self.verse_counts = optional_path(value),
      _ => {
        return Err(ConfigError::Config(format!(
          "Unknown configuration key: '{key}'. See `obd init` output for \
           supported keys."
        )));
      },
    }
    Ok(())
  }

  /// Merge another config into this one, with the other config's values taking
  /// precedence.
  ///
  /// # Merge Rules
  ///
  /// - [`Option<T>`] fields: Other's [`Some`] value replaces this config's
  ///   value
  /// - [`Vec<T>`] fields: Other's entries are appended, skipping ones already
  ///   present
  /// - Plain fields (String, bool, etc.): Other's value always replaces
  /// - Limit tables: Other's entries are merged in (can override individual
  ///   keys)
  pub fn merge(&mut self, other: Self) {
    if other.input_dir.is_some() {
      self.input_dir = other.input_dir;
    }
    if other.jobs.is_some() {
      self.jobs = other.jobs;
    }
    if other.section_index.is_some() {
      self.section_index = other.section_index;
    }
    if other.verse_counts.is_some() {
      self.verse_counts = other.verse_counts;
    }

    self.output_dir = other.output_dir;
    self.title = other.title;
    self.level = other.level;
    self.strict_html = other.strict_html;
    self.modernise = other.modernise;
    self.footer_text = other.footer_text;

    append_unique(&mut self.tolerated_versions, other.tolerated_versions);
    append_unique(&mut self.versions, other.versions);

    self.note_title_limits.merge(other.note_title_limits);
    self.note_scan_limits.merge(other.note_scan_limits);
  }

  /// Check values that would otherwise fail deep inside a rendering run.
  ///
  /// # Errors
  ///
  /// Returns an error listing every problem found.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if self.jobs == Some(0) {
      errors.push("jobs must be at least 1".to_string());
    }
    if self.note_title_limits.default == 0
      || self.note_title_limits.versions.values().any(|&limit| limit == 0)
    {
      errors.push("note title limits must be positive".to_string());
    }
    if self.note_scan_limits.default == 0
      || self.note_scan_limits.versions.values().any(|&limit| limit == 0)
      || self.note_scan_limits.books.values().any(|&limit| limit == 0)
    {
      errors.push("note scan limits must be positive".to_string());
    }
    if self.versions.iter().any(String::is_empty)
      || self.tolerated_versions.iter().any(String::is_empty)
    {
      errors.push("version abbreviations must not be empty".to_string());
    }

    if errors.is_empty() {
      Ok(())
    } else {
      Err(ConfigError::Config(format!(
        "Configuration validation errors:\n{}",
        errors.join("\n")
      )))
    }
  }

  /// Validate all paths specified in the configuration
  ///
  /// # Errors
  ///
  /// Returns an error if any configured path does not exist or is invalid.
  pub fn validate_paths(&self) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if let Some(ref input_dir) = self.input_dir
      && !input_dir.exists()
    {
      errors.push(format!("Input does not exist: {}", input_dir.display()));
    }

    for (name, path) in [
      ("Section index", &self.section_index),
      ("Verse counts", &self.verse_counts),
    ] {
      let Some(path) = path else { continue };
      if !path.exists() {
        errors.push(format!("{name} file does not exist: {}", path.display()));
      } else if !path.is_file() {
        errors.push(format!("{name} path is not a file: {}", path.display()));
      }
    }

    if !errors.is_empty() {
      let error_message = errors.join("\n");
      return Err(ConfigError::Config(format!(
        "Configuration path validation errors:\n{error_message}"
      )));
    }

    Ok(())
  }

  /// Options handed to the renderer.
  #[must_use]
  pub fn render_options(&self) -> RenderOptions {
    RenderOptions {
      tolerated_versions:       self.tolerated_versions.clone(),
      note_title_limit:         self.note_title_limits.default,
      note_title_limits:        self
        .note_title_limits
        .versions
        .iter()
        .map(|(version, &limit)| (version.clone(), limit))
        .collect(),
      note_scan_limit:          self.note_scan_limits.default,
      version_note_scan_limits: self
        .note_scan_limits
        .versions
        .iter()
        .map(|(version, &limit)| (version.clone(), limit))
        .collect(),
      book_note_scan_limits:    self
        .note_scan_limits
        .books
        .iter()
        .map(|(book, &limit)| (book.clone(), limit))
        .collect(),
      strict_html:              self.strict_html,
    }
  }

  /// Search for config files in common locations
  #[must_use]
  pub fn find_config_file() -> Option<PathBuf> {
    static RESULT: OnceLock<Option<PathBuf>> = OnceLock::new();
    RESULT
      .get_or_init(|| {
        let config_filenames = [
          "obd.toml",
          "obd.json",
          ".obd.toml",
          ".obd.json",
          ".config/obd.toml",
          ".config/obd.json",
        ];

        let current_dir = std::env::current_dir().ok()?;
        for filename in &config_filenames {
          let config_path = current_dir.join(filename);
          if config_path.exists() {
            return Some(config_path);
          }
        }

        if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
          let xdg_config_dir = PathBuf::from(xdg_config_home);
          for filename in &["obd.toml", "obd.json"] {
            let config_path = xdg_config_dir.join(filename);
            if config_path.exists() {
              return Some(config_path);
            }
          }
        }

        if let Ok(home) = std::env::var("HOME") {
          let home_config_dir = PathBuf::from(home).join(".config").join("obd");
          for filename in &["config.toml", "config.json"] {
            let config_path = home_config_dir.join(filename);
            if config_path.exists() {
              return Some(config_path);
            }
          }
        }

        None
      })
      .clone()
  }

  /// Generate a default configuration file with commented explanations
  ///
  /// # Errors
  ///
  /// Returns an error if the format is unsupported or the file cannot be
  /// written.
  pub fn generate_default_config(
    format: &str,
    path: &Path,
  ) -> Result<(), ConfigError> {
    let config_content = crate::templates::get_template(format)?;

    fs::write(path, config_content).map_err(|e| {
      ConfigError::Config(format!(
        "Failed to write default config to {}: {}",
        path.display(),
        e
      ))
    })?;

    log::info!("Created default configuration file: {}", path.display());
    Ok(())
  }
}

fn optional_path(value: &str) -> Option<PathBuf> {
  (!value.is_empty()).then(|| PathBuf::from(value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
  value.parse().map_err(|_| {
    ConfigError::Config(format!(
      "Invalid value for '{key}': '{value}'. Expected a positive integer"
    ))
  })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
  match value.to_lowercase().as_str() {
    "true" | "yes" | "1" => Ok(true),
    "false" | "no" | "0" => Ok(false),
    _ => {
      Err(ConfigError::Config(format!(
        "Invalid boolean value for '{key}': '{value}'. Expected true/false, \
         yes/no, or 1/0"
      )))
    },
  }
}

fn parse_list(value: &str) -> Vec<String> {
  value
    .split(',')
    .map(str::trim)
    .filter(|item| !item.is_empty())
    .map(String::from)
    .collect()
}

fn append_unique(list: &mut Vec<String>, other: Vec<String>) {
  for item in other {
    if !list.contains(&item) {
      list.push(item);
    }
  }
}

#[cfg(test)]
mod tests {
  #![allow(
    clippy::unwrap_used,
    clippy::field_reassign_with_default,
    reason = "Fine in tests"
  )]

  use std::io::Write;

  use tempfile::NamedTempFile;

  use super::*;

  fn write_config(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
  }

  #[test]
  fn test_from_file_toml_and_json() {
    let toml_file = write_config(
      ".toml",
      "title = \"Test Bible\"\nstrict_html = true\n\n[note_scan_limits.books]\n\
       PSA = 9000\n",
    );
    let config = Config::from_file(toml_file.path()).unwrap();
    assert_eq!(config.title, "Test Bible");
    assert!(config.strict_html);
    assert_eq!(
      config.note_scan_limits.books.get(&"PSA".parse().unwrap()),
      Some(&9_000)
    );
    // Unset fields keep their defaults
    assert_eq!(config.output_dir, PathBuf::from("build"));

    let json_file =
      write_config(".json", r#"{"level": 2, "modernise": false}"#);
    let config = Config::from_file(json_file.path()).unwrap();
    assert_eq!(config.level, 2);
    assert!(!config.modernise);
  }

  #[test]
  fn test_from_file_rejects_unknown_format() {
    let file = write_config(".yaml", "title: nope");
    let err = Config::from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("Unsupported config file format"));

    let file = write_config(".toml", "[note_scan_limits.books]\npsalms = 1\n");
    assert!(Config::from_file(file.path()).is_err());
  }

  #[test]
  fn test_load_merges_files_in_order() {
    let first = write_config(
      ".toml",
      "title = \"First\"\nsection_index = \"sections.json\"\n\
       tolerated_versions = [\"ULT\"]\n",
    );
    let second = write_config(
      ".json",
      r#"{"title": "Second", "tolerated_versions": ["UST", "ULT"]}"#,
    );
    let config = Config::load(
      &[first.path().to_path_buf(), second.path().to_path_buf()],
      &["jobs=4".to_string()],
    )
    .unwrap();

    assert_eq!(config.title, "Second");
    assert_eq!(config.section_index, Some(PathBuf::from("sections.json")));
    assert_eq!(config.tolerated_versions, vec!["ULT", "UST"]);
    assert_eq!(config.jobs, Some(4));
  }

  #[test]
  fn test_apply_overrides() {
    let mut config = Config::default();
    config
      .apply_overrides(&[
        "title = Parallel".to_string(),
        "strict_html=yes".to_string(),
        "tolerated_versions=ULT, UST, T4T".to_string(),
        "note_title_limits.NET=20000".to_string(),
        "verse_counts=counts.json".to_string(),
      ])
      .unwrap();
    assert_eq!(config.title, "Parallel");
    assert!(config.strict_html);
    assert_eq!(config.tolerated_versions, vec!["ULT", "UST", "T4T"]);
    assert_eq!(config.note_title_limits.versions.get("NET"), Some(&20_000));
    assert_eq!(config.verse_counts, Some(PathBuf::from("counts.json")));

    config.apply_override("verse_counts", "").unwrap();
    assert_eq!(config.verse_counts, None);
  }

  #[test]
  fn test_apply_overrides_errors() {
    let mut config = Config::default();
    for bad in ["title", "colour=red", "level=deep", "modernise=maybe"] {
      assert!(
        config.apply_overrides(&[bad.to_string()]).is_err(),
        "{bad} should fail"
      );
    }
  }

  #[test]
  fn test_validate_rejects_zero_limits() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());
    config.jobs = Some(0);
    config.note_scan_limits.default = 0;
    let err = config.validate().unwrap_err().to_string();
    assert!(err.contains("jobs"));
    assert!(err.contains("scan limits"));
  }

  #[test]
  fn test_validate_paths() {
    let mut config = Config::default();
    config.section_index = Some(PathBuf::from("/definitely/not/here.json"));
    let err = config.validate_paths().unwrap_err().to_string();
    assert!(err.contains("Section index file does not exist"));

    let file = write_config(".json", "{}");
    config.section_index = Some(file.path().to_path_buf());
    assert!(config.validate_paths().is_ok());
  }

  #[test]
  fn test_render_options() {
    let mut config = Config::default();
    config
      .apply_overrides(&[
        "note_scan_limits.books.PSA=9000".to_string(),
        "note_title_limits.default=500".to_string(),
      ])
      .unwrap();
    let options = config.render_options();
    assert_eq!(options.note_title_limit, 500);
    assert_eq!(options.title_limit("BSB"), 500);
    assert_eq!(options.title_limit("NET"), 18_000);
    assert_eq!(options.scan_limit("NET", &"PSA".parse().unwrap()), 9_000);
    assert!(options.is_tolerated("ULT"));
  }

  #[test]
  fn test_generate_default_config_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    for format in ["toml", "json"] {
      let path = dir.path().join(format!("obd.{format}"));
      Config::generate_default_config(format, &path).unwrap();
      assert_eq!(Config::from_file(&path).unwrap(), Config::default());
    }
    assert!(
      Config::generate_default_config("yaml", &dir.path().join("obd.yaml"))
        .is_err()
    );
  }
}
