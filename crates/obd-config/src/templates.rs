//! Default configuration files written by `obd init`.
use crate::{config::Config, error::ConfigError};

/// Default configuration in TOML, with a comment for every field. The values
/// match [`Config::default`].
pub const DEFAULT_TOML_TEMPLATE: &str = r#"# Open Bible Data renderer configuration

# Directory (or single file) holding rendering unit JSON files
# input_dir = "units"

# Output directory for rendered pages
output_dir = "build"

# Site title shown in the page header
title = "Open Bible Data"

# Text inserted in the page footer
footer_text = "Open Bible Data: freely given"

# Number of threads used for rendering (defaults to number of CPU cores)
# jobs = 4

# Directory depth of the output directory below the site root
level = 0

# Turn html tag-balance problems into errors instead of log lines
strict_html = false

# Add modernised lines under early English, German and Latin texts
modernise = true

# Legacy feeds whose unknown markers only produce warnings
tolerated_versions = ["ULT", "UST"]

# Versions linked from the page header, in display order
versions = ["OET", "OET-RV", "OET-LV", "BSB", "WEB"]

# Section index used to link OET section pages, shaped as
# {"OET-RV": {"GEN": [[1, 1, 1, 31], [2, 1, 2, 3]]}}
# section_index = "sections.json"

# Verse counts used to expand whole-chapter references, shaped as
# {"GEN": [31, 25, 24], "EXO": [22, 25]}
# verse_counts = "verse_counts.json"

# Maximum characters in a note caller's title attribute
[note_title_limits]
default = 11500

[note_title_limits.versions]
NET = 18000

# Maximum number of notes of one kind looked for in one unit
[note_scan_limits]
default = 5000

[note_scan_limits.versions]
NET = 15000

# Per-book limits win over per-version ones
[note_scan_limits.books]
# PSA = 9000
"#;

/// Get the default configuration for `format` (`toml` or `json`).
///
/// JSON has no comments, so it is the serialised default config.
///
/// # Errors
///
/// Returns an error if the format is unsupported or serialisation fails.
pub fn get_template(format: &str) -> Result<String, ConfigError> {
  match format.to_lowercase().as_str() {
    "toml" => Ok(DEFAULT_TOML_TEMPLATE.to_string()),
    "json" => Ok(serde_json::to_string_pretty(&Config::default())?),
    _ => {
      Err(ConfigError::Template(format!(
        "Unsupported config format: {format}"
      )))
    },
  }
}
